//! Batch submission workflow.
//!
//! `Idle -> Saving -> {Success, Failed}`; once saving starts the only way
//! out is a terminal state, and a new submission may begin from any state
//! except `Saving`.

pub mod bulk;

use hourglass_rs::SafeTimeProvider;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{FeeError, Result};
use crate::fine::FineSchedule;
use crate::gateway::{BatchItem, BatchPayload, SheetGateway};
use crate::index::{PaidRecord, PaymentIndex};
use crate::ledger::FeeLedger;
use crate::model::{Receipt, ReceiptItem};
use crate::obligations::{ObligationList, PREVIOUSLY_PAID};

pub use bulk::{submit_bulk, BulkFailure, BulkHeadChoice, BulkOutcome, BulkRequest, BulkSuccess};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Saving,
    Success,
    Failed,
}

/// drives one payment screen's submissions
#[derive(Debug, Default)]
pub struct PaymentWorkflow {
    state: SubmitState,
}

impl PaymentWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// return a terminal state to `Idle`
    pub fn reset(&mut self) {
        if self.state != SubmitState::Saving {
            self.state = SubmitState::Idle;
        }
    }

    /// submit the currently selected obligations as one atomic batch.
    ///
    /// On success the submitted heads are marked paid locally *before* the
    /// transaction refresh is attempted, so the list stays consistent even
    /// when the refresh fails. A duplicate-payment rejection re-syncs the
    /// history, rebuilds the obligation list and re-raises the error; any
    /// other failure leaves local state untouched.
    pub async fn submit<G: SheetGateway>(
        &mut self,
        gateway: &G,
        ledger: &mut FeeLedger,
        obligations: &mut ObligationList,
        mode: &str,
        remarks: &str,
        fines: &FineSchedule,
        time: &SafeTimeProvider,
    ) -> Result<Receipt> {
        if self.state == SubmitState::Saving {
            return Err(FeeError::SubmitInProgress);
        }

        // fail fast, before any network call
        let chosen = obligations.chosen();
        if obligations.student.adm_no.trim().is_empty() || chosen.is_empty() {
            return Err(FeeError::validation(
                "Select a student and at least one fee head",
            ));
        }

        let items: Vec<BatchItem> = chosen
            .iter()
            .map(|o| BatchItem {
                fee_head: o.fee_head.clone(),
                amount: o.amount,
                fine: o.payable_fine(),
                reference: String::new(),
            })
            .collect();
        let payload = BatchPayload {
            date: obligations.payment_date().to_string(),
            adm_no: obligations.student.adm_no.clone(),
            name: obligations.student.name.clone(),
            class: obligations.student.class.clone(),
            mode: mode.to_string(),
            remarks: remarks.to_string(),
            items,
        };

        self.state = SubmitState::Saving;
        let request_id = Uuid::new_v4();
        debug!(%request_id, adm_no = %payload.adm_no, items = payload.items.len(), "submitting payment batch");

        match gateway.submit_payment_batch(&payload).await {
            Ok(batch) => {
                self.state = SubmitState::Success;
                let date = if batch.date.trim().is_empty() {
                    payload.date.clone()
                } else {
                    batch.date.clone()
                };
                let record = PaidRecord {
                    date: date.clone(),
                    receipt_no: batch.receipt_no.clone(),
                };
                // settle locally first; the refresh below may not succeed
                for item in &payload.items {
                    obligations.mark_paid(&item.fee_head, record.clone());
                }
                if let Err(err) = ledger.refresh_transactions(gateway).await {
                    warn!(%request_id, error = %err, "transaction refresh after save failed");
                }
                obligations.clear_selection();

                Ok(Receipt {
                    receipt_no: batch.receipt_no,
                    date,
                    student: obligations.student.clone(),
                    items: payload
                        .items
                        .iter()
                        .map(|item| ReceiptItem {
                            fee_head: item.fee_head.clone(),
                            amount: item.amount,
                            fine: item.fine,
                            reference: item.reference.clone(),
                        })
                        .collect(),
                    mode: payload.mode,
                    remarks: payload.remarks,
                })
            }
            Err(FeeError::DuplicatePayment {
                paid_heads,
                message,
            }) => {
                self.state = SubmitState::Failed;
                self.recover_from_duplicate(gateway, ledger, obligations, &paid_heads, fines, time)
                    .await;
                Err(FeeError::DuplicatePayment {
                    paid_heads,
                    message,
                })
            }
            Err(err) => {
                self.state = SubmitState::Failed;
                Err(err)
            }
        }
    }

    /// another client paid between list-load and submit: re-sync the
    /// history, rebuild the list, and make sure every conflicted head shows
    /// as settled even if the re-sync itself failed
    async fn recover_from_duplicate<G: SheetGateway>(
        &self,
        gateway: &G,
        ledger: &mut FeeLedger,
        obligations: &mut ObligationList,
        paid_heads: &[String],
        fines: &FineSchedule,
        time: &SafeTimeProvider,
    ) {
        if let Err(err) = ledger.refresh_transactions(gateway).await {
            warn!(error = %err, "transaction refresh after duplicate payment failed");
        }
        let index = PaymentIndex::build(ledger.transactions(), &obligations.student.adm_no);
        let student = obligations.student.clone();
        let payment_date = obligations.payment_date().to_string();
        *obligations =
            ObligationList::resolve(&student, ledger.fee_heads(), &index, &payment_date, fines);

        let today = time.now().date_naive().to_string();
        for head in paid_heads {
            let already = obligations
                .entries()
                .iter()
                .any(|o| crate::types::head_key(&o.fee_head) == crate::types::head_key(head) && o.is_paid());
            if !already {
                obligations.mark_paid(
                    head,
                    PaidRecord {
                        date: today.clone(),
                        receipt_no: PREVIOUSLY_PAID.to_string(),
                    },
                );
            }
        }
    }
}
