//! Derived payable/settled state for one student.
//!
//! An [`ObligationList`] is a view over the class fee schedule and the
//! payment index; it is rebuilt whenever the student, payment date or
//! transaction history changes, and is never persisted.

use futures::stream::{FuturesUnordered, StreamExt};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, warn};

use crate::decimal::Money;
use crate::fine::FineSchedule;
use crate::gateway::SheetGateway;
use crate::index::{PaidRecord, PaymentIndex};
use crate::model::{FeeHeadDefinition, Student};
use crate::types::{head_key, same_class};

/// receipt placeholder when the server confirms a payment but omits the
/// matching record
pub const PREVIOUSLY_PAID: &str = "Previously paid";

/// one fee head of the selected student: owed, fined, settled or selectable
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    pub fee_head: String,
    pub amount: Money,
    pub fine: Money,
    pub due_date: String,
    pub paid: Option<PaidRecord>,
    pub selected: bool,
    pub waive_fine: bool,
    pub manual_fine: bool,
    /// paid-state came from (or was verified by) the authoritative check
    pub server_confirmed: bool,
}

impl Obligation {
    pub fn is_paid(&self) -> bool {
        self.paid.is_some()
    }

    /// settled obligations can never re-enter a payment batch
    pub fn is_selectable(&self) -> bool {
        self.paid.is_none()
    }

    /// fine that would actually be charged
    pub fn payable_fine(&self) -> Money {
        if self.waive_fine {
            Money::ZERO
        } else {
            self.fine
        }
    }

    pub fn payable_total(&self) -> Money {
        self.amount + self.payable_fine()
    }
}

/// the working list for the payment screen
#[derive(Debug, Clone, PartialEq)]
pub struct ObligationList {
    pub student: Student,
    payment_date: String,
    entries: Vec<Obligation>,
}

impl ObligationList {
    /// build the list from the class schedule and the local payment index
    pub fn resolve(
        student: &Student,
        schedule: &[FeeHeadDefinition],
        index: &PaymentIndex,
        payment_date: &str,
        fines: &FineSchedule,
    ) -> Self {
        let entries: Vec<Obligation> = schedule
            .iter()
            .filter(|head| same_class(&head.class, &student.class))
            .map(|head| Obligation {
                fee_head: head.fee_head.clone(),
                amount: head.amount,
                fine: fines.fine_for(&head.due_date, payment_date),
                due_date: head.due_date.clone(),
                paid: index.paid(&head.fee_head).cloned(),
                selected: false,
                waive_fine: false,
                manual_fine: false,
                server_confirmed: false,
            })
            .collect();
        debug!(
            adm_no = %student.adm_no,
            heads = entries.len(),
            settled = entries.iter().filter(|o| o.is_paid()).count(),
            "resolved obligations"
        );
        Self {
            student: student.clone(),
            payment_date: payment_date.to_string(),
            entries,
        }
    }

    pub fn payment_date(&self) -> &str {
        &self.payment_date
    }

    pub fn entries(&self) -> &[Obligation] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// move the payment date and recompute every fine that has not been
    /// waived or manually edited; those stay sticky until reset
    pub fn set_payment_date(&mut self, payment_date: &str, fines: &FineSchedule) {
        self.payment_date = payment_date.to_string();
        for entry in &mut self.entries {
            if entry.waive_fine || entry.manual_fine {
                continue;
            }
            entry.fine = fines.fine_for(&entry.due_date, payment_date);
        }
    }

    /// toggle batch membership; settled entries cannot be selected
    pub fn toggle_selected(&mut self, idx: usize) {
        if let Some(entry) = self.entries.get_mut(idx) {
            if entry.is_paid() {
                return;
            }
            entry.selected = !entry.selected;
        }
    }

    pub fn set_amount(&mut self, idx: usize, amount: Money) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.amount = amount;
        }
    }

    /// waive sets the fine to zero; unwaiving restores the calculator value
    /// for the current payment date
    pub fn toggle_waive(&mut self, idx: usize, fines: &FineSchedule) {
        let date = self.payment_date.clone();
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.waive_fine = !entry.waive_fine;
            entry.manual_fine = false;
            entry.fine = if entry.waive_fine {
                Money::ZERO
            } else {
                fines.fine_for(&entry.due_date, &date)
            };
        }
    }

    pub fn set_manual_fine(&mut self, idx: usize, fine: Money) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.fine = fine;
            entry.manual_fine = true;
            entry.waive_fine = false;
        }
    }

    /// drop both override flags and return to the calculator-derived fine
    pub fn reset_fine(&mut self, idx: usize, fines: &FineSchedule) {
        let date = self.payment_date.clone();
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.fine = fines.fine_for(&entry.due_date, &date);
            entry.manual_fine = false;
            entry.waive_fine = false;
        }
    }

    /// entries that would go into a batch right now
    pub fn chosen(&self) -> Vec<&Obligation> {
        self.entries
            .iter()
            .filter(|o| o.selected && !o.is_paid())
            .collect()
    }

    pub fn selected_total(&self) -> Money {
        self.chosen().iter().map(|o| o.payable_total()).sum()
    }

    pub fn clear_selection(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    /// flip one head to settled and drop it from the selection
    pub fn mark_paid(&mut self, fee_head: &str, record: PaidRecord) {
        let key = head_key(fee_head);
        for entry in &mut self.entries {
            if head_key(&entry.fee_head) == key {
                entry.paid = Some(record.clone());
                entry.selected = false;
            }
        }
    }

    /// authoritative reconciliation: one concurrent existence check per
    /// not-locally-settled head, merged as each lands. A failed check only
    /// affects its own entry, which keeps its prior state.
    pub async fn confirm_with_server<G: SheetGateway>(
        &mut self,
        gateway: &G,
        time: &SafeTimeProvider,
    ) {
        let adm_no = self.student.adm_no.clone();
        let pending: Vec<(usize, String)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_paid())
            .map(|(i, o)| (i, o.fee_head.clone()))
            .collect();

        let mut checks: FuturesUnordered<_> = pending
            .into_iter()
            .map(|(i, head)| {
                let adm_no = adm_no.clone();
                async move {
                    let outcome = gateway.check_payment_status(&adm_no, &head).await;
                    (i, head, outcome)
                }
            })
            .collect();

        let today = time.now().date_naive().to_string();
        while let Some((idx, head, outcome)) = checks.next().await {
            match outcome {
                Ok(check) if check.ok && check.is_paid => {
                    let matched = check.matching_records.first();
                    let record = PaidRecord {
                        date: matched
                            .map(|r| r.date.trim().to_string())
                            .filter(|d| !d.is_empty())
                            .unwrap_or_else(|| today.clone()),
                        receipt_no: matched
                            .map(|r| r.receipt_no.trim().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| PREVIOUSLY_PAID.to_string()),
                    };
                    if let Some(entry) = self.entries.get_mut(idx) {
                        debug!(fee_head = %head, "server confirmed head as paid");
                        entry.paid = Some(record);
                        entry.selected = false;
                        entry.server_confirmed = true;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(fee_head = %head, error = %err, "payment status check failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{raw_txn, MockGateway};
    use crate::model::Transaction;
    use hourglass_rs::TimeSource;
    use proptest::prelude::*;

    fn student() -> Student {
        Student {
            adm_no: "101".to_string(),
            name: "Asha Rao".to_string(),
            class: "7A".to_string(),
            phone: "9876543210".to_string(),
        }
    }

    fn schedule() -> Vec<FeeHeadDefinition> {
        vec![
            FeeHeadDefinition {
                class: "7A".to_string(),
                fee_head: "Tuition".to_string(),
                amount: Money::from_major(5_000),
                due_date: "2024-01-15".to_string(),
            },
            FeeHeadDefinition {
                class: "7 a".to_string(),
                fee_head: "Transport".to_string(),
                amount: Money::from_major(800),
                due_date: String::new(),
            },
            FeeHeadDefinition {
                class: "8B".to_string(),
                fee_head: "Tuition".to_string(),
                amount: Money::from_major(6_000),
                due_date: "2024-01-15".to_string(),
            },
        ]
    }

    fn resolve_on(date: &str, index: &PaymentIndex) -> ObligationList {
        ObligationList::resolve(&student(), &schedule(), index, date, &FineSchedule::default())
    }

    fn test_clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            chrono::DateTime::parse_from_rfc3339("2024-02-01T09:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        ))
    }

    #[test]
    fn test_resolve_matches_class_with_normalization() {
        let list = resolve_on("2024-01-10", &PaymentIndex::default());
        let heads: Vec<&str> = list.entries().iter().map(|o| o.fee_head.as_str()).collect();
        // both 7A rows, not the 8B one
        assert_eq!(heads, vec!["Tuition", "Transport"]);
    }

    #[test]
    fn test_fines_computed_at_resolve() {
        let list = resolve_on("2024-01-20", &PaymentIndex::default());
        assert_eq!(list.entries()[0].fine, Money::from_major(25));
        // no due date, no fine
        assert_eq!(list.entries()[1].fine, Money::ZERO);
    }

    #[test]
    fn test_paid_heads_are_not_selectable() {
        let txns = vec![Transaction::from(raw_txn(
            "101", "Tuition", "", "2024-01-05", "171000",
        ))];
        let index = PaymentIndex::build(&txns, "101");
        let mut list = resolve_on("2024-01-10", &index);
        assert!(list.entries()[0].is_paid());
        list.toggle_selected(0);
        assert!(!list.entries()[0].selected);
        list.toggle_selected(1);
        assert!(list.entries()[1].selected);
    }

    #[test]
    fn test_date_change_recomputes_unless_sticky() {
        let mut list = resolve_on("2024-01-10", &PaymentIndex::default());
        list.set_manual_fine(0, Money::from_major(10));
        list.set_payment_date("2024-02-20", &FineSchedule::default());
        // manual fine survives the date change
        assert_eq!(list.entries()[0].fine, Money::from_major(10));
        list.reset_fine(0, &FineSchedule::default());
        // 36 days late -> third block
        assert_eq!(list.entries()[0].fine, Money::from_major(75));
    }

    #[test]
    fn test_waive_unwaive_round_trip() {
        let mut list = resolve_on("2024-01-20", &PaymentIndex::default());
        let derived = list.entries()[0].fine;
        list.toggle_waive(0, &FineSchedule::default());
        assert_eq!(list.entries()[0].fine, Money::ZERO);
        assert!(list.entries()[0].waive_fine);
        list.toggle_waive(0, &FineSchedule::default());
        assert_eq!(list.entries()[0].fine, derived);
        assert!(!list.entries()[0].waive_fine);
    }

    #[test]
    fn test_manual_fine_clears_waiver() {
        let mut list = resolve_on("2024-01-20", &PaymentIndex::default());
        list.toggle_waive(0, &FineSchedule::default());
        list.set_manual_fine(0, Money::from_major(40));
        let entry = &list.entries()[0];
        assert!(entry.manual_fine);
        assert!(!entry.waive_fine);
        assert_eq!(entry.fine, Money::from_major(40));
    }

    #[test]
    fn test_selected_total_honors_waiver() {
        let mut list = resolve_on("2024-01-20", &PaymentIndex::default());
        list.toggle_selected(0);
        list.toggle_selected(1);
        assert_eq!(list.selected_total(), Money::from_major(5_825));
        list.toggle_waive(0, &FineSchedule::default());
        assert_eq!(list.selected_total(), Money::from_major(5_800));
    }

    #[test]
    fn test_mark_paid_drops_selection() {
        let mut list = resolve_on("2024-01-10", &PaymentIndex::default());
        list.toggle_selected(0);
        list.mark_paid(
            " Tuition ",
            PaidRecord {
                date: "2024-01-10".to_string(),
                receipt_no: "171234".to_string(),
            },
        );
        let entry = &list.entries()[0];
        assert!(entry.is_paid());
        assert!(!entry.selected);
        assert_eq!(entry.paid.as_ref().unwrap().receipt_no, "171234");
    }

    #[tokio::test]
    async fn test_server_confirmation_overwrites_paid_state() {
        let gateway = MockGateway::default();
        gateway.checks.lock().unwrap().insert(
            MockGateway::check_key("101", "Tuition"),
            MockGateway::paid_check("2024-01-03", "170500"),
        );
        let mut list = resolve_on("2024-01-10", &PaymentIndex::default());
        list.toggle_selected(0);
        list.confirm_with_server(&gateway, &test_clock()).await;

        let tuition = &list.entries()[0];
        assert!(tuition.server_confirmed);
        assert!(!tuition.selected);
        assert_eq!(tuition.paid.as_ref().unwrap().receipt_no, "170500");
        // the other head stays payable
        assert!(!list.entries()[1].is_paid());
    }

    #[tokio::test]
    async fn test_confirmation_uses_placeholders_when_server_omits_records() {
        let gateway = MockGateway::default();
        gateway.checks.lock().unwrap().insert(
            MockGateway::check_key("101", "Tuition"),
            crate::gateway::PaymentCheck {
                ok: true,
                is_paid: true,
                matching_records: Vec::new(),
            },
        );
        let mut list = resolve_on("2024-01-10", &PaymentIndex::default());
        list.confirm_with_server(&gateway, &test_clock()).await;

        let paid = list.entries()[0].paid.as_ref().unwrap();
        assert_eq!(paid.date, "2024-02-01");
        assert_eq!(paid.receipt_no, PREVIOUSLY_PAID);
    }

    #[tokio::test]
    async fn test_failed_check_is_isolated() {
        let gateway = MockGateway::default();
        gateway
            .failing_checks
            .lock()
            .unwrap()
            .insert(MockGateway::check_key("101", "Tuition"));
        gateway.checks.lock().unwrap().insert(
            MockGateway::check_key("101", "Transport"),
            MockGateway::paid_check("2024-01-03", "170501"),
        );
        let mut list = resolve_on("2024-01-10", &PaymentIndex::default());
        list.confirm_with_server(&gateway, &test_clock()).await;

        // failed check leaves its entry untouched, sibling still merged
        assert!(!list.entries()[0].is_paid());
        assert!(list.entries()[1].is_paid());
    }

    #[tokio::test]
    async fn test_already_paid_heads_are_not_rechecked() {
        let txns = vec![Transaction::from(raw_txn(
            "101", "Tuition", "", "2024-01-05", "171000",
        ))];
        let index = PaymentIndex::build(&txns, "101");
        let mut list = resolve_on("2024-01-10", &index);
        let gateway = MockGateway::default();
        // a check against Tuition would fail loudly; it must never be issued
        gateway
            .failing_checks
            .lock()
            .unwrap()
            .insert(MockGateway::check_key("101", "Tuition"));
        list.confirm_with_server(&gateway, &test_clock()).await;
        assert_eq!(
            list.entries()[0].paid.as_ref().unwrap().receipt_no,
            "171000"
        );
    }

    proptest! {
        /// a head with an effective transaction is never selectable,
        /// whatever the schedule/transaction mix
        #[test]
        fn settled_heads_never_selectable(
            rows in proptest::collection::vec((0u8..3, proptest::bool::ANY), 0..12)
        ) {
            let heads = ["Tuition", "Transport", "Library"];
            let txns: Vec<Transaction> = rows
                .iter()
                .enumerate()
                .map(|(i, (head, voided))| Transaction::from(raw_txn(
                    "101",
                    heads[*head as usize],
                    if *voided { "Y" } else { "" },
                    "2024-01-05",
                    &format!("17{i:04}"),
                )))
                .collect();
            let index = PaymentIndex::build(&txns, "101");
            let mut list = resolve_on("2024-01-10", &index);
            for idx in 0..list.entries().len() {
                list.toggle_selected(idx);
            }
            for entry in list.entries() {
                let effective = txns.iter().any(|t| {
                    !t.is_voided() && crate::types::head_key(&t.fee_head) == crate::types::head_key(&entry.fee_head)
                });
                if effective {
                    prop_assert!(entry.is_paid());
                    prop_assert!(!entry.selected);
                    prop_assert!(!entry.is_selectable());
                }
            }
        }
    }
}
