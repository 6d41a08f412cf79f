//! Multi-student collection: one batch per student, submitted as a fan-out
//! that settles every batch and collects failures per student instead of
//! aborting on the first error.

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::decimal::Money;
use crate::fine::FineSchedule;
use crate::gateway::{BatchItem, BatchPayload, SheetGateway};
use crate::index::GlobalPaymentIndex;
use crate::model::{FeeHeadDefinition, Student};
use crate::types::{head_key, same_class};

/// one fee head picked for the whole run
#[derive(Debug, Clone, PartialEq)]
pub struct BulkHeadChoice {
    pub fee_head: String,
    pub waive_fine: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequest {
    pub date: String,
    pub mode: String,
    pub remarks: String,
    pub students: Vec<Student>,
    pub heads: Vec<BulkHeadChoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkSuccess {
    pub adm_no: String,
    pub name: String,
    pub receipt_no: String,
    pub date: String,
    pub item_count: usize,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub adm_no: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkOutcome {
    pub successes: Vec<BulkSuccess>,
    pub failures: Vec<BulkFailure>,
    /// students with nothing payable (wrong class or everything settled)
    pub skipped: Vec<String>,
}

/// build one payload per student: class-matching heads only, already
/// settled heads dropped, fines computed against the run date unless the
/// head's fine was waived for the run
fn build_payloads(
    request: &BulkRequest,
    schedule: &[FeeHeadDefinition],
    index: &GlobalPaymentIndex,
    fines: &FineSchedule,
) -> (Vec<BatchPayload>, Vec<String>) {
    let mut payloads = Vec::new();
    let mut skipped = Vec::new();
    for student in &request.students {
        let items: Vec<BatchItem> = request
            .heads
            .iter()
            .filter_map(|choice| {
                let row = schedule.iter().find(|head| {
                    same_class(&head.class, &student.class)
                        && head_key(&head.fee_head) == head_key(&choice.fee_head)
                })?;
                if index.is_paid(&student.adm_no, &row.fee_head) {
                    return None;
                }
                Some(BatchItem {
                    fee_head: row.fee_head.clone(),
                    amount: row.amount,
                    fine: if choice.waive_fine {
                        Money::ZERO
                    } else {
                        fines.fine_for(&row.due_date, &request.date)
                    },
                    reference: String::new(),
                })
            })
            .collect();
        if items.is_empty() {
            skipped.push(student.adm_no.clone());
            continue;
        }
        payloads.push(BatchPayload {
            date: request.date.clone(),
            adm_no: student.adm_no.clone(),
            name: student.name.clone(),
            class: student.class.clone(),
            mode: request.mode.clone(),
            remarks: request.remarks.clone(),
            items,
        });
    }
    (payloads, skipped)
}

pub async fn submit_bulk<G: SheetGateway>(
    gateway: &G,
    request: &BulkRequest,
    schedule: &[FeeHeadDefinition],
    index: &GlobalPaymentIndex,
    fines: &FineSchedule,
) -> BulkOutcome {
    let (payloads, skipped) = build_payloads(request, schedule, index, fines);
    debug!(
        students = request.students.len(),
        batches = payloads.len(),
        skipped = skipped.len(),
        "submitting bulk payment"
    );

    let mut submissions: FuturesUnordered<_> = payloads
        .iter()
        .map(|payload| async move {
            let outcome = gateway.submit_payment_batch(payload).await;
            (payload, outcome)
        })
        .collect();

    let mut result = BulkOutcome {
        skipped,
        ..BulkOutcome::default()
    };
    while let Some((payload, outcome)) = submissions.next().await {
        match outcome {
            Ok(batch) => result.successes.push(BulkSuccess {
                adm_no: payload.adm_no.clone(),
                name: payload.name.clone(),
                receipt_no: batch.receipt_no,
                date: batch.date,
                item_count: payload.items.len(),
                total: payload.items.iter().map(|i| i.amount + i.fine).sum(),
            }),
            Err(err) => result.failures.push(BulkFailure {
                adm_no: payload.adm_no.clone(),
                name: payload.name.clone(),
                error: err.to_string(),
            }),
        }
    }
    // completion order is arbitrary; keep the report stable
    result.successes.sort_by(|a, b| a.adm_no.cmp(&b.adm_no));
    result.failures.sort_by(|a, b| a.adm_no.cmp(&b.adm_no));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{raw_txn, MockGateway};
    use crate::model::Transaction;

    fn student(adm: &str, name: &str, class: &str) -> Student {
        Student {
            adm_no: adm.to_string(),
            name: name.to_string(),
            class: class.to_string(),
            phone: String::new(),
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
                class: "8B".to_string(),
                fee_head: "Tuition".to_string(),
                amount: Money::from_major(6_000),
                due_date: "2024-01-15".to_string(),
            },
        ]
    }

    fn request(students: Vec<Student>) -> BulkRequest {
        BulkRequest {
            date: "2024-02-01".to_string(),
            mode: "Cash".to_string(),
            remarks: String::new(),
            students,
            heads: vec![BulkHeadChoice {
                fee_head: "Tuition".to_string(),
                waive_fine: false,
            }],
        }
    }

    #[tokio::test]
    async fn test_bulk_builds_one_batch_per_student_with_class_amounts() {
        let gateway = MockGateway::default();
        let outcome = submit_bulk(
            &gateway,
            &request(vec![
                student("101", "Asha", "7A"),
                student("201", "Bala", "8B"),
            ]),
            &schedule(),
            &GlobalPaymentIndex::default(),
            &FineSchedule::default(),
        )
        .await;

        assert_eq!(outcome.successes.len(), 2);
        assert!(outcome.failures.is_empty());
        let submitted = gateway.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 2);
        let seven_a = submitted.iter().find(|p| p.adm_no == "101").unwrap();
        // 5000 plus two 15-day blocks of fine (17 days late)
        assert_eq!(seven_a.items[0].amount, Money::from_major(5_000));
        assert_eq!(seven_a.items[0].fine, Money::from_major(50));
        let eight_b = submitted.iter().find(|p| p.adm_no == "201").unwrap();
        assert_eq!(eight_b.items[0].amount, Money::from_major(6_000));
    }

    #[tokio::test]
    async fn test_bulk_skips_settled_heads_and_unmatched_classes() {
        let gateway = MockGateway::default();
        let txns: Vec<Transaction> = vec![raw_txn("101", "Tuition", "", "2024-01-05", "170001")
            .into()];
        let index = GlobalPaymentIndex::build(&txns);
        let outcome = submit_bulk(
            &gateway,
            &request(vec![
                student("101", "Asha", "7A"),
                student("301", "Charu", "9C"),
                student("201", "Bala", "8B"),
            ]),
            &schedule(),
            &index,
            &FineSchedule::default(),
        )
        .await;

        // 101 already paid, 9C has no Tuition row
        assert_eq!(outcome.skipped, vec!["101".to_string(), "301".to_string()]);
        assert_eq!(outcome.successes.len(), 1);
        assert_eq!(outcome.successes[0].adm_no, "201");
    }

    #[tokio::test]
    async fn test_bulk_settles_all_and_collects_failures() {
        let gateway = MockGateway::default();
        *gateway.submit.lock().unwrap() = Some(crate::gateway::mock::SubmitBehavior::Fail {
            message: "quota exceeded".to_string(),
        });
        let outcome = submit_bulk(
            &gateway,
            &request(vec![
                student("201", "Bala", "8B"),
                student("101", "Asha", "7A"),
            ]),
            &schedule(),
            &GlobalPaymentIndex::default(),
            &FineSchedule::default(),
        )
        .await;

        // every batch was attempted; both failures reported, in stable order
        assert_eq!(gateway.submitted.lock().unwrap().len(), 2);
        assert!(outcome.successes.is_empty());
        let adms: Vec<&str> = outcome.failures.iter().map(|f| f.adm_no.as_str()).collect();
        assert_eq!(adms, vec!["101", "201"]);
        assert_eq!(outcome.failures[0].error, "quota exceeded");
    }

    #[tokio::test]
    async fn test_bulk_waiver_zeroes_fines() {
        let gateway = MockGateway::default();
        let mut req = request(vec![student("101", "Asha", "7A")]);
        req.heads[0].waive_fine = true;
        let outcome = submit_bulk(
            &gateway,
            &req,
            &schedule(),
            &GlobalPaymentIndex::default(),
            &FineSchedule::default(),
        )
        .await;
        assert_eq!(outcome.successes[0].total, Money::from_major(5_000));
    }
}
