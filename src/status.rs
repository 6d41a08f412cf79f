//! Comprehensive fee position for one student: every scheduled head with
//! its settled/pending state, plus the headline totals.

use chrono::NaiveDate;

use crate::decimal::Money;
use crate::fine::FineSchedule;
use crate::index::PaymentIndex;
use crate::model::{FeeHeadDefinition, Student};
use crate::types::same_class;

#[derive(Debug, Clone, PartialEq)]
pub struct FeeStatusLine {
    pub fee_head: String,
    pub amount: Money,
    pub due_date: String,
    pub paid: bool,
    pub payment_date: String,
    pub receipt_no: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeeStatusSummary {
    /// amounts still owed
    pub total_due: Money,
    /// amounts already settled
    pub total_paid: Money,
    /// fines accrued on the pending heads as of today
    pub total_fine: Money,
    /// what clearing everything today would cost
    pub grand_total: Money,
    pub payment_complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeStatusReport {
    pub student: Student,
    pub lines: Vec<FeeStatusLine>,
    pub summary: FeeStatusSummary,
}

pub fn student_fee_status(
    student: &Student,
    schedule: &[FeeHeadDefinition],
    index: &PaymentIndex,
    fines: &FineSchedule,
    today: NaiveDate,
) -> FeeStatusReport {
    let today_str = today.to_string();
    let mut lines = Vec::new();
    let mut summary = FeeStatusSummary::default();
    for head in schedule {
        if !same_class(&head.class, &student.class) {
            continue;
        }
        match index.paid(&head.fee_head) {
            Some(record) => {
                summary.total_paid += head.amount;
                lines.push(FeeStatusLine {
                    fee_head: head.fee_head.clone(),
                    amount: head.amount,
                    due_date: head.due_date.clone(),
                    paid: true,
                    payment_date: record.date.clone(),
                    receipt_no: record.receipt_no.clone(),
                });
            }
            None => {
                summary.total_due += head.amount;
                summary.total_fine += fines.fine_for(&head.due_date, &today_str);
                lines.push(FeeStatusLine {
                    fee_head: head.fee_head.clone(),
                    amount: head.amount,
                    due_date: head.due_date.clone(),
                    paid: false,
                    payment_date: String::new(),
                    receipt_no: String::new(),
                });
            }
        }
    }
    summary.grand_total = summary.total_due + summary.total_fine;
    summary.payment_complete = lines.iter().all(|line| line.paid);
    FeeStatusReport {
        student: student.clone(),
        lines,
        summary,
    }
}
