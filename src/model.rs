use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::ReceiptNo;

/// immutable student reference data, identity = admission number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub adm_no: String,
    pub name: String,
    pub class: String,
    pub phone: String,
}

/// one schedule row: what a class owes under a given fee head
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeHeadDefinition {
    pub class: String,
    pub fee_head: String,
    pub amount: Money,
    /// raw date cell; may be empty or unparseable (then no fine accrues)
    pub due_date: String,
}

/// one stored payment row. Created only by a successful batch submission;
/// voiding flips the flag but the row is never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub receipt_no: ReceiptNo,
    pub date: String,
    pub adm_no: String,
    pub name: String,
    pub class: String,
    pub fee_head: String,
    pub amount: Money,
    pub fine: Money,
    pub mode: String,
    /// void column as stored: anything starting with "Y" means voided
    pub void: String,
}

impl Transaction {
    pub fn is_voided(&self) -> bool {
        self.void.trim().to_uppercase().starts_with('Y')
    }

    pub fn total(&self) -> Money {
        self.amount + self.fine
    }
}

/// one line of a settled batch, as echoed back on the receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub fee_head: String,
    pub amount: Money,
    pub fine: Money,
    pub reference: String,
}

impl ReceiptItem {
    pub fn total(&self) -> Money {
        self.amount + self.fine
    }
}

/// the settled batch: every item shares the server-assigned receipt number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_no: ReceiptNo,
    pub date: String,
    pub student: Student,
    pub items: Vec<ReceiptItem>,
    pub mode: String,
    pub remarks: String,
}

impl Receipt {
    pub fn total(&self) -> Money {
        self.items.iter().map(ReceiptItem::total).sum()
    }
}
