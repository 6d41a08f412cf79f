//! Boundary toward the spreadsheet-backed payment server.
//!
//! The wire rows are loosely typed: the sheets hand back numeric admission
//! numbers, string amounts, and several spellings per column. Everything is
//! absorbed here, once, so the rest of the crate only ever sees the
//! canonical model.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::decimal::Money;
use crate::errors::Result;
use crate::model::{FeeHeadDefinition, Student, Transaction};

fn loose_string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn loose_money<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Money, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => Money::from_cell(&n.to_string()),
        Value::String(s) => Money::from_cell(&s),
        _ => Money::ZERO,
    })
}

/// student row as the sheet serves it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStudent {
    #[serde(default, rename = "admNo", alias = "AdmNo", deserialize_with = "loose_string")]
    pub adm_no: String,
    #[serde(default, alias = "studentName", alias = "Name", deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, rename = "cls", alias = "class", alias = "Class", deserialize_with = "loose_string")]
    pub class: String,
    #[serde(default, alias = "mobile", alias = "Phone", deserialize_with = "loose_string")]
    pub phone: String,
}

impl From<RawStudent> for Student {
    fn from(raw: RawStudent) -> Self {
        Student {
            adm_no: raw.adm_no.trim().to_string(),
            name: raw.name.trim().to_string(),
            class: raw.class.trim().to_string(),
            phone: raw.phone.trim().to_string(),
        }
    }
}

/// fee schedule row as the sheet serves it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeeHead {
    #[serde(default, alias = "Class", deserialize_with = "loose_string")]
    pub class: String,
    #[serde(default, rename = "feeHead", alias = "feehead", alias = "FeeHead", deserialize_with = "loose_string")]
    pub fee_head: String,
    #[serde(default, alias = "Amount", deserialize_with = "loose_money")]
    pub amount: Money,
    #[serde(default, rename = "dueDate", alias = "DueDate", deserialize_with = "loose_string")]
    pub due_date: String,
}

impl From<RawFeeHead> for FeeHeadDefinition {
    fn from(raw: RawFeeHead) -> Self {
        FeeHeadDefinition {
            class: raw.class.trim().to_string(),
            fee_head: raw.fee_head.trim().to_string(),
            amount: raw.amount,
            due_date: raw.due_date.trim().to_string(),
        }
    }
}

/// transaction row as the sheet serves it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(default, rename = "receiptNo", alias = "ReceiptNo", deserialize_with = "loose_string")]
    pub receipt_no: String,
    #[serde(default, alias = "Date", deserialize_with = "loose_string")]
    pub date: String,
    #[serde(default, rename = "admNo", alias = "AdmNo", deserialize_with = "loose_string")]
    pub adm_no: String,
    #[serde(default, alias = "Name", deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, rename = "cls", alias = "class", alias = "Class", deserialize_with = "loose_string")]
    pub class: String,
    #[serde(default, rename = "feeHead", alias = "FeeHead", deserialize_with = "loose_string")]
    pub fee_head: String,
    #[serde(default, alias = "Amount", deserialize_with = "loose_money")]
    pub amount: Money,
    #[serde(default, alias = "Fine", deserialize_with = "loose_money")]
    pub fine: Money,
    #[serde(default, alias = "Mode", deserialize_with = "loose_string")]
    pub mode: String,
    #[serde(default, alias = "Void", deserialize_with = "loose_string")]
    pub void: String,
}

impl From<RawTransaction> for Transaction {
    fn from(raw: RawTransaction) -> Self {
        Transaction {
            receipt_no: raw.receipt_no.trim().to_string(),
            date: raw.date.trim().to_string(),
            adm_no: raw.adm_no.trim().to_string(),
            name: raw.name.trim().to_string(),
            class: raw.class.trim().to_string(),
            fee_head: raw.fee_head.trim().to_string(),
            amount: raw.amount,
            fine: raw.fine,
            mode: raw.mode.trim().to_string(),
            void: raw.void,
        }
    }
}

/// one line of a batch submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    #[serde(rename = "feeHead")]
    pub fee_head: String,
    pub amount: Money,
    pub fine: Money,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// batch submission payload; the server assigns one receipt number to
/// every item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPayload {
    pub date: String,
    #[serde(rename = "admNo")]
    pub adm_no: String,
    pub name: String,
    #[serde(rename = "cls")]
    pub class: String,
    pub mode: String,
    pub remarks: String,
    pub items: Vec<BatchItem>,
}

/// successful batch outcome
#[derive(Debug, Clone, Deserialize)]
pub struct BatchReceipt {
    #[serde(default, rename = "receiptNo", deserialize_with = "loose_string")]
    pub receipt_no: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub date: String,
}

/// authoritative single-obligation check
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentCheck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, rename = "isPaid")]
    pub is_paid: bool,
    #[serde(default, rename = "matchingRecords")]
    pub matching_records: Vec<MatchingRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub date: String,
    #[serde(default, rename = "receiptNo", deserialize_with = "loose_string")]
    pub receipt_no: String,
}

/// operations the core needs from the payment server. Implementations own
/// transport, auth and response decoding; duplicate-payment rejections must
/// surface as [`crate::FeeError::DuplicatePayment`], everything else as
/// [`crate::FeeError::Remote`] with the upstream message kept verbatim.
#[allow(async_fn_in_trait)]
pub trait SheetGateway {
    async fn list_students(&self) -> Result<Vec<RawStudent>>;
    async fn list_fee_heads(&self) -> Result<Vec<RawFeeHead>>;
    async fn list_transactions(&self) -> Result<Vec<RawTransaction>>;
    async fn check_payment_status(&self, adm_no: &str, fee_head: &str) -> Result<PaymentCheck>;
    async fn submit_payment_batch(&self, payload: &BatchPayload) -> Result<BatchReceipt>;
    async fn void_receipt(&self, receipt_no: &str) -> Result<()>;
    async fn unvoid_receipt(&self, receipt_no: &str) -> Result<()>;
}
