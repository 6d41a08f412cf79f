//! CSV export surfaces. Row structs map directly onto the column layout
//! the existing downstream consumers expect; field order matters.

use std::io::Write;

use serde::Serialize;

use crate::dates::format_display;
use crate::decimal::Money;
use crate::errors::Result;
use crate::reminders::{DueItem, StudentDueGroup};
use crate::reports::{GroupSummary, ReportRow};
use crate::status::FeeStatusReport;

#[derive(Debug, Serialize)]
struct DetailedCsv<'a> {
    #[serde(rename = "Date")]
    date: &'a str,
    #[serde(rename = "Receipt")]
    receipt: &'a str,
    #[serde(rename = "AdmNo")]
    adm_no: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Class")]
    class: &'a str,
    #[serde(rename = "FeeHead")]
    fee_head: &'a str,
    #[serde(rename = "Amount")]
    amount: Money,
    #[serde(rename = "Fine")]
    fine: Money,
    #[serde(rename = "Total")]
    total: Money,
    #[serde(rename = "Mode")]
    mode: &'a str,
    #[serde(rename = "Voided")]
    voided: &'a str,
}

/// row-per-transaction export of a filtered report
pub fn write_detailed_csv(
    rows: &[ReportRow],
    include_fine: bool,
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        let txn = &row.txn;
        wtr.serialize(DetailedCsv {
            date: &txn.date,
            receipt: &txn.receipt_no,
            adm_no: &txn.adm_no,
            name: &txn.name,
            class: &txn.class,
            fee_head: &txn.fee_head,
            amount: txn.amount,
            fine: txn.fine,
            total: row.total(include_fine),
            mode: &txn.mode,
            voided: if txn.is_voided() { "Y" } else { "" },
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct GroupedCsv<'a> {
    #[serde(rename = "Group")]
    group: &'a str,
    #[serde(rename = "Receipts")]
    receipts: usize,
    #[serde(rename = "Gross")]
    gross: Money,
    #[serde(rename = "Fine")]
    fine: Money,
    #[serde(rename = "Total")]
    total: Money,
}

/// row-per-group export of an aggregated report
pub fn write_grouped_csv(groups: &[GroupSummary], writer: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for group in groups {
        wtr.serialize(GroupedCsv {
            group: &group.key,
            receipts: group.receipts,
            gross: group.gross,
            fine: group.fine,
            total: group.total,
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReminderItemCsv<'a> {
    #[serde(rename = "AdmNo")]
    adm_no: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Class")]
    class: &'a str,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "FeeHead")]
    fee_head: &'a str,
    #[serde(rename = "Amount")]
    amount: Money,
    #[serde(rename = "DueDate")]
    due_date: String,
}

/// one row per unpaid head
pub fn write_reminder_items_csv(items: &[DueItem], writer: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for item in items {
        wtr.serialize(ReminderItemCsv {
            adm_no: &item.adm_no,
            name: &item.name,
            class: &item.class,
            phone: &item.phone,
            fee_head: &item.fee_head,
            amount: item.amount,
            due_date: format_display(&item.due_date),
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReminderGroupCsv<'a> {
    #[serde(rename = "AdmNo")]
    adm_no: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Class")]
    class: &'a str,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "Heads")]
    heads: String,
    #[serde(rename = "Total")]
    total: Money,
    #[serde(rename = "EarliestDue")]
    earliest_due: String,
}

/// one row per student with the pending heads folded into one column
pub fn write_reminder_groups_csv(groups: &[StudentDueGroup], writer: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for group in groups {
        let heads: Vec<String> = group
            .items
            .iter()
            .map(|line| format!("{} (\u{20b9}{})", line.fee_head, line.amount))
            .collect();
        wtr.serialize(ReminderGroupCsv {
            adm_no: &group.adm_no,
            name: &group.name,
            class: &group.class,
            phone: &group.phone,
            heads: heads.join("; "),
            total: group.total,
            earliest_due: format_display(&group.earliest_due),
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct FeeStatusCsv<'a> {
    #[serde(rename = "FeeHead")]
    fee_head: &'a str,
    #[serde(rename = "Amount")]
    amount: Money,
    #[serde(rename = "DueDate")]
    due_date: &'a str,
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "PaymentDate")]
    payment_date: &'a str,
    #[serde(rename = "ReceiptNo")]
    receipt_no: &'a str,
}

/// one row per scheduled head of a student's fee status
pub fn write_fee_status_csv(report: &FeeStatusReport, writer: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for line in &report.lines {
        wtr.serialize(FeeStatusCsv {
            fee_head: &line.fee_head,
            amount: line.amount,
            due_date: &line.due_date,
            status: if line.paid { "Paid" } else { "Pending" },
            payment_date: &line.payment_date,
            receipt_no: &line.receipt_no,
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
