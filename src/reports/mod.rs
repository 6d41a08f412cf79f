//! Filtered, grouped views over the transaction history. Report rows are
//! derived on demand and never write back to the source data.

pub mod export;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::parse_date;
use crate::decimal::Money;
use crate::model::Transaction;
use crate::types::same_class;

/// a transaction augmented with its parsed date
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub txn: Transaction,
    pub date: Option<NaiveDate>,
}

impl From<Transaction> for ReportRow {
    fn from(txn: Transaction) -> Self {
        let date = parse_date(&txn.date);
        Self { txn, date }
    }
}

impl ReportRow {
    /// amount used for range filtering and totals
    pub fn total(&self, include_fine: bool) -> Money {
        if include_fine {
            self.txn.total()
        } else {
            self.txn.amount
        }
    }
}

pub fn build_rows(transactions: &[Transaction]) -> Vec<ReportRow> {
    transactions.iter().cloned().map(ReportRow::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// effective rows only
    #[default]
    Valid,
    /// voided rows only
    Voided,
    All,
}

/// independent predicates; the filtered set is their intersection
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFilter {
    pub status: StatusFilter,
    /// role restriction (a teacher only ever sees their class); applied on
    /// top of any explicit class filter
    pub scope_class: Option<String>,
    pub from: Option<NaiveDate>,
    /// inclusive through the end of this day
    pub to: Option<NaiveDate>,
    pub class: Option<String>,
    pub fee_head: Option<String>,
    pub mode: Option<String>,
    pub search: String,
    pub min_total: Option<Money>,
    pub max_total: Option<Money>,
    pub include_fine: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            status: StatusFilter::Valid,
            scope_class: None,
            from: None,
            to: None,
            class: None,
            fee_head: None,
            mode: None,
            search: String::new(),
            min_total: None,
            max_total: None,
            include_fine: true,
        }
    }
}

impl ReportFilter {
    pub fn matches(&self, row: &ReportRow) -> bool {
        let txn = &row.txn;
        match self.status {
            StatusFilter::Valid if txn.is_voided() => return false,
            StatusFilter::Voided if !txn.is_voided() => return false,
            _ => {}
        }
        if let Some(scope) = &self.scope_class {
            if !same_class(&txn.class, scope) {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            // rows without a usable date fall outside any date window
            let Some(date) = row.date else { return false };
            if self.from.is_some_and(|from| date < from) {
                return false;
            }
            if self.to.is_some_and(|to| date > to) {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if !same_class(&txn.class, class) {
                return false;
            }
        }
        if let Some(head) = &self.fee_head {
            if txn.fee_head != *head {
                return false;
            }
        }
        if let Some(mode) = &self.mode {
            if txn.mode != *mode {
                return false;
            }
        }
        let q = self.search.trim().to_lowercase();
        if !q.is_empty()
            && !txn.adm_no.to_lowercase().contains(&q)
            && !txn.name.to_lowercase().contains(&q)
            && !txn.receipt_no.to_lowercase().contains(&q)
        {
            return false;
        }
        let total = row.total(self.include_fine);
        if self.min_total.is_some_and(|min| total < min) {
            return false;
        }
        if self.max_total.is_some_and(|max| total > max) {
            return false;
        }
        true
    }
}

pub fn filter_rows(rows: &[ReportRow], filter: &ReportFilter) -> Vec<ReportRow> {
    rows.iter().filter(|r| filter.matches(r)).cloned().collect()
}

/// headline numbers for the filtered set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub gross: Money,
    pub fine: Money,
    /// gross, or gross plus fine when fines are included
    pub included: Money,
    pub void_count: usize,
    pub count: usize,
}

pub fn summarize(rows: &[ReportRow], include_fine: bool) -> Summary {
    let gross: Money = rows.iter().map(|r| r.txn.amount).sum();
    let fine: Money = rows.iter().map(|r| r.txn.fine).sum();
    Summary {
        gross,
        fine,
        included: if include_fine { gross + fine } else { gross },
        void_count: rows.iter().filter(|r| r.txn.is_voided()).count(),
        count: rows.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    None,
    Class,
    FeeHead,
    Mode,
    /// raw date cell
    Day,
    /// `YYYY-MM` of the parsed date
    Month,
    /// `name (admission number)`
    Student,
}

impl GroupBy {
    fn key(self, row: &ReportRow) -> String {
        fn or_dash(s: &str) -> String {
            if s.is_empty() {
                "-".to_string()
            } else {
                s.to_string()
            }
        }
        let txn = &row.txn;
        match self {
            GroupBy::None => "ALL".to_string(),
            GroupBy::Class => or_dash(&txn.class),
            GroupBy::FeeHead => or_dash(&txn.fee_head),
            GroupBy::Mode => or_dash(&txn.mode),
            GroupBy::Day => or_dash(&txn.date),
            GroupBy::Month => row
                .date
                .map(|d| d.format("%Y-%m").to_string())
                .unwrap_or_else(|| "-".to_string()),
            GroupBy::Student => format!("{} ({})", txn.name, txn.adm_no),
        }
    }
}

/// per-group rollup
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub key: String,
    pub receipts: usize,
    pub gross: Money,
    pub fine: Money,
    pub total: Money,
}

/// aggregate by the chosen key; groups come back largest total first.
/// `GroupBy::None` yields the single implicit bucket.
pub fn group(rows: &[ReportRow], group_by: GroupBy, include_fine: bool) -> Vec<GroupSummary> {
    let mut buckets: BTreeMap<String, (usize, Money, Money)> = BTreeMap::new();
    for row in rows {
        let entry = buckets
            .entry(group_by.key(row))
            .or_insert((0, Money::ZERO, Money::ZERO));
        entry.0 += 1;
        entry.1 += row.txn.amount;
        entry.2 += row.txn.fine;
    }
    let mut groups: Vec<GroupSummary> = buckets
        .into_iter()
        .map(|(key, (receipts, gross, fine))| GroupSummary {
            key,
            receipts,
            gross,
            fine,
            total: if include_fine { gross + fine } else { gross },
        })
        .collect();
    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    groups
}
