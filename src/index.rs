use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::warn;

use crate::dates::parse_date;
use crate::model::Transaction;
use crate::types::{adm_key, head_key};

/// settled-state derived from the transaction history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidRecord {
    pub date: String,
    pub receipt_no: String,
}

/// more than one effective (non-voided) row for one (admission, head) pair.
/// Should not happen, but concurrent clients can produce it; it is reported,
/// not repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCharge {
    pub adm_no: String,
    pub fee_head: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    record: PaidRecord,
    parsed: Option<NaiveDate>,
    hits: usize,
}

impl Slot {
    fn absorb(&mut self, record: PaidRecord, parsed: Option<NaiveDate>) {
        self.hits += 1;
        // latest parsed date wins; unparseable dates never displace a
        // parseable one, equal dates keep the first row seen
        if parsed > self.parsed {
            self.record = record;
            self.parsed = parsed;
        }
    }
}

/// per-student map of fee head -> most recent effective payment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentIndex {
    entries: HashMap<String, Slot>,
}

impl PaymentIndex {
    /// fold the transaction list down to the settled heads of one student.
    /// Voided rows never establish "paid".
    pub fn build(transactions: &[Transaction], adm_no: &str) -> Self {
        let target = adm_key(adm_no);
        let mut entries: HashMap<String, Slot> = HashMap::new();
        for txn in transactions {
            if txn.is_voided() || adm_key(&txn.adm_no) != target {
                continue;
            }
            let record = PaidRecord {
                date: txn.date.clone(),
                receipt_no: txn.receipt_no.clone(),
            };
            let parsed = parse_date(&txn.date);
            entries
                .entry(head_key(&txn.fee_head))
                .and_modify(|slot| slot.absorb(record.clone(), parsed))
                .or_insert(Slot {
                    record,
                    parsed,
                    hits: 1,
                });
        }
        let index = Self { entries };
        for dup in index.duplicates(adm_no) {
            warn!(
                adm_no = %dup.adm_no,
                fee_head = %dup.fee_head,
                count = dup.count,
                "multiple effective payments for one fee head"
            );
        }
        index
    }

    pub fn paid(&self, fee_head: &str) -> Option<&PaidRecord> {
        self.entries.get(&head_key(fee_head)).map(|s| &s.record)
    }

    pub fn is_paid(&self, fee_head: &str) -> bool {
        self.entries.contains_key(&head_key(fee_head))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// heads backed by more than one effective transaction
    pub fn duplicates(&self, adm_no: &str) -> Vec<DuplicateCharge> {
        let mut dups: Vec<DuplicateCharge> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.hits > 1)
            .map(|(head, slot)| DuplicateCharge {
                adm_no: adm_no.trim().to_string(),
                fee_head: head.clone(),
                count: slot.hits,
            })
            .collect();
        dups.sort_by(|a, b| a.fee_head.cmp(&b.fee_head));
        dups
    }
}

/// whole-school map of admission -> settled fee heads, for reminder and
/// bulk-payment computation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalPaymentIndex {
    entries: HashMap<String, BTreeSet<String>>,
    hits: HashMap<(String, String), (String, usize)>,
}

impl GlobalPaymentIndex {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut entries: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut hits: HashMap<(String, String), (String, usize)> = HashMap::new();
        for txn in transactions {
            if txn.is_voided() {
                continue;
            }
            let adm = adm_key(&txn.adm_no);
            let head = head_key(&txn.fee_head);
            entries.entry(adm.clone()).or_default().insert(head.clone());
            let slot = hits
                .entry((adm, head))
                .or_insert((txn.adm_no.trim().to_string(), 0));
            slot.1 += 1;
        }
        Self { entries, hits }
    }

    pub fn is_paid(&self, adm_no: &str, fee_head: &str) -> bool {
        self.entries
            .get(&adm_key(adm_no))
            .is_some_and(|heads| heads.contains(&head_key(fee_head)))
    }

    pub fn paid_heads(&self, adm_no: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(&adm_key(adm_no))
    }

    /// every (admission, head) pair backed by more than one effective row
    pub fn duplicates(&self) -> Vec<DuplicateCharge> {
        let mut dups: Vec<DuplicateCharge> = self
            .hits
            .iter()
            .filter(|(_, (_, count))| *count > 1)
            .map(|((_, head), (raw_adm, count))| DuplicateCharge {
                adm_no: raw_adm.clone(),
                fee_head: head.clone(),
                count: *count,
            })
            .collect();
        dups.sort_by(|a, b| (&a.adm_no, &a.fee_head).cmp(&(&b.adm_no, &b.fee_head)));
        dups
    }
}
