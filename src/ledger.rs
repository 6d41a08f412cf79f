//! Session-wide datasets: students, fee schedule and transaction history,
//! loaded once at session start and refreshed after mutations. Derived
//! state (the global payment index) is memoized and recomputed only when
//! the transaction list changes.

use futures::try_join;
use tracing::{debug, warn};

use crate::decimal::Money;
use crate::errors::Result;
use crate::gateway::SheetGateway;
use crate::index::{GlobalPaymentIndex, PaymentIndex};
use crate::model::{FeeHeadDefinition, Student, Transaction};
use crate::types::{adm_key, class_key, same_class};

/// most suggestions the payment screen will show for one query
const SUGGESTION_LIMIT: usize = 12;

#[derive(Debug, Default)]
pub struct FeeLedger {
    students: Vec<Student>,
    fee_heads: Vec<FeeHeadDefinition>,
    transactions: Vec<Transaction>,
    global_index: Option<GlobalPaymentIndex>,
}

impl FeeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// initial load: all three datasets fetched concurrently, raw wire rows
    /// mapped onto the canonical model at the boundary
    pub async fn load<G: SheetGateway>(&mut self, gateway: &G) -> Result<()> {
        let (students, fee_heads, transactions) = try_join!(
            gateway.list_students(),
            gateway.list_fee_heads(),
            gateway.list_transactions(),
        )?;
        self.students = students.into_iter().map(Student::from).collect();
        self.fee_heads = fee_heads.into_iter().map(FeeHeadDefinition::from).collect();
        self.transactions = transactions.into_iter().map(Transaction::from).collect();
        self.global_index = None;
        debug!(
            students = self.students.len(),
            fee_heads = self.fee_heads.len(),
            transactions = self.transactions.len(),
            "session data loaded"
        );
        Ok(())
    }

    /// re-fetch the transaction history after a mutation
    pub async fn refresh_transactions<G: SheetGateway>(&mut self, gateway: &G) -> Result<()> {
        let transactions = gateway.list_transactions().await?;
        self.transactions = transactions.into_iter().map(Transaction::from).collect();
        self.global_index = None;
        Ok(())
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn fee_heads(&self) -> &[FeeHeadDefinition] {
        &self.fee_heads
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// direct access for local mutation; drops the memoized index
    pub fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        self.global_index = None;
        &mut self.transactions
    }

    /// memoized school-wide paid index
    pub fn global_index(&mut self) -> &GlobalPaymentIndex {
        let transactions = &self.transactions;
        self.global_index
            .get_or_insert_with(|| GlobalPaymentIndex::build(transactions))
    }

    /// fresh per-student paid index
    pub fn student_index(&self, adm_no: &str) -> PaymentIndex {
        PaymentIndex::build(&self.transactions, adm_no)
    }

    pub fn find_student(&self, adm_no: &str) -> Option<&Student> {
        let key = adm_key(adm_no);
        self.students.iter().find(|s| adm_key(&s.adm_no) == key)
    }

    /// payment-screen lookahead: admission substring or name prefix,
    /// optionally restricted to one class, capped
    pub fn suggest_students(&self, query: &str, scope_class: Option<&str>) -> Vec<&Student> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        self.students
            .iter()
            .filter(|s| match scope_class {
                Some(class) => same_class(&s.class, class),
                None => true,
            })
            .filter(|s| {
                s.adm_no.to_lowercase().contains(&q) || s.name.to_lowercase().starts_with(&q)
            })
            .take(SUGGESTION_LIMIT)
            .collect()
    }

    /// transaction-screen free text search over admission, name, class,
    /// fee head and receipt number
    pub fn search_transactions(&self, query: &str) -> Vec<&Transaction> {
        let q = query.trim().to_lowercase();
        self.transactions
            .iter()
            .filter(|t| {
                q.is_empty()
                    || t.adm_no.to_lowercase().contains(&q)
                    || t.name.to_lowercase().contains(&q)
                    || t.class.to_lowercase().contains(&q)
                    || t.fee_head.to_lowercase().contains(&q)
                    || t.receipt_no.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// running collected total: every effective row's amount plus fine
    pub fn total_collected(&self) -> Money {
        self.transactions
            .iter()
            .filter(|t| !t.is_voided())
            .map(Transaction::total)
            .sum()
    }

    /// distinct class labels across the student roll, sorted
    pub fn classes(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeMap::new();
        for s in &self.students {
            if !s.class.is_empty() {
                seen.entry(class_key(&s.class)).or_insert(s.class.clone());
            }
        }
        let mut classes: Vec<String> = seen.into_values().collect();
        classes.sort();
        classes
    }

    /// distinct payment modes seen in the history, sorted
    pub fn modes(&self) -> Vec<String> {
        let mut modes: Vec<String> = self
            .transactions
            .iter()
            .map(|t| t.mode.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        modes.sort();
        modes.dedup();
        modes
    }

    /// void every row of a receipt. The primary call's error is surfaced
    /// verbatim; the local rows are flipped right away so totals stay
    /// consistent even when the follow-up reload fails (that failure is
    /// only logged).
    pub async fn void_receipt<G: SheetGateway>(
        &mut self,
        gateway: &G,
        receipt_no: &str,
    ) -> Result<()> {
        gateway.void_receipt(receipt_no).await?;
        self.set_local_void_flag(receipt_no, "Y");
        if let Err(err) = self.refresh_transactions(gateway).await {
            warn!(%receipt_no, error = %err, "transaction reload after void failed");
        }
        Ok(())
    }

    /// restore a voided receipt; same contract as [`Self::void_receipt`]
    pub async fn unvoid_receipt<G: SheetGateway>(
        &mut self,
        gateway: &G,
        receipt_no: &str,
    ) -> Result<()> {
        gateway.unvoid_receipt(receipt_no).await?;
        self.set_local_void_flag(receipt_no, "");
        if let Err(err) = self.refresh_transactions(gateway).await {
            warn!(%receipt_no, error = %err, "transaction reload after unvoid failed");
        }
        Ok(())
    }

    fn set_local_void_flag(&mut self, receipt_no: &str, flag: &str) {
        self.global_index = None;
        for txn in &mut self.transactions {
            if txn.receipt_no == receipt_no {
                txn.void = flag.to_string();
            }
        }
    }
}
