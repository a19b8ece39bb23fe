//! ledger capability
//!
//! the contract-backed store of person records, reachable through exactly
//! three operations: count, read by index, submit. indices are 1-based and
//! follow ledger insertion order.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::LedgerError;

/// one person record, immutable once fetched
///
/// identified only by its position in the ledger; duplicate names between
/// records are legal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub first_name: String,
    pub last_name: String,
}

impl PersonRecord {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// acknowledgment returned by a successful submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub tx_hash: String,
}

/// snapshot of the full roster, replaced wholesale by each successful fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// records in ascending ledger order
    pub records: Vec<PersonRecord>,
    /// total count reported by the ledger
    pub total: u64,
}

/// ledger capability trait
///
/// every call may reject (rpc failure, revert, cancelled signing); callers
/// treat each operation as fallible and atomic.
pub trait RosterLedger: Send + Sync {
    /// number of records on the ledger
    fn record_count(&self) -> impl std::future::Future<Output = Result<u64, LedgerError>> + Send;

    /// read the record at a 1-based index
    fn record_at(
        &self,
        index: u64,
    ) -> impl std::future::Future<Output = Result<PersonRecord, LedgerError>> + Send;

    /// append a new record; resolves once the write is accepted
    fn submit_record(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> impl std::future::Future<Output = Result<SubmitReceipt, LedgerError>> + Send;
}

/// mock ledger for testing/development
///
/// in real deployments this is the contract binding (abi call per
/// operation); the mock keeps records in memory, journals every access so
/// tests can assert call order, and exposes failure knobs for each path.
pub struct MockLedger {
    records: Mutex<Vec<PersonRecord>>,
    fail_count: bool,
    fail_read_at: Mutex<Option<u64>>,
    reject_submit: bool,
    read_gate: Option<Arc<Semaphore>>,
    read_log: Mutex<Vec<u64>>,
    submitted: Mutex<Vec<PersonRecord>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_count: false,
            fail_read_at: Mutex::new(None),
            reject_submit: false,
            read_gate: None,
            read_log: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// seed the ledger with records
    pub fn with_records<I>(self, records: I) -> Self
    where
        I: IntoIterator<Item = PersonRecord>,
    {
        *self.records.lock().unwrap() = records.into_iter().collect();
        self
    }

    /// make the count query fail
    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    /// make the read at the given index fail
    pub fn failing_read_at(self, index: u64) -> Self {
        *self.fail_read_at.lock().unwrap() = Some(index);
        self
    }

    /// flip the failing read index after construction
    pub fn set_fail_read_at(&self, index: Option<u64>) {
        *self.fail_read_at.lock().unwrap() = index;
    }

    /// make submissions fail as a user rejection
    pub fn rejecting_submit(mut self) -> Self {
        self.reject_submit = true;
        self
    }

    /// park reads until permits are added, so tests can interleave
    /// notifications with an in-flight fetch
    pub fn holding_reads(mut self, gate: Arc<Semaphore>) -> Self {
        self.read_gate = Some(gate);
        self
    }

    /// append a record directly, bypassing submit (test seeding)
    pub fn push_record(&self, record: PersonRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// indices requested via record_at, in call order
    pub fn read_log(&self) -> Vec<u64> {
        self.read_log.lock().unwrap().clone()
    }

    /// records accepted via submit_record, in call order
    pub fn submitted(&self) -> Vec<PersonRecord> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterLedger for MockLedger {
    async fn record_count(&self) -> Result<u64, LedgerError> {
        if self.fail_count {
            return Err(LedgerError::Read("count query failed".into()));
        }
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn record_at(&self, index: u64) -> Result<PersonRecord, LedgerError> {
        if let Some(gate) = &self.read_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| LedgerError::Read("read gate closed".into()))?;
        }
        self.read_log.lock().unwrap().push(index);
        if *self.fail_read_at.lock().unwrap() == Some(index) {
            return Err(LedgerError::Read(format!("read failed at index {}", index)));
        }
        let records = self.records.lock().unwrap();
        index
            .checked_sub(1)
            .and_then(|i| records.get(i as usize))
            .cloned()
            .ok_or_else(|| LedgerError::Read(format!("index {} out of range", index)))
    }

    async fn submit_record(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<SubmitReceipt, LedgerError> {
        if self.reject_submit {
            return Err(LedgerError::Rejected);
        }
        let record = PersonRecord::new(first_name, last_name);
        self.records.lock().unwrap().push(record.clone());
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(record);
        Ok(SubmitReceipt {
            tx_hash: format!("0x{:064x}", submitted.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_are_one_based() {
        let ledger = MockLedger::new().with_records([
            PersonRecord::new("Al", "Lee"),
            PersonRecord::new("Bo", "Ng"),
        ]);

        assert_eq!(ledger.record_count().await.unwrap(), 2);
        assert_eq!(ledger.record_at(1).await.unwrap().full_name(), "Al Lee");
        assert_eq!(ledger.record_at(2).await.unwrap().first_name, "Bo");
        assert!(ledger.record_at(0).await.is_err());
        assert!(ledger.record_at(3).await.is_err());
        assert_eq!(ledger.read_log(), vec![1, 2, 0, 3]);
    }

    #[tokio::test]
    async fn submit_appends_and_acknowledges() {
        let ledger = MockLedger::new();
        let receipt = ledger.submit_record("Ada", "Byron").await.unwrap();
        assert!(receipt.tx_hash.starts_with("0x"));
        assert_eq!(ledger.record_count().await.unwrap(), 1);
        assert_eq!(ledger.submitted(), vec![PersonRecord::new("Ada", "Byron")]);
    }

    #[tokio::test]
    async fn failure_knobs() {
        let ledger = MockLedger::new()
            .with_records([PersonRecord::new("Al", "Lee")])
            .failing_read_at(1);
        assert!(ledger.record_at(1).await.is_err());

        ledger.set_fail_read_at(None);
        assert!(ledger.record_at(1).await.is_ok());

        let rejecting = MockLedger::new().rejecting_submit();
        assert_eq!(
            rejecting.submit_record("Ada", "Byron").await.unwrap_err(),
            LedgerError::Rejected
        );
        assert!(rejecting.submitted().is_empty());
    }
}
