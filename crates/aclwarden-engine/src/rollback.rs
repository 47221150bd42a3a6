//! Rollback records and their replay.
//!
//! Live enforcement hands a [`RollbackRecord`] to a [`RollbackSink`]
//! before each write. Replaying the records newest-first with [`restore`]
//! returns every touched node to the entries it held before the run, even
//! when the same node was written more than once.

use aclwarden_core::acl::Entry;
use aclwarden_core::client::{TreeClient, Version};
use aclwarden_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A node's entries captured before a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Node path
    pub path: String,
    /// Entries before the write
    pub entries: Vec<Entry>,
}

impl RollbackRecord {
    /// Capture `entries` for `path`.
    pub fn new(path: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            path: path.into(),
            entries,
        }
    }
}

/// Durable destination for rollback records.
///
/// `record` must not return until the record is stored; enforcement only
/// writes a node after its record was accepted.
pub trait RollbackSink {
    /// Store one record.
    fn record(&mut self, record: RollbackRecord) -> Result<()>;
}

impl RollbackSink for Vec<RollbackRecord> {
    fn record(&mut self, record: RollbackRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

/// What a restore did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Writes performed
    pub restored: usize,
    /// Paths that no longer exist and were left alone
    pub missing: Vec<String>,
}

/// Write `records` back, newest first.
///
/// Nodes deleted since the records were taken are listed in
/// [`RestoreSummary::missing`]; any other write failure aborts.
pub fn restore<C: TreeClient + ?Sized>(
    client: &C,
    records: &[RollbackRecord],
) -> Result<RestoreSummary> {
    let mut summary = RestoreSummary::default();
    for record in records.iter().rev() {
        match client.set_entries(&record.path, &record.entries, Version::Any) {
            Ok(()) => {
                log::info!("Restored {}", record.path);
                summary.restored += 1;
            }
            Err(Error::NotFound { .. }) => {
                log::warn!("Cannot restore {}: node no longer exists", record.path);
                summary.missing.push(record.path.clone());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}
