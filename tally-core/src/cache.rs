//! In-memory mirror of the response store for one session.

use tracing::debug;

use crate::store::ResponseStore;
use crate::types::ResponseRecord;

/// Append-only view of durably stored records.
///
/// Grows only through [`SessionCache::record_added`], which callers invoke
/// after the store confirmed the write; the cache never holds a record the
/// store does not.
#[derive(Debug, Default)]
pub struct SessionCache {
    records: Vec<ResponseRecord>,
}

impl SessionCache {
    /// Initialize from every record currently in `store`.
    pub fn load(store: &dyn ResponseStore) -> crate::error::Result<Self> {
        let records = store.load_all()?;
        debug!(count = records.len(), backend = store.backend(), "Session cache loaded");
        Ok(Self { records })
    }

    /// Mirror a record the store has durably persisted.
    pub fn record_added(&mut self, record: ResponseRecord) {
        self.records.push(record);
    }

    /// Read-only snapshot in insertion order.
    pub fn current_view(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
