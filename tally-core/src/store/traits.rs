use crate::types::{Answers, ResponseRecord, Schema, StoreStats};

/// The response store abstraction. Forms write and analyses read through
/// this trait; the CSV and `SQLite` backends are interchangeable.
///
/// Stores assume a single writer process per backing location. Appends from
/// several processes against the same CSV file can interleave and lose rows.
pub trait ResponseStore: Send + Sync + std::fmt::Debug {
    /// Short backend name (`csv`, `sqlite`).
    fn backend(&self) -> &'static str;

    /// Validate `answers`, stamp them and persist the record durably.
    ///
    /// Returns the record exactly as stored, only after the write completed.
    /// Validation failures are reported before any I/O happens.
    fn append(&self, answers: Answers) -> crate::error::Result<ResponseRecord>;

    /// Every stored record in insertion order. Creates an empty store when
    /// none exists yet.
    fn load_all(&self) -> crate::error::Result<Vec<ResponseRecord>>;

    /// Current column layout.
    fn schema(&self) -> crate::error::Result<Schema>;

    /// Get summary statistics about the store.
    fn stats(&self) -> crate::error::Result<StoreStats>;
}
