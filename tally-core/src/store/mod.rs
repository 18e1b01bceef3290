//! Response store: durable, append-only record of submitted answers.
//!
//! Two interchangeable backends implement [`ResponseStore`]: a CSV flat file
//! ([`flat_file::CsvStore`]) and an embedded `SQLite` database
//! ([`sqlite::SqliteStore`]). There is no migration between them.

pub mod flat_file;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use traits::ResponseStore;

use crate::config::{StorageBackend, StorageSection};

/// Open the store described by the `[storage]` config section.
pub fn open_store(storage: &StorageSection) -> crate::error::Result<Box<dyn ResponseStore>> {
    let path = storage.path();
    tracing::debug!(backend = storage.backend.as_str(), path = %path.display(), "Opening response store");
    let store: Box<dyn ResponseStore> = match storage.backend {
        StorageBackend::Csv => Box::new(flat_file::CsvStore::new(path)),
        StorageBackend::Sqlite => Box::new(sqlite::SqliteStore::open(&path)?),
    };
    Ok(store)
}
