use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{
    Answers, ROW_ID_FIELD, ResponseRecord, Schema, StoreStats, TIMESTAMP_FIELD, is_base_field,
    prepare_answers, timestamp_now,
};

use super::ResponseStore;
use super::schema::{self, quote_ident};

const IN_MEMORY: &str = ":memory:";

/// SQLite-backed implementation of `ResponseStore`.
///
/// Each append runs in its own transaction, so a failed write leaves no
/// partial row and no half-added column behind.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let location = path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::persistence(location.as_str(), e))?;
        }
        let conn = Connection::open(path).map_err(|e| write_error(&location, e))?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        info!(path = %location, "Opened SQLite response store");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| write_error(IN_MEMORY, e))?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn location(&self) -> String {
        self.db_path
            .as_ref()
            .map_or_else(|| IN_MEMORY.to_string(), |p| p.display().to_string())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::persistence(self.location(), "connection mutex poisoned"))
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let location = self.location();
        let conn = self.lock()?;

        // Reading the catalog first surfaces "file is not a database" as corruption.
        let has_responses = table_exists(&conn, "responses").map_err(|e| read_error(&location, e))?;
        let has_meta = table_exists(&conn, "tally_meta").map_err(|e| read_error(&location, e))?;

        if has_meta {
            let version: Option<String> = conn
                .query_row(
                    "SELECT value FROM tally_meta WHERE key = 'schema_version'",
                    [],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| read_error(&location, e))?;
            if let Some(v) = version.filter(|v| v != schema::SCHEMA_VERSION) {
                return Err(StoreError::corrupt(
                    location,
                    format!("unsupported schema_version {v:?}"),
                )
                .into());
            }
        }
        if has_responses {
            Self::load_schema(&conn, &location)?;
        }

        conn.execute_batch(schema::PRAGMAS_SQL)
            .map_err(|e| write_error(&location, e))?;
        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(|e| write_error(&location, e))?;
        conn.execute(
            "INSERT OR IGNORE INTO tally_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(|e| write_error(&location, e))?;

        if !has_responses {
            info!(path = %location, "Initialized empty response table");
        }
        Ok(())
    }

    /// Data columns of `responses` in table order, excluding the row id.
    fn data_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare("PRAGMA table_info(responses)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names.into_iter().filter(|n| n != ROW_ID_FIELD).collect())
    }

    fn load_schema(conn: &Connection, location: &str) -> Result<(Schema, Vec<String>), StoreError> {
        let columns = Self::data_columns(conn).map_err(|e| read_error(location, e))?;
        let schema = Schema::from_columns(&columns).map_err(|r| StoreError::corrupt(location, r))?;
        Ok((schema, columns))
    }

    fn row_to_record(
        row: &rusqlite::Row<'_>,
        columns: &[String],
        location: &str,
    ) -> Result<ResponseRecord, StoreError> {
        let mut answers = Answers::new();
        let mut timestamp = String::new();
        for (idx, name) in columns.iter().enumerate() {
            let value: Option<String> = row.get(idx).map_err(|e| read_error(location, e))?;
            match value {
                Some(v) if name == TIMESTAMP_FIELD => timestamp = v,
                Some(v) => {
                    answers.insert(name.clone(), v);
                }
                None if is_base_field(name) || name == TIMESTAMP_FIELD => {
                    return Err(StoreError::corrupt(location, format!("NULL in column {name}")));
                }
                None => {}
            }
        }
        if timestamp.is_empty() {
            return Err(StoreError::corrupt(location, "record without timestamp"));
        }
        Ok(ResponseRecord { timestamp, answers })
    }
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}

fn is_corruption(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            matches!(e.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
        }
        rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => {
            true
        }
        _ => false,
    }
}

fn read_error(location: &str, err: rusqlite::Error) -> StoreError {
    if is_corruption(&err) {
        StoreError::corrupt(location, err)
    } else {
        StoreError::Sqlite {
            path: location.to_string(),
            source: err,
        }
    }
}

fn write_error(location: &str, err: rusqlite::Error) -> StoreError {
    if is_corruption(&err) {
        StoreError::corrupt(location, err)
    } else {
        StoreError::persistence(location, err)
    }
}

impl ResponseStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn append(&self, answers: Answers) -> crate::error::Result<ResponseRecord> {
        let answers = prepare_answers(answers)?;
        let location = self.location();
        let mut conn = self.lock()?;

        let (schema, _) = Self::load_schema(&conn, &location)?;
        let added = schema.new_columns(&answers)?;
        let timestamp = timestamp_now();

        let tx = conn.transaction().map_err(|e| write_error(&location, e))?;
        for col in &added {
            tx.execute(
                &format!("ALTER TABLE responses ADD COLUMN {} TEXT", quote_ident(col)),
                [],
            )
            .map_err(|e| write_error(&location, e))?;
        }

        let columns: Vec<String> = answers
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(TIMESTAMP_FIELD))
            .map(quote_ident)
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO responses ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let values = answers
            .values()
            .map(String::as_str)
            .chain(std::iter::once(timestamp.as_str()));
        tx.execute(&sql, params_from_iter(values))
            .map_err(|e| write_error(&location, e))?;
        tx.commit().map_err(|e| write_error(&location, e))?;

        if !added.is_empty() {
            debug!(path = %location, columns = ?added, "Added extension columns");
        }
        info!(path = %location, %timestamp, "Appended response");
        Ok(ResponseRecord { timestamp, answers })
    }

    fn load_all(&self) -> crate::error::Result<Vec<ResponseRecord>> {
        let location = self.location();
        let conn = self.lock()?;
        let (_, columns) = Self::load_schema(&conn, &location)?;

        let select: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!("SELECT {} FROM responses ORDER BY id", select.join(", "));
        let mut stmt = conn.prepare(&sql).map_err(|e| read_error(&location, e))?;
        let mut rows = stmt.query([]).map_err(|e| read_error(&location, e))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| read_error(&location, e))? {
            records.push(Self::row_to_record(row, &columns, &location)?);
        }
        debug!(path = %location, count = records.len(), "Loaded responses");
        Ok(records)
    }

    fn schema(&self) -> crate::error::Result<Schema> {
        let location = self.location();
        let conn = self.lock()?;
        Ok(Self::load_schema(&conn, &location)?.0)
    }

    fn stats(&self) -> crate::error::Result<StoreStats> {
        let location = self.location();
        let conn = self.lock()?;
        let (schema, _) = Self::load_schema(&conn, &location)?;
        let total_records: i64 = conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))
            .map_err(|e| read_error(&location, e))?;
        let total_records = u64::try_from(total_records).unwrap_or_default();

        let size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            backend: self.backend(),
            location,
            total_records,
            schema,
            size_bytes,
        })
    }
}
