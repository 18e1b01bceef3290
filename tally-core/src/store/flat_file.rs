use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::types::{
    Answers, ResponseRecord, Schema, StoreStats, TIMESTAMP_FIELD, is_base_field, prepare_answers,
    timestamp_now,
};

use super::ResponseStore;

/// CSV-backed implementation of `ResponseStore`.
///
/// Appends that keep the column set go to the end of the file. Appends that
/// introduce a column rewrite the whole file through a sibling `.tmp` file
/// and a rename, so a crash leaves either the old or the new file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

/// Parsed contents of the backing file.
#[derive(Debug)]
struct Table {
    header: Vec<String>,
    schema: Schema,
    records: Vec<ResponseRecord>,
    ends_with_newline: bool,
}

impl Table {
    fn empty() -> Self {
        let schema = Schema::new();
        Self {
            header: schema.columns().into_iter().map(str::to_string).collect(),
            schema,
            records: Vec::new(),
            ends_with_newline: true,
        }
    }

    fn parse(location: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| StoreError::corrupt(location, e))?
            .iter()
            .map(str::to_string)
            .collect();
        let schema = Schema::from_columns(&header).map_err(|r| StoreError::corrupt(location, r))?;

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row.map_err(|e| StoreError::corrupt(location, e))?;
            let line = idx + 2;
            if row.len() > header.len() {
                return Err(StoreError::corrupt(
                    location,
                    format!(
                        "row {line} has {} fields, header has {}",
                        row.len(),
                        header.len()
                    ),
                ));
            }

            let mut timestamp = String::new();
            let mut answers = Answers::new();
            for (col, name) in header.iter().enumerate() {
                let value = row.get(col);
                if name == TIMESTAMP_FIELD {
                    timestamp = value.unwrap_or_default().to_string();
                } else if is_base_field(name) {
                    answers.insert(name.clone(), value.unwrap_or_default().to_string());
                } else if let Some(v) = value.filter(|v| !v.is_empty()) {
                    answers.insert(name.clone(), v.to_string());
                }
            }
            if timestamp.is_empty() {
                return Err(StoreError::corrupt(
                    location,
                    format!("row {line} has no timestamp"),
                ));
            }
            records.push(ResponseRecord { timestamp, answers });
        }

        Ok(Self {
            header,
            schema,
            records,
            ends_with_newline: bytes.last() == Some(&b'\n'),
        })
    }
}

fn row_values<'a>(header: &'a [String], record: &'a ResponseRecord) -> impl Iterator<Item = &'a str> {
    header
        .iter()
        .map(move |col| record.get(col).unwrap_or_default())
}

impl CsvStore {
    /// Store backed by the CSV file at `path`. The file is created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    /// `None` when the file does not exist or is empty.
    fn read_table(&self) -> Result<Option<Table>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.location(),
                    source,
                });
            }
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        Table::parse(&self.location(), &bytes).map(Some)
    }

    /// Replace the file with `header` and `records`.
    fn write_all(&self, header: &[String], records: &[ResponseRecord]) -> Result<(), StoreError> {
        let location = self.location();
        let persist = |e: &dyn std::fmt::Display| StoreError::persistence(location.as_str(), e);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| persist(&e))?;
        }

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let result = (|| -> Result<(), StoreError> {
            let file = File::create(&tmp_path).map_err(|e| persist(&e))?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(header).map_err(|e| persist(&e))?;
            for record in records {
                writer
                    .write_record(row_values(header, record))
                    .map_err(|e| persist(&e))?;
            }
            let file = writer.into_inner().map_err(|e| persist(&e))?;
            file.sync_all().map_err(|e| persist(&e))?;
            fs::rename(&tmp_path, &self.path).map_err(|e| persist(&e))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
            return result;
        }
        // The rename is committed; a failed directory sync is not a failed append.
        if let Err(e) = sync_parent(&self.path) {
            warn!(path = %location, error = %e, "Cannot sync directory after rename");
        }
        Ok(())
    }

    /// Add one row to the end of the existing file.
    fn append_row(&self, table: &Table, record: &ResponseRecord) -> Result<(), StoreError> {
        let location = self.location();
        let persist = |e: &dyn std::fmt::Display| StoreError::persistence(location.as_str(), e);

        let mut row = Vec::new();
        if !table.ends_with_newline {
            row.push(b'\n');
        }
        {
            let mut writer = csv::Writer::from_writer(&mut row);
            writer
                .write_record(row_values(&table.header, record))
                .map_err(|e| persist(&e))?;
            writer.flush().map_err(|e| persist(&e))?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| persist(&e))?;
        let original_len = file.metadata().map_err(|e| persist(&e))?.len();
        write_or_truncate(&mut file, original_len, |f| f.write_all(&row)).map_err(|e| persist(&e))
    }
}

/// Run `write` against `file` and sync it. On failure the file is cut back
/// to `original_len`, so a partly written row never becomes readable.
fn write_or_truncate(
    file: &mut File,
    original_len: u64,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let result = write(&mut *file).and_then(|()| file.sync_all());
    if result.is_err() {
        let _ = file.set_len(original_len).and_then(|()| file.sync_all());
    }
    result
}

/// Flush the directory entry of `path`, making a rename into it durable.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl ResponseStore for CsvStore {
    fn backend(&self) -> &'static str {
        "csv"
    }

    fn append(&self, answers: Answers) -> crate::error::Result<ResponseRecord> {
        let answers = prepare_answers(answers)?;
        let existing = self.read_table()?;
        let added = match &existing {
            Some(table) => table.schema.new_columns(&answers)?,
            None => Schema::new().new_columns(&answers)?,
        };

        let record = ResponseRecord {
            timestamp: timestamp_now(),
            answers,
        };

        match existing {
            Some(table) if added.is_empty() => self.append_row(&table, &record)?,
            existing => {
                let mut table = existing.unwrap_or_else(Table::empty);
                if !added.is_empty() {
                    debug!(path = %self.location(), columns = ?added, "Rewriting CSV with new columns");
                }
                table.header.extend(added);
                table.records.push(record.clone());
                self.write_all(&table.header, &table.records)?;
            }
        }

        info!(path = %self.location(), timestamp = %record.timestamp, "Appended response");
        Ok(record)
    }

    fn load_all(&self) -> crate::error::Result<Vec<ResponseRecord>> {
        if let Some(table) = self.read_table()? {
            debug!(path = %self.location(), count = table.records.len(), "Loaded responses");
            return Ok(table.records);
        }
        let table = Table::empty();
        self.write_all(&table.header, &table.records)?;
        info!(path = %self.location(), "Initialized empty CSV response store");
        Ok(Vec::new())
    }

    fn schema(&self) -> crate::error::Result<Schema> {
        Ok(self.read_table()?.map(|t| t.schema).unwrap_or_default())
    }

    fn stats(&self) -> crate::error::Result<StoreStats> {
        let table = self.read_table()?;
        let size_bytes = fs::metadata(&self.path).map_or(0, |m| m.len());
        let (total_records, schema) = table.map_or((0, Schema::new()), |t| {
            (t.records.len() as u64, t.schema)
        });
        Ok(StoreStats {
            backend: self.backend(),
            location: self.location(),
            total_records,
            schema,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TallyError, ValidationError};
    use crate::types::BASE_FIELDS;

    fn answers() -> Answers {
        BASE_FIELDS
            .iter()
            .map(|f| ((*f).to_string(), format!("{f} value")))
            .collect()
    }

    fn store_in(dir: &tempfile::TempDir) -> CsvStore {
        CsvStore::new(dir.path().join("respostas_prep.csv"))
    }

    fn header_line() -> String {
        let mut cols: Vec<&str> = BASE_FIELDS.to_vec();
        cols.push("timestamp");
        cols.join(",")
    }

    #[test]
    fn load_all_initializes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load_all().unwrap().is_empty());

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.trim_end(), header_line());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn append_then_load_returns_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let stored = store.append(answers()).unwrap();
        assert!(!stored.timestamp.is_empty());
        assert_eq!(store.load_all().unwrap(), vec![stored]);
    }

    #[test]
    fn new_column_rewrites_with_empty_cells_for_old_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let a = store.append(answers()).unwrap();

        let mut b_answers = answers();
        b_answers.insert("Comentarios".into(), "ok".into());
        let b = store.append(b_answers).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all, vec![a, b]);
        assert!(!all[0].answers.contains_key("Comentarios"));

        let content = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(",timestamp,Comentarios"));
        assert!(lines[1].ends_with(','), "old row gains an empty cell: {}", lines[1]);
        assert!(lines[2].ends_with(",ok"));
        assert!(!dir.path().join("respostas_prep.csv.tmp").exists());
    }

    #[test]
    fn values_with_separators_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut a = answers();
        a.insert("Metodos_prevencao".into(), "PrEP, Camisinha masculina".into());
        a.insert("Comentarios".into(), "linha 1\nlinha \"2\"".into());
        let stored = store.append(a).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![stored]);
    }

    #[test]
    fn short_rows_read_missing_cells_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let values: Vec<&str> = BASE_FIELDS.iter().map(|_| "x").collect();
        let content = format!(
            "{},Comentarios\n{},2024-01-01 10:00:00\n",
            header_line(),
            values.join(",")
        );
        fs::write(store.path(), content).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].timestamp, "2024-01-01 10:00:00");
        assert_eq!(all[0].get("Comentarios"), None);
        assert_eq!(store.schema().unwrap().extensions(), ["Comentarios"]);
    }

    #[test]
    fn long_row_is_corrupt_and_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let values: Vec<&str> = BASE_FIELDS.iter().map(|_| "x").collect();
        let content = format!(
            "{}\n{},2024-01-01 10:00:00,extra\n",
            header_line(),
            values.join(",")
        );
        fs::write(store.path(), &content).unwrap();

        assert!(store.load_all().unwrap_err().is_corrupt_store());
        assert!(store.append(answers()).unwrap_err().is_corrupt_store());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), content);
    }

    #[test]
    fn header_without_base_fields_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "name,age\nana,30\n").unwrap();
        let err = store.load_all().unwrap_err();
        assert!(err.is_corrupt_store());
        assert!(err.to_string().contains("missing column"));
    }

    #[test]
    fn empty_timestamp_and_bad_utf8_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let values: Vec<&str> = BASE_FIELDS.iter().map(|_| "x").collect();
        fs::write(
            store.path(),
            format!("{}\n{},\n", header_line(), values.join(",")),
        )
        .unwrap();
        assert!(store.load_all().unwrap_err().is_corrupt_store());

        let mut bytes = format!("{}\n", header_line()).into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe, b',', b'\n']);
        fs::write(store.path(), bytes).unwrap();
        assert!(store.load_all().unwrap_err().is_corrupt_store());
    }

    #[test]
    fn zero_byte_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "").unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert!(fs::read_to_string(store.path()).unwrap().starts_with("Conhecimento_PrEP"));
    }

    #[test]
    fn append_repairs_missing_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let values: Vec<&str> = BASE_FIELDS.iter().map(|_| "x").collect();
        fs::write(
            store.path(),
            format!("{}\n{},2024-01-01 10:00:00", header_line(), values.join(",")),
        )
        .unwrap();

        let stored = store.append(answers()).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], stored);
    }

    #[test]
    fn existing_column_order_is_preserved_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut cols: Vec<&str> = vec!["timestamp"];
        cols.extend(BASE_FIELDS.iter().rev());
        fs::write(store.path(), format!("{}\n", cols.join(","))).unwrap();

        let stored = store.append(answers()).unwrap();
        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("timestamp,Regiao,"));
        assert_eq!(store.load_all().unwrap(), vec![stored]);
    }

    #[test]
    fn validation_failure_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append(answers()).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let mut bad = answers();
        bad.remove("Renda");
        assert!(matches!(
            store.append(bad),
            Err(TallyError::Validation(ValidationError::MissingField(_)))
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn unwritable_location_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file").unwrap();
        let store = CsvStore::new(blocker.join("respostas.csv"));

        assert!(matches!(store.append(answers()), Err(TallyError::Store(_))));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "file");
    }

    #[test]
    fn interrupted_append_is_cut_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append(answers()).unwrap();
        let before = fs::read(store.path()).unwrap();

        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        let len = file.metadata().unwrap().len();
        let err = write_or_truncate(&mut file, len, |f| {
            f.write_all(b"half,a,row")?;
            Err(io::Error::other("No space left on device"))
        })
        .unwrap_err();
        drop(file);

        assert_eq!(err.to_string(), "No space left on device");
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(store.load_all().unwrap().len(), 1);

        store.append(answers()).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn completed_append_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "a\n").unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write_or_truncate(&mut file, 2, |f| f.write_all(b"b\n")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn parent_directory_sync() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sync_parent(&dir.path().join("respostas_prep.csv")).is_ok());
        assert!(sync_parent(Path::new("respostas_prep.csv")).is_ok());
    }

    #[test]
    fn stats_reports_count_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.stats().unwrap().total_records, 0);
        store.append(answers()).unwrap();
        store.append(answers()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.backend, "csv");
        assert_eq!(stats.total_records, 2);
        assert!(stats.size_bytes > 0);
        assert_eq!(stats.schema.version(), 1);
    }
}
