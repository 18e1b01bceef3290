// Integration test utilities and fixtures for Tally.

use std::path::{Path, PathBuf};

use tally_core::config::{StorageBackend, StorageSection, TallyConfig};
use tally_core::questionnaire::{AnswerKind, join_multi, questions};
use tally_core::session::SurveySession;
use tally_core::store::{ResponseStore, open_store};
use tally_core::types::Answers;

/// Both storage backends, for tests that must behave identically on each.
pub const BACKENDS: [StorageBackend; 2] = [StorageBackend::Csv, StorageBackend::Sqlite];

/// A complete, valid set of base answers. Different `variant`s pick
/// different labels, so records can be told apart.
pub fn sample_answers(variant: usize) -> Answers {
    questions()
        .iter()
        .filter(|q| q.required)
        .map(|q| {
            let pick = |offset: usize| q.options[(variant + offset) % q.options.len()];
            let value = match q.kind {
                AnswerKind::Multi if variant % 2 == 1 => join_multi(&[pick(0), pick(1)]),
                AnswerKind::Text => format!("resposta {variant}"),
                _ => pick(0).to_string(),
            };
            (q.field.to_string(), value)
        })
        .collect()
}

/// [`sample_answers`] plus extra fields.
pub fn answers_with(variant: usize, extra: &[(&str, &str)]) -> Answers {
    let mut answers = sample_answers(variant);
    for (field, value) in extra {
        answers.insert((*field).to_string(), (*value).to_string());
    }
    answers
}

/// Answers from a JSON object of string values.
pub fn answers_from_json(value: &serde_json::Value) -> anyhow::Result<Answers> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("expected a JSON object"))?;
    object
        .iter()
        .map(|(k, v)| {
            let s = v
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("{k}: expected a string"))?;
            Ok((k.clone(), s.to_string()))
        })
        .collect()
}

/// A store location in a temporary directory. Every [`TestStore::open`]
/// builds a fresh handle, which is how tests simulate a restart.
#[derive(Debug)]
pub struct TestStore {
    pub dir: tempfile::TempDir,
    pub backend: StorageBackend,
}

impl TestStore {
    pub fn new(backend: StorageBackend) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        Self { dir, backend }
    }

    pub fn csv() -> Self {
        Self::new(StorageBackend::Csv)
    }

    pub fn sqlite() -> Self {
        Self::new(StorageBackend::Sqlite)
    }

    /// Path of the backing file or database.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join(self.backend.default_path())
    }

    pub fn storage(&self) -> StorageSection {
        StorageSection {
            backend: self.backend,
            path: Some(self.path()),
        }
    }

    pub fn open(&self) -> Box<dyn ResponseStore> {
        open_store(&self.storage()).expect("open store")
    }

    pub fn session(&self) -> SurveySession {
        SurveySession::new(self.open())
    }

    /// Write a `tally.toml` pointing at this store and return its path.
    pub fn write_config(&self) -> anyhow::Result<PathBuf> {
        let config = TallyConfig {
            storage: StorageSection {
                backend: self.backend,
                path: Some(PathBuf::from(self.backend.default_path())),
            },
            ..TallyConfig::default()
        };
        let path = self.dir.path().join("tally.toml");
        std::fs::write(&path, config.to_toml_string()?)?;
        Ok(path)
    }

    /// Replace the backing data with bytes no backend can parse.
    pub fn corrupt(&self) -> anyhow::Result<()> {
        write_garbage(&self.path())
    }
}

fn write_garbage(path: &Path) -> anyhow::Result<()> {
    let garbage = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "not,a,survey\n1,2,3,4,5\n",
        _ => "this is not a database file, just text",
    };
    std::fs::write(path, garbage)?;
    Ok(())
}
