use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ── Field catalog ──────────────────────────────────────────────────

/// Column holding the store-assigned creation instant.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// `chrono` format of [`ResponseRecord::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Row identifier column used by the `SQLite` backend.
pub const ROW_ID_FIELD: &str = "id";

/// The 14 answer fields every record must supply, in column order.
pub const BASE_FIELDS: [&str; 14] = [
    "Conhecimento_PrEP",
    "Conhecimento_PEP",
    "Acesso_servicos",
    "Fonte_informacao",
    "Uso_PrepPEP",
    "Conhece_usuarios",
    "Teste_HIV_frequencia",
    "Metodos_prevencao",
    "Genero",
    "Orientacao_sexual",
    "Raca",
    "Faixa_etaria",
    "Renda",
    "Regiao",
];

/// Optional fields collected by the longer form variant.
pub const DECLARED_EXTENSIONS: [&str; 3] = ["Verificacao_PrEP", "Verificacao_PEP", "Comentarios"];

/// Separator used when a multi-select answer is flattened into one string.
pub const MULTI_VALUE_SEPARATOR: &str = ", ";

/// Version of the base layout. Each extension column bumps the effective version.
pub const BASE_SCHEMA_VERSION: u32 = 1;

const MAX_FIELD_NAME_LEN: usize = 64;

pub fn is_base_field(name: &str) -> bool {
    BASE_FIELDS.contains(&name)
}

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

// ── Records ────────────────────────────────────────────────────────

/// Flat field → answer mapping supplied by the form.
pub type Answers = BTreeMap<String, String>;

/// One submitted questionnaire instance, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub timestamp: String,
    #[serde(flatten)]
    pub answers: Answers,
}

impl ResponseRecord {
    /// Look up any column, including `timestamp`. Absent extensions yield `None`.
    pub fn get(&self, field: &str) -> Option<&str> {
        if field == TIMESTAMP_FIELD {
            Some(self.timestamp.as_str())
        } else {
            self.answers.get(field).map(String::as_str)
        }
    }

    /// Answers outside the base schema.
    pub fn extensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.answers
            .iter()
            .filter(|(k, _)| !is_base_field(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Check a submission and normalize it for storage.
///
/// Every base field must be present. `timestamp` and `id` are assigned by the
/// store. Extension names must be identifiers that cannot collide with a base
/// column once case is folded. Empty extension values are dropped.
pub fn prepare_answers(mut answers: Answers) -> Result<Answers, ValidationError> {
    for field in BASE_FIELDS {
        if !answers.contains_key(field) {
            return Err(ValidationError::MissingField(field.to_string()));
        }
    }

    let mut folded: HashSet<String> = HashSet::with_capacity(answers.len());
    for name in answers.keys() {
        let lower = name.to_ascii_lowercase();
        if lower == TIMESTAMP_FIELD || lower == ROW_ID_FIELD {
            return Err(ValidationError::ReservedField(name.clone()));
        }
        if !is_valid_field_name(name) || !folded.insert(lower) {
            return Err(ValidationError::InvalidFieldName(name.clone()));
        }
    }

    answers.retain(|k, v| is_base_field(k) || !v.is_empty());
    Ok(answers)
}

/// ASCII identifier: letters, digits, `_`, not starting with a digit.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_FIELD_NAME_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Schema ─────────────────────────────────────────────────────────

/// Column layout of a store: base fields, `timestamp`, then extensions in
/// order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    extensions: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from the column names of an existing backing store.
    ///
    /// Order of the base columns is not significant. Returns a description of
    /// the problem when a required column is missing or a name repeats.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Result<Self, String> {
        let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
        let mut extensions = Vec::new();
        for col in columns {
            let col = col.as_ref();
            if !seen.insert(col.to_ascii_lowercase()) {
                return Err(format!("duplicate column {col:?}"));
            }
            if col != TIMESTAMP_FIELD && !is_base_field(col) {
                extensions.push(col.to_string());
            }
        }
        if !columns.iter().any(|c| c.as_ref() == TIMESTAMP_FIELD) {
            return Err(format!("missing column {TIMESTAMP_FIELD:?}"));
        }
        if let Some(missing) = BASE_FIELDS
            .iter()
            .find(|f| !columns.iter().any(|c| c.as_ref() == **f))
        {
            return Err(format!("missing column {missing:?}"));
        }
        Ok(Self { extensions })
    }

    /// `BASE_SCHEMA_VERSION` plus one per extension column.
    pub fn version(&self) -> u32 {
        BASE_SCHEMA_VERSION.saturating_add(u32::try_from(self.extensions.len()).unwrap_or(u32::MAX))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// All columns in canonical order.
    pub fn columns(&self) -> Vec<&str> {
        BASE_FIELDS
            .iter()
            .copied()
            .chain(std::iter::once(TIMESTAMP_FIELD))
            .chain(self.extensions.iter().map(String::as_str))
            .collect()
    }

    /// Extension columns `answers` would add, in the record's key order.
    ///
    /// A name matching an existing extension only after case folding is
    /// rejected, since the `SQLite` backend treats column names
    /// case-insensitively.
    pub fn new_columns(&self, answers: &Answers) -> Result<Vec<String>, ValidationError> {
        let mut added = Vec::new();
        for name in answers.keys().filter(|k| !is_base_field(k)) {
            if self.extensions.iter().any(|e| e == name) {
                continue;
            }
            if self.extensions.iter().any(|e| e.eq_ignore_ascii_case(name)) {
                return Err(ValidationError::InvalidFieldName(name.clone()));
            }
            added.push(name.clone());
        }
        Ok(added)
    }

    pub fn extend(&mut self, columns: impl IntoIterator<Item = String>) {
        for col in columns {
            if !self.extensions.contains(&col) {
                self.extensions.push(col);
            }
        }
    }
}

// ── Stats ──────────────────────────────────────────────────────────

/// Summary of a store's contents.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub backend: &'static str,
    pub location: String,
    pub total_records: u64,
    pub schema: Schema,
    pub size_bytes: u64,
}
