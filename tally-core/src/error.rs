/// Top-level Tally error type.
///
/// All fallible operations in `tally-core` return [`Result<T, TallyError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum TallyError {
    /// Error from the response store (CSV file or `SQLite` database).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A submitted record was rejected before any write was attempted.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error during analysis of cached responses.
    #[error("Analysis error: {0}")]
    Analyze(#[from] AnalyzeError),
}

impl TallyError {
    /// Whether this error reports unreadable existing data.
    pub fn is_corrupt_store(&self) -> bool {
        matches!(self, Self::Store(StoreError::Corrupt { .. }))
    }
}

/// Errors from the response store backends.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A write could not be durably completed. Nothing was committed.
    #[error("Persistence failed for {path}: {reason}")]
    Persistence {
        /// Backing file or database path.
        path: String,
        /// Description of the failed operation.
        reason: String,
    },

    /// Existing backing data is present but cannot be parsed.
    #[error("Corrupt store at {path}: {reason}")]
    Corrupt {
        /// Backing file or database path.
        path: String,
        /// What made the data unreadable.
        reason: String,
    },

    /// `SQLite` read failure that is neither corruption nor a failed write.
    #[error("SQLite error on {path}: {source}")]
    Sqlite {
        /// Database path.
        path: String,
        /// Underlying `SQLite` error.
        #[source]
        source: rusqlite::Error,
    },

    /// Filesystem I/O error while reading the backing store.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Backing file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn persistence(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors for records rejected before persistence.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A base-schema field was not supplied.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// The caller supplied a field the store assigns itself.
    #[error("Field is assigned by the store and cannot be supplied: {0}")]
    ReservedField(String),

    /// A field name is not a valid column identifier.
    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// An answer is not one of the labels the question allows.
    #[error("Unknown choice for {field}: {value:?}")]
    UnknownChoice {
        /// Question field name.
        field: String,
        /// The rejected answer.
        value: String,
    },

    /// The respondent did not agree to the consent terms.
    #[error("Consent is required to submit a response")]
    ConsentRequired,
}

/// Errors in Tally configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Cannot read config {path}: {source}")]
    Read {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors during analysis of cached responses.
#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    /// The requested field is not part of any cached record.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Algorithmic or numerical error during computation.
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Convenience alias for `Result<T, TallyError>`.
pub type Result<T> = std::result::Result<T, TallyError>;
