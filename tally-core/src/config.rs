use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::TIMESTAMP_FIELD;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "tally.toml";

/// Which response store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Csv,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Sqlite => "sqlite",
        }
    }

    /// File used when the config names no path.
    pub fn default_path(self) -> &'static str {
        match self {
            Self::Csv => "respostas_prep.csv",
            Self::Sqlite => "respostas_prep.db",
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(ConfigError::Invalid(format!("unknown storage backend {other:?}"))),
        }
    }
}

/// Top-level Tally configuration, matching `tally.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub survey: SurveySection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySection {
    pub title: String,
}

impl Default for SurveySection {
    fn default() -> Self {
        Self {
            title: "Pesquisa PrEP/HIV - São Paulo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageSection {
    /// Configured path, or the backend's default file name.
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.backend.default_path()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Below this many responses clustering reports "not enough data".
    pub min_records: usize,
    /// Upper bound on cluster groups; the effective count is `min(clusters, n)`.
    pub clusters: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Columns left out of the clustering input.
    pub exclude_fields: Vec<String>,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            min_records: 3,
            clusters: 3,
            max_iterations: 300,
            tolerance: 1e-4,
            exclude_fields: vec![TIMESTAMP_FIELD.to_string()],
        }
    }
}

impl TallyConfig {
    /// Load from `path`. A missing file yields the defaults.
    ///
    /// A relative storage path is resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.clusters == 0 {
            return Err(ConfigError::Invalid("analysis.clusters must be at least 1".into()));
        }
        if self.analysis.min_records == 0 {
            return Err(ConfigError::Invalid(
                "analysis.min_records must be at least 1".into(),
            ));
        }
        if self.analysis.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "analysis.max_iterations must be at least 1".into(),
            ));
        }
        if !(self.analysis.tolerance.is_finite() && self.analysis.tolerance >= 0.0) {
            return Err(ConfigError::Invalid(
                "analysis.tolerance must be a non-negative number".into(),
            ));
        }
        if self
            .storage
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid("storage.path must not be empty".into()));
        }
        Ok(())
    }

    /// Anchor a relative storage path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let path = self.storage.path();
        if path.is_relative() && !base.as_os_str().is_empty() {
            self.storage.path = Some(base.join(path));
        }
    }
}
