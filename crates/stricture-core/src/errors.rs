//! Error types for the Stricture core library.

/// Top-level error enum for the Stricture core library.
#[derive(Debug, thiserror::Error)]
pub enum StrictureError {
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("File too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Manifest invalid: {0}")]
    ManifestInvalid(String),

    #[error("Config not found: {0}")]
    ConfigNotFound(String),

    #[error("Config invalid: {0}")]
    ConfigInvalid(String),

    #[error("Duplicate rule: {0}")]
    DuplicateRule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StrictureError {
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, StrictureError::ParseFailure(_))
    }

    pub fn is_manifest_not_found(&self) -> bool {
        matches!(self, StrictureError::ManifestNotFound(_))
    }

    pub fn is_manifest_invalid(&self) -> bool {
        matches!(self, StrictureError::ManifestInvalid(_))
    }
}

pub type StrictureResult<T> = Result<T, StrictureError>;
