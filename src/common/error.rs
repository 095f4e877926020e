use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status} for {url}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        url: String,
    },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ScraperError {
    /// Whether the error concerns one record only. Record-scoped errors never
    /// abort a provider batch.
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, ScraperError::MissingField(_) | ScraperError::InvalidDate(_))
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
