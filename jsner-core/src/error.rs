use jsner_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to export: no endpoints found")]
    ExportEmpty,

    #[error("No stored results{}", .0.as_deref().map(|p| format!(" for {}", p)).unwrap_or_default())]
    NoStoredResults(Option<String>),

    #[error("Cannot open '{0}': not a URL, path or query string")]
    UnsupportedCandidate(String),

    #[error("No base URL configured (set one with `jsner config base-url <URL>`)")]
    MissingBaseUrl,
}

pub type Result<T> = std::result::Result<T, CoreError>;
