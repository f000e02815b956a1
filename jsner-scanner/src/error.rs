use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("No endpoints to verify")]
    NoCandidates,

    #[error("Source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("Probe failed: {0}")]
    ProbeFailure(String),

}

pub type Result<T> = std::result::Result<T, ScanError>;
