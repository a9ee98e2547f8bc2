use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please edit it with your store credentials and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Ingestion boundary errors
    #[error("Unknown news category: {value}")]
    UnknownCategory { value: String },

    #[error("Unknown day of week: {value}")]
    UnknownDay { value: String },

    #[error("Unknown contact subject: {value}")]
    UnknownSubject { value: String },

    #[error("Invalid time of day: {value}")]
    InvalidTime { value: String },

    // Store errors
    #[error("Store request on {collection} failed with status {status}: {message}")]
    StoreRequestFailed {
        collection: String,
        status: u16,
        message: String,
    },

    #[error("Malformed {collection} row: {reason}")]
    MalformedRow { collection: String, reason: String },

    // Contact form errors
    #[error("Invalid contact form field {field}: {reason}")]
    InvalidContactField { field: &'static str, reason: String },

    // Audio errors
    #[error("Audio transport failed: {reason}")]
    AudioTransport { reason: String },

    #[error("Live stream unavailable (HTTP {status})")]
    StreamUnavailable { status: u16 },

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    // Serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
