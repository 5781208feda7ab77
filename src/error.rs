use std::path::Path;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Reqwest(String),
    #[error("Filesystem I/O error: {0}")]
    Io(String),
    #[error("JSON serialization error: {0}")]
    SerdeSerialize(String),
    #[error("JSON parsing error: {0}")]
    SerdeParse(String),
    #[error("Required input '{path}' not found")]
    InputMissing { path: String },
    #[error("Required input '{path}' is unusable: {reason}")]
    InputInvalid { path: String, reason: String },
    #[error("Extraction error: {0}")]
    Extraction(String),
    #[error("Invalid argument provided: {0}")]
    Argument(String),
    #[error("Tokio task join error: {0}")]
    JoinError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Semaphore acquisition error: {0}")]
    SemaphoreAcquire(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Reqwest(e.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() || e.is_eof() || e.is_syntax() || e.is_data() {
            AppError::SerdeParse(e.to_string())
        } else {
            AppError::SerdeSerialize(e.to_string())
        }
    }
}
impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::JoinError(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn input_missing(path: &Path) -> AppError {
        AppError::InputMissing {
            path: path.display().to_string(),
        }
    }

    pub fn input_invalid<S: Into<String>>(path: &Path, reason: S) -> AppError {
        AppError::InputInvalid {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean a required dataset could not be used.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            AppError::InputMissing { .. } | AppError::InputInvalid { .. }
        )
    }
}
