//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Operation still pending after {attempts} status checks ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
