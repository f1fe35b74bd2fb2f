//! Error types for Evicta.
//!
//! The cache core never fails: misses, expiry and guardrail rejections are
//! decision states. Errors come from the outer layers only (config loading,
//! the generative backend, the HTTP front door).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvictaError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvictaError>;
