//! State error types

use thiserror::Error;

/// Errors raised while building a state from external input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Malformed JSON document
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid account address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid hex payload (code, balance or storage)
    #[error("invalid hex for {field}: {value}")]
    InvalidHex {
        /// Field being parsed
        field: &'static str,
        /// Offending value
        value: String,
    },
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
