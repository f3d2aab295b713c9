//! Error types for practice sheet generation
//!
//! Every failure surfaced to a caller is one of three kinds: the request was
//! invalid, the font configuration cannot produce glyphs, or drawing/encoding
//! failed part way. Out-of-range numeric options are never errors; see
//! `options` for the clamping rules.

use thiserror::Error;

/// Custom error type for sheet generation
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Render error: {0}")]
    Render(String),
}

/// Result type alias for sheet operations
pub type SheetResult<T> = Result<T, SheetError>;

impl SheetError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SheetError::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        SheetError::Configuration(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        SheetError::Render(msg.into())
    }
}

impl From<lopdf::Error> for SheetError {
    fn from(err: lopdf::Error) -> Self {
        SheetError::Render(format!("PDF assembly failed: {}", err))
    }
}

impl From<std::io::Error> for SheetError {
    fn from(err: std::io::Error) -> Self {
        SheetError::Render(format!("IO failure: {}", err))
    }
}
