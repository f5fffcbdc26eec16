//! Segment Context - 领域错误

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Invalid token bounds: min={min}, max={max}")]
    InvalidBounds { min: usize, max: usize },

    #[error("Unknown segment mode: {0}")]
    UnknownMode(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
}
