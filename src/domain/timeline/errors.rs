//! Timeline Context - 领域错误

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("No successful clips to assemble")]
    NoClips,

    #[error("Invalid crossfade duration: {0}s")]
    InvalidCrossfade(f64),

    #[error("Unknown crossfade curve: {0}")]
    UnknownCurve(String),

    #[error("Outcome index {index} has no matching segment")]
    MissingSegment { index: usize },
}
