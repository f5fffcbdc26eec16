//! Audio Concat Port - 音频拼接抽象

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::timeline::ConcatPlan;

/// 拼接错误
#[derive(Debug, Error)]
pub enum MixError {
    #[error("Nothing to concatenate")]
    EmptyPlan,

    #[error("Decoding error: {path}: {message}")]
    DecodingError { path: PathBuf, message: String },

    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for MixError {
    fn from(err: std::io::Error) -> Self {
        MixError::IoError(err.to_string())
    }
}

/// 拼接结果
#[derive(Debug, Clone, PartialEq)]
pub struct MixedAudioInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio Concat Port
///
/// 按计划依次拼接片段，拼接点按 `JoinSpec` 做交叉淡化
#[async_trait]
pub trait AudioConcatPort: Send + Sync {
    /// 输出必须原子写入，失败时 `output` 不被创建或修改
    async fn concat(&self, plan: &ConcatPlan, output: &Path) -> Result<MixedAudioInfo, MixError>;
}
