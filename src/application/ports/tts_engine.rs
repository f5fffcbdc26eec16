//! TTS Engine Port - 零样本语音克隆服务抽象
//!
//! 定义提示音上传与合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::segment::{Language, Segment};

/// TTS 错误
#[derive(Debug, Clone, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service error ({status}): {message}")]
    ServiceError { status: u16, message: String },

    /// 请求被服务端拒绝（参数非法等），重试无意义
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid prompt audio: {0}")]
    InvalidPrompt(String),
}

impl TtsError {
    /// 是否为可重试的瞬时错误
    pub fn is_transient(&self) -> bool {
        match self {
            TtsError::NetworkError(_)
            | TtsError::Timeout
            | TtsError::RateLimited(_)
            | TtsError::ServiceError { .. }
            | TtsError::InvalidResponse(_) => true,
            TtsError::Rejected { .. } | TtsError::InvalidPrompt(_) => false,
        }
    }

    /// 按 HTTP 状态码分类
    ///
    /// 408 / 429 / 5xx 为瞬时错误，其余 4xx 为永久错误
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 => TtsError::Timeout,
            429 => TtsError::RateLimited(message),
            500..=599 => TtsError::ServiceError { status, message },
            _ => TtsError::Rejected { status, message },
        }
    }
}

/// 提示音上传请求
#[derive(Debug, Clone)]
pub struct PromptUpload {
    /// 本地提示音文件
    pub audio_path: PathBuf,
    /// 上传前在开头补齐的静音
    pub start_silence: Duration,
    /// 上传前在结尾补齐的静音
    pub end_silence: Duration,
}

impl PromptUpload {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            start_silence: Duration::ZERO,
            end_silence: Duration::ZERO,
        }
    }

    pub fn with_silence(mut self, start: Duration, end: Duration) -> Self {
        self.start_silence = start;
        self.end_silence = end;
        self
    }
}

/// 已上传的提示音
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptHandle {
    pub url: String,
    pub asset_key: String,
}

/// 合成选项
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// 提示音文本的语言
    pub prompt_language: Option<Language>,
    /// 在文本末尾追加 200ms 静音标记
    pub add_end_silence: bool,
}

/// 单个片段的合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub segment: Segment,
    pub prompt: PromptHandle,
    /// 提示音对应的文本
    pub prompt_text: String,
    /// 目标语言
    pub language: Option<Language>,
    pub options: SynthesisOptions,
}

/// TTS Engine Port
///
/// 外部零样本 TTS 服务的抽象接口
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 上传提示音，返回服务端可引用的句柄
    async fn upload_prompt(&self, upload: PromptUpload) -> Result<PromptHandle, TtsError>;

    /// 合成单个片段，返回 WAV 字节
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>, TtsError>;
}
