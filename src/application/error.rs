//! 应用层错误定义
//!
//! 统一的命令错误类型

use thiserror::Error;

use crate::application::ports::{ClipStoreError, MixError, TtsError};
use crate::domain::segment::SegmentError;
use crate::domain::timeline::AssemblyError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 输入错误（文本为空、参数缺失或非法），在任何合成开始前失败
    #[error("Input error: {0}")]
    InputError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 组装错误
    #[error("Assembly error: {0}")]
    AssemblyError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建输入错误
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<SegmentError> for ApplicationError {
    fn from(err: SegmentError) -> Self {
        Self::InputError(err.to_string())
    }
}

impl From<AssemblyError> for ApplicationError {
    fn from(err: AssemblyError) -> Self {
        Self::AssemblyError(err.to_string())
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<ClipStoreError> for ApplicationError {
    fn from(err: ClipStoreError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<MixError> for ApplicationError {
    fn from(err: MixError) -> Self {
        Self::AssemblyError(err.to_string())
    }
}
