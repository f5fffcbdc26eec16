//! Clip Store Port - 片段音频存储抽象
//!
//! 片段文件命名为 `{basename}_{index:03}.wav`，文件存在即视为已合成

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 片段存储错误
#[derive(Debug, Error)]
pub enum ClipStoreError {
    /// 服务返回的字节无法解析为 WAV
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl ClipStoreError {
    /// 无效音频来自服务端，可重试；本地写入失败不可重试
    pub fn is_transient(&self) -> bool {
        matches!(self, ClipStoreError::InvalidAudio(_))
    }
}

impl From<std::io::Error> for ClipStoreError {
    fn from(err: std::io::Error) -> Self {
        ClipStoreError::IoError(err.to_string())
    }
}

/// 已落盘的片段
#[derive(Debug, Clone, PartialEq)]
pub struct StoredClip {
    pub path: PathBuf,
    pub duration: Duration,
}

/// 片段文件名
pub fn clip_file_name(basename: &str, index: usize) -> String {
    format!("{}_{:03}.wav", basename, index)
}

/// 片段是否已存在（仅检查文件，无副作用）
pub fn clip_exists(output_dir: &Path, basename: &str, index: usize) -> bool {
    output_dir.join(clip_file_name(basename, index)).is_file()
}

/// Clip Store Port
#[async_trait]
pub trait ClipStorePort: Send + Sync {
    fn clip_path(&self, index: usize) -> PathBuf;

    /// 缓存探测
    fn exists(&self, index: usize) -> bool;

    /// 校验并原子写入片段（先写临时文件再重命名）
    async fn save(&self, index: usize, audio: &[u8]) -> Result<StoredClip, ClipStoreError>;

    /// 测量已有片段时长
    async fn measure(&self, index: usize) -> Result<Duration, ClipStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_file_name_is_zero_padded() {
        assert_eq!(clip_file_name("book", 0), "book_000.wav");
        assert_eq!(clip_file_name("book", 42), "book_042.wav");
        assert_eq!(clip_file_name("book", 1234), "book_1234.wav");
    }

    #[test]
    fn test_clip_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!clip_exists(dir.path(), "book", 1));

        std::fs::write(dir.path().join("book_001.wav"), b"RIFF").unwrap();
        assert!(clip_exists(dir.path(), "book", 1));
        assert!(!clip_exists(dir.path(), "book", 2));
        assert!(!clip_exists(dir.path(), "other", 1));
    }
}
