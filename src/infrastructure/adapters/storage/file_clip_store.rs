//! File Clip Store - 文件系统片段存储实现
//!
//! 实现 ClipStorePort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::application::ports::{
    clip_exists, clip_file_name, ClipStoreError, ClipStorePort, StoredClip,
};
use crate::infrastructure::adapters::audio::wav::{normalize_wav, parse_wav};

/// 文件系统片段存储
///
/// 片段位于 `{output_dir}/{basename}_{index:03}.wav`
pub struct FileClipStore {
    output_dir: PathBuf,
    basename: String,
}

impl FileClipStore {
    /// 创建存储并确保输出目录存在
    pub async fn new(
        output_dir: impl AsRef<Path>,
        basename: impl Into<String>,
    ) -> Result<Self, ClipStoreError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).await?;

        Ok(Self {
            output_dir,
            basename: basename.into(),
        })
    }

    fn temp_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!(".{}.part", clip_file_name(&self.basename, index)))
    }
}

#[async_trait]
impl ClipStorePort for FileClipStore {
    fn clip_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(clip_file_name(&self.basename, index))
    }

    fn exists(&self, index: usize) -> bool {
        clip_exists(&self.output_dir, &self.basename, index)
    }

    async fn save(&self, index: usize, audio: &[u8]) -> Result<StoredClip, ClipStoreError> {
        let layout = parse_wav(audio).map_err(|e| ClipStoreError::InvalidAudio(e.to_string()))?;
        if layout.frames() == 0 {
            return Err(ClipStoreError::InvalidAudio("no audio frames".to_string()));
        }
        let duration = layout.duration();
        let wav = normalize_wav(audio).map_err(|e| ClipStoreError::InvalidAudio(e.to_string()))?;

        // 先写临时文件再重命名，中断时不会留下半个片段
        let temp = self.temp_path(index);
        let path = self.clip_path(index);
        if let Err(e) = fs::write(&temp, &wav).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        fs::rename(&temp, &path).await?;

        tracing::debug!(
            index = index,
            path = %path.display(),
            bytes = wav.len(),
            streaming_header = layout.streaming,
            duration_secs = duration.as_secs_f64(),
            "Clip saved"
        );

        Ok(StoredClip { path, duration })
    }

    async fn measure(&self, index: usize) -> Result<Duration, ClipStoreError> {
        let data = fs::read(self.clip_path(index)).await?;
        let layout = parse_wav(&data).map_err(|e| ClipStoreError::InvalidAudio(e.to_string()))?;
        Ok(layout.duration())
    }
}
