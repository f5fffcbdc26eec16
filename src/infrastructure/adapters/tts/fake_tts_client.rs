//! Fake TTS Client - 不调用外部服务的 TTS 客户端
//!
//! 按 token 数返回对应时长的静音 WAV，用于 `--dry-run` 与测试

use async_trait::async_trait;
use std::time::Duration;

use crate::application::ports::{
    PromptHandle, PromptUpload, SynthesisRequest, TtsEnginePort, TtsError,
};
use crate::domain::segment::count_tokens;
use crate::infrastructure::adapters::audio::wav::silent_wav;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 每个 token 对应的音频时长
    pub per_token: Duration,
    pub sample_rate: u32,
    /// 模拟推理延迟
    pub latency: Duration,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            per_token: Duration::from_millis(200),
            sample_rate: 24_000,
            latency: Duration::from_millis(50),
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            per_token_ms = config.per_token.as_millis() as u64,
            sample_rate = config.sample_rate,
            "FakeTtsClient initialized"
        );
        Self { config }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    fn clip_duration(&self, text: &str) -> Duration {
        let tokens = count_tokens(text).max(1) as u32;
        self.config.per_token.saturating_mul(tokens)
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn upload_prompt(&self, upload: PromptUpload) -> Result<PromptHandle, TtsError> {
        tracing::debug!(
            path = %upload.audio_path.display(),
            "FakeTtsClient: skipping prompt upload"
        );
        Ok(PromptHandle {
            url: String::new(),
            asset_key: format!("fake-{}", uuid::Uuid::new_v4()),
        })
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>, TtsError> {
        let duration = self.clip_duration(&request.segment.text);
        tracing::debug!(
            index = request.segment.index,
            duration_ms = duration.as_millis() as u64,
            "FakeTtsClient: returning silent audio"
        );

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        Ok(silent_wav(duration, self.config.sample_rate))
    }
}
