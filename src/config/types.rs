//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use super::loader::ConfigError;
use crate::application::DispatchConfig;
use crate::domain::segment::{SegmentConfig, SegmentError, SegmentMode, TokenBounds};
use crate::domain::timeline::{AssemblyError, CrossfadeCurve, CrossfadeSpec};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// TTS 服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 合成调度配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 分段配置
    #[serde(default)]
    pub segment: SegmentSettings,

    /// 交叉淡化配置
    #[serde(default)]
    pub crossfade: CrossfadeConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// TTS 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// 零样本合成接口
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// 上传预签名接口
    #[serde(default = "default_presign_url")]
    pub presign_url: String,

    /// 资源上传地址
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://ent.fedgpt.cc/api/asura/v1/speeches:zero-shot".to_string()
}

fn default_presign_url() -> String {
    "https://ent.fedgpt.cc/api/asura/v1/transcriptions:presign".to_string()
}

fn default_upload_url() -> String {
    "https://ent.fedgpt.cc/asset/".to_string()
}

fn default_model_id() -> String {
    "tts-general-0.0.1".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            presign_url: default_presign_url(),
            upload_url: default_upload_url(),
            api_key: String::new(),
            model_id: default_model_id(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

/// 合成调度配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 最大并发请求数
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// 瞬时错误的最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 第一次重试前的等待时间（秒），之后逐次翻倍
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_secs: f64,
}

fn default_max_parallel() -> usize {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> f64 {
    1.0
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            max_retries: default_max_retries(),
            retry_base_delay_secs: default_retry_base_delay(),
        }
    }
}

impl SynthesisConfig {
    pub fn to_dispatch_config(&self) -> Result<DispatchConfig, ConfigError> {
        let retry_base_delay =
            Duration::try_from_secs_f64(self.retry_base_delay_secs).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "synthesis.retry_base_delay_secs {} is not a valid duration: {}",
                    self.retry_base_delay_secs, e
                ))
            })?;

        Ok(DispatchConfig {
            max_parallel: self.max_parallel,
            max_retries: self.max_retries,
            retry_base_delay,
        })
    }
}

/// 分段配置
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentSettings {
    /// raw / sentence / clause
    #[serde(default)]
    pub mode: SegmentMode,

    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,

    /// 0 表示不按 token 数调整
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// 两个汉字之间的空白视为句子边界
    #[serde(default)]
    pub split_on_cjk_spaces: bool,
}

fn default_min_tokens() -> usize {
    10
}

fn default_max_tokens() -> usize {
    40
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            mode: SegmentMode::default(),
            min_tokens: default_min_tokens(),
            max_tokens: default_max_tokens(),
            split_on_cjk_spaces: false,
        }
    }
}

impl SegmentSettings {
    pub fn to_segment_config(&self) -> Result<SegmentConfig, SegmentError> {
        let config =
            SegmentConfig::new(self.mode).with_cjk_space_split(self.split_on_cjk_spaces);
        if self.max_tokens == 0 {
            return Ok(config);
        }
        Ok(config.with_bounds(TokenBounds::new(self.min_tokens, self.max_tokens)?))
    }
}

/// 交叉淡化配置
#[derive(Debug, Clone, Deserialize)]
pub struct CrossfadeConfig {
    /// 每个拼接点的重叠时长（秒），0 表示直接拼接
    #[serde(default = "default_crossfade_duration")]
    pub duration_secs: f64,

    /// tri / qsin / hsin / log / exp
    #[serde(default)]
    pub curve: CrossfadeCurve,
}

fn default_crossfade_duration() -> f64 {
    0.05
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_crossfade_duration(),
            curve: CrossfadeCurve::default(),
        }
    }
}

impl CrossfadeConfig {
    pub fn to_spec(&self) -> Result<CrossfadeSpec, AssemblyError> {
        CrossfadeSpec::from_secs(self.duration_secs, self.curve)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tts.model_id, "tts-general-0.0.1");
        assert_eq!(config.synthesis.max_parallel, 1);
        assert_eq!(config.synthesis.max_retries, 3);
        assert_eq!(config.segment.mode, SegmentMode::Sentence);
        assert_eq!(config.crossfade.curve, CrossfadeCurve::Hsin);
    }

    #[test]
    fn test_dispatch_config() {
        let config = SynthesisConfig {
            max_parallel: 4,
            max_retries: 2,
            retry_base_delay_secs: 0.5,
        };
        let dispatch = config.to_dispatch_config().unwrap();
        assert_eq!(dispatch.max_parallel, 4);
        assert_eq!(dispatch.retry_base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_oversized_durations_are_errors() {
        let synthesis = SynthesisConfig {
            retry_base_delay_secs: 1e300,
            ..Default::default()
        };
        assert!(matches!(
            synthesis.to_dispatch_config(),
            Err(ConfigError::ValidationError(_))
        ));

        let crossfade = CrossfadeConfig {
            duration_secs: 1e300,
            ..Default::default()
        };
        assert!(crossfade.to_spec().is_err());
    }

    #[test]
    fn test_segment_config() {
        let bounded = SegmentSettings::default().to_segment_config().unwrap();
        assert_eq!(bounded.bounds, Some(TokenBounds::new(10, 40).unwrap()));

        let unbounded = SegmentSettings {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(unbounded.to_segment_config().unwrap().bounds.is_none());

        let inverted = SegmentSettings {
            min_tokens: 50,
            max_tokens: 40,
            ..Default::default()
        };
        assert!(inverted.to_segment_config().is_err());
    }

    #[test]
    fn test_crossfade_spec() {
        let spec = CrossfadeConfig::default().to_spec().unwrap();
        assert_eq!(spec.duration, Duration::from_millis(50));
        assert_eq!(spec.curve, CrossfadeCurve::Hsin);
    }
}
