//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（utterflow.toml）
//! 3. 默认值
//!
//! 命令行参数在 main 中最后覆盖

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["utterflow", "utterflow.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `UTTERFLOW_`，层级分隔符 `__`）
/// 2. 配置文件（utterflow.toml 或 utterflow.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `UTTERFLOW_TTS__API_KEY=...`
/// - `UTTERFLOW_TTS__API_URL=https://tts.example.com/v1/speeches:zero-shot`
/// - `UTTERFLOW_SYNTHESIS__MAX_PARALLEL=4`
/// - `UTTERFLOW_CROSSFADE__CURVE=tri`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("tts.model_id", "tts-general-0.0.1")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("synthesis.max_parallel", 1)?
        .set_default("synthesis.max_retries", 3)?
        .set_default("synthesis.retry_base_delay_secs", 1.0)?
        .set_default("segment.mode", "sentence")?
        .set_default("segment.min_tokens", 10)?
        .set_default("segment.max_tokens", 40)?
        .set_default("segment.split_on_cjk_spaces", false)?
        .set_default("crossfade.duration_secs", 0.05)?
        .set_default("crossfade.curve", "hsin")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: UTTERFLOW_TTS__API_KEY=xxx
    builder = builder.add_source(
        Environment::with_prefix("UTTERFLOW")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
///
/// 命令行覆盖后需再次调用
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let urls = [
        ("tts.api_url", &config.tts.api_url),
        ("tts.presign_url", &config.tts.presign_url),
        ("tts.upload_url", &config.tts.upload_url),
    ];
    for (name, url) in urls {
        if url.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                name
            )));
        }
    }

    if config.tts.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tts.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.synthesis.max_parallel == 0 {
        return Err(ConfigError::ValidationError(
            "synthesis.max_parallel must be at least 1".to_string(),
        ));
    }

    let delay = config.synthesis.retry_base_delay_secs;
    if !delay.is_finite() || delay <= 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "synthesis.retry_base_delay_secs must be positive, got {}",
            delay
        )));
    }
    config.synthesis.to_dispatch_config()?;

    let segment = &config.segment;
    if segment.max_tokens > 0 && segment.min_tokens > segment.max_tokens {
        return Err(ConfigError::ValidationError(format!(
            "segment.min_tokens ({}) exceeds segment.max_tokens ({})",
            segment.min_tokens, segment.max_tokens
        )));
    }

    // 同时拒绝无法表示为 Duration 的超大值
    config.crossfade.to_spec().map_err(|_| {
        ConfigError::ValidationError(format!(
            "crossfade.duration_secs must be a non-negative duration, got {}",
            config.crossfade.duration_secs
        ))
    })?;

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Utterflow Configuration ===");
    tracing::info!("TTS API URL: {}", config.tts.api_url);
    tracing::info!("TTS Model: {}", config.tts.model_id);
    tracing::info!(
        "TTS API Key: {}",
        if config.tts.api_key.is_empty() { "<unset>" } else { "<set>" }
    );
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!(
        "Synthesis: max_parallel={}, max_retries={}, retry_base_delay={}s",
        config.synthesis.max_parallel,
        config.synthesis.max_retries,
        config.synthesis.retry_base_delay_secs
    );
    tracing::info!(
        "Segment: mode={}, tokens=[{}, {}]",
        config.segment.mode,
        config.segment.min_tokens,
        config.segment.max_tokens
    );
    tracing::info!(
        "Crossfade: {}s ({})",
        config.crossfade.duration_secs,
        config.crossfade.curve
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("===============================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_api_url() {
        let mut config = AppConfig::default();
        config.tts.api_url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_parallel() {
        let mut config = AppConfig::default();
        config.synthesis.max_parallel = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_non_positive_delay() {
        let mut config = AppConfig::default();
        config.synthesis.retry_base_delay_secs = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_inverted_tokens() {
        let mut config = AppConfig::default();
        config.segment.min_tokens = 80;
        config.segment.max_tokens = 60;
        assert!(validate_config(&config).is_err());

        config.segment.max_tokens = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_negative_crossfade() {
        let mut config = AppConfig::default();
        config.crossfade.duration_secs = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unrepresentable_durations() {
        let mut config = AppConfig::default();
        config.synthesis.retry_base_delay_secs = 1e300;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = AppConfig::default();
        config.crossfade.duration_secs = 1e300;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[synthesis]
max_parallel = 4
retry_base_delay_secs = 0.5

[segment]
mode = "clause"

[crossfade]
curve = "tri"
duration_secs = 0.1
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.synthesis.max_parallel, 4);
        assert_eq!(config.synthesis.max_retries, 3);
        assert_eq!(config.segment.mode.as_str(), "clause");
        assert_eq!(config.crossfade.curve.as_str(), "tri");
        assert_eq!(config.tts.model_id, "tts-general-0.0.1");
    }
}
