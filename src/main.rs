//! Utterflow - 长文本零样本语音合成
//!
//! 文本 → 分段 → 并发合成 → 交叉淡化拼接 → SRT 字幕

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use utterflow::application::{
    GenerateAudiobook, GenerateAudiobookHandler, PromptUpload, TtsEnginePort,
};
use utterflow::config::{load_config_from_path, print_config, validate_config, AppConfig};
use utterflow::domain::segment::{Language, SegmentMode};
use utterflow::domain::timeline::CrossfadeCurve;
use utterflow::infrastructure::adapters::{
    FakeTtsClient, FileClipStore, HttpTtsClient, HttpTtsClientConfig, WavMixer,
};
use utterflow::infrastructure::EventPublisher;

/// 命令行参数，未指定的项使用配置文件与环境变量中的值
#[derive(Debug, Parser)]
#[command(name = "utterflow", version, about = "Long-form zero-shot TTS pipeline")]
struct Cli {
    /// 待合成文本
    #[arg(long, conflicts_with = "input_file", required_unless_present = "input_file")]
    input_text: Option<String>,

    /// 从文件读取待合成文本
    #[arg(long)]
    input_file: Option<PathBuf>,

    #[arg(long)]
    prompt_voice_path: PathBuf,

    #[arg(long)]
    prompt_voice_text: String,

    /// 片段文件名前缀
    #[arg(long, default_value = "clip")]
    audio_basename: String,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// 默认为 {output_dir}/{audio_basename}.wav
    #[arg(long)]
    output_wav: Option<PathBuf>,

    #[arg(long)]
    output_srt: Option<PathBuf>,

    #[arg(long)]
    language: Option<Language>,

    #[arg(long)]
    prompt_language: Option<Language>,

    #[arg(long)]
    segment_mode: Option<SegmentMode>,

    #[arg(long)]
    min_tokens: Option<usize>,

    /// 0 表示不按 token 数调整
    #[arg(long)]
    max_tokens: Option<usize>,

    #[arg(long)]
    split_cjk_spaces: bool,

    /// 在每段末尾加入静音标记
    #[arg(long)]
    add_end_silence: bool,

    /// 提示音开头补静音（秒）
    #[arg(long, default_value_t = 0.0)]
    prompt_start_silence: f64,

    /// 提示音结尾补静音（秒）
    #[arg(long, default_value_t = 0.0)]
    prompt_end_silence: f64,

    #[arg(long)]
    crossfade_duration: Option<f64>,

    #[arg(long)]
    crossfade_curve: Option<CrossfadeCurve>,

    #[arg(long)]
    max_parallel: Option<usize>,

    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    retry_base_delay: Option<f64>,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 使用本地静音合成代替 TTS 服务
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// 命令行参数覆盖配置
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(mode) = self.segment_mode {
            config.segment.mode = mode;
        }
        if let Some(min) = self.min_tokens {
            config.segment.min_tokens = min;
        }
        if let Some(max) = self.max_tokens {
            config.segment.max_tokens = max;
        }
        if self.split_cjk_spaces {
            config.segment.split_on_cjk_spaces = true;
        }
        if let Some(duration) = self.crossfade_duration {
            config.crossfade.duration_secs = duration;
        }
        if let Some(curve) = self.crossfade_curve {
            config.crossfade.curve = curve;
        }
        if let Some(parallel) = self.max_parallel {
            config.synthesis.max_parallel = parallel;
        }
        if let Some(retries) = self.max_retries {
            config.synthesis.max_retries = retries;
        }
        if let Some(delay) = self.retry_base_delay {
            config.synthesis.retry_base_delay_secs = delay;
        }
    }
}

fn silence_secs(name: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow::anyhow!("{} must be a non-negative duration, got {}: {}", name, secs, e))
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},utterflow={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let mut config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    cli.apply_overrides(&mut config);
    validate_config(&config).map_err(|e| anyhow::anyhow!("Invalid options: {}", e))?;

    init_tracing(&config);
    tracing::info!("Utterflow - 长文本零样本语音合成");
    print_config(&config);

    let text = match (&cli.input_text, &cli.input_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        (None, None) => anyhow::bail!("either --input-text or --input-file is required"),
    };

    let prompt = PromptUpload::new(&cli.prompt_voice_path).with_silence(
        silence_secs("--prompt-start-silence", cli.prompt_start_silence)?,
        silence_secs("--prompt-end-silence", cli.prompt_end_silence)?,
    );
    let output_wav = cli
        .output_wav
        .clone()
        .unwrap_or_else(|| cli.output_dir.join(format!("{}.wav", cli.audio_basename)));

    let command = GenerateAudiobook {
        text,
        prompt,
        prompt_text: cli.prompt_voice_text.clone(),
        language: cli.language,
        prompt_language: cli.prompt_language,
        add_end_silence: cli.add_end_silence,
        segment: config.segment.to_segment_config()?,
        dispatch: config.synthesis.to_dispatch_config()?,
        crossfade: config.crossfade.to_spec()?,
        output_wav,
        output_srt: cli.output_srt.clone(),
    };

    // 创建 TTS 引擎
    let tts_engine: Arc<dyn TtsEnginePort> = if cli.dry_run {
        tracing::warn!("Dry run: using FakeTtsClient, no requests are sent");
        Arc::new(FakeTtsClient::with_defaults())
    } else {
        let tts_config = HttpTtsClientConfig {
            api_url: config.tts.api_url.clone(),
            presign_url: config.tts.presign_url.clone(),
            upload_url: config.tts.upload_url.clone(),
            api_key: config.tts.api_key.clone(),
            model_id: config.tts.model_id.clone(),
            timeout_secs: config.tts.timeout_secs,
        };
        Arc::new(HttpTtsClient::new(tts_config)?)
    };

    let clip_store = Arc::new(FileClipStore::new(&cli.output_dir, &cli.audio_basename).await?);
    let mixer = Arc::new(WavMixer::new());
    let publisher = EventPublisher::new().arc();

    // Ctrl-C 取消尚未开始的片段
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling pending segments");
            ctrl_c_token.cancel();
        }
    });

    let handler = GenerateAudiobookHandler::new(tts_engine, clip_store, mixer, publisher)
        .with_cancellation(cancel);
    let summary = handler.handle(command).await?;

    println!(
        "Generated: {}, skipped: {}, failed: {}, total: {:.2}s",
        summary.generated,
        summary.skipped,
        summary.failed,
        summary.total_duration.as_secs_f64()
    );
    if let Some(path) = &summary.output_path {
        println!("Audio: {}", path.display());
    }
    if let Some(path) = &summary.subtitle_path {
        println!("Subtitles: {}", path.display());
    }

    if !summary.is_complete() {
        anyhow::bail!("final audio was not produced");
    }

    Ok(())
}
