//! Synthesis Dispatcher - 并发合成调度
//!
//! 将分段并发发送到 TTS 服务：
//! - 已存在的片段直接跳过（缓存命中）
//! - 使用 semaphore 限制并发，按片段索引顺序放行
//! - 瞬时错误按指数退避重试，永久错误立即失败
//! - 结果按索引写入槽位，与完成顺序无关

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    ClipStorePort, ProgressEvent, ProgressReporterPort, PromptHandle, SynthesisOptions,
    SynthesisRequest, TtsEnginePort,
};
use crate::domain::segment::{Language, Segment};
use crate::domain::timeline::{ClipSource, OutcomeCounts, SynthesisOutcome};

/// 调度配置
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// 最大并发合成数
    pub max_parallel: usize,
    /// 首次失败后的最大重试次数
    pub max_retries: u32,
    /// 第一次重试前的等待时间，之后逐次翻倍
    pub retry_base_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.max_parallel == 0 {
            return Err(ApplicationError::input("max_parallel must be at least 1"));
        }
        if self.retry_base_delay.is_zero() {
            return Err(ApplicationError::input(
                "retry_base_delay must be greater than 0",
            ));
        }
        Ok(())
    }

    /// 第 `attempt` 次尝试（从 1 开始）之前的等待时间
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.retry_base_delay.saturating_mul(factor)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// 所有片段共享的合成参数
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    pub prompt: PromptHandle,
    pub prompt_text: String,
    pub language: Option<Language>,
    pub options: SynthesisOptions,
}

/// 调度结果
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// `outcomes[i]` 对应片段 `i`
    pub outcomes: Vec<SynthesisOutcome>,
    pub counts: OutcomeCounts,
    /// 调度期间是否收到取消
    pub cancelled: bool,
}

/// 单次尝试的失败
struct AttemptFailure {
    message: String,
    transient: bool,
}

const CANCELLED: &str = "cancelled";
const TASK_FAILED: &str = "synthesis task failed";

/// 缓存探测结果，`cached[i]` 为片段 `i` 的已有片段
#[derive(Debug, Clone)]
pub struct CacheProbe {
    cached: Vec<Option<SynthesisOutcome>>,
}

impl CacheProbe {
    /// 需要重新合成的片段数
    pub fn misses(&self) -> usize {
        self.cached.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn all_cached(&self) -> bool {
        self.misses() == 0
    }
}

/// 合成调度器
pub struct SynthesisDispatcher {
    config: DispatchConfig,
    tts_engine: Arc<dyn TtsEnginePort>,
    clip_store: Arc<dyn ClipStorePort>,
    reporter: Arc<dyn ProgressReporterPort>,
    cancel: CancellationToken,
}

impl SynthesisDispatcher {
    pub fn new(
        config: DispatchConfig,
        tts_engine: Arc<dyn TtsEnginePort>,
        clip_store: Arc<dyn ClipStorePort>,
        reporter: Arc<dyn ProgressReporterPort>,
    ) -> Self {
        Self {
            config,
            tts_engine,
            clip_store,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部取消令牌（例如 Ctrl-C）
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 合成所有片段，直到每个索引都得到最终结果才返回
    pub async fn dispatch(
        &self,
        segments: &[Segment],
        context: &SynthesisContext,
    ) -> Result<DispatchReport, ApplicationError> {
        let probe = self.probe(segments).await?;
        self.dispatch_probed(segments, probe, context).await
    }

    /// 探测已有片段，不发起任何合成请求
    ///
    /// 片段索引必须为 `0..N` 且按顺序排列
    pub async fn probe(&self, segments: &[Segment]) -> Result<CacheProbe, ApplicationError> {
        if let Some((position, segment)) = segments
            .iter()
            .enumerate()
            .find(|(position, segment)| segment.index != *position)
        {
            return Err(ApplicationError::input(format!(
                "segment indices must be dense and ordered: position {} has index {}",
                position, segment.index
            )));
        }

        let mut cached = Vec::with_capacity(segments.len());
        for segment in segments {
            cached.push(self.probe_cache(segment.index).await);
        }
        Ok(CacheProbe { cached })
    }

    /// 使用已有的探测结果合成剩余片段
    pub async fn dispatch_probed(
        &self,
        segments: &[Segment],
        probe: CacheProbe,
        context: &SynthesisContext,
    ) -> Result<DispatchReport, ApplicationError> {
        self.config.validate()?;

        let total = segments.len();
        if probe.cached.len() != total {
            return Err(ApplicationError::internal(format!(
                "cache probe covers {} segments, expected {}",
                probe.cached.len(),
                total
            )));
        }

        let mut slots = probe.cached;
        let pending: Vec<Segment> = segments
            .iter()
            .filter(|segment| slots[segment.index].is_none())
            .cloned()
            .collect();

        tracing::info!(
            total = total,
            cached = total - pending.len(),
            pending = pending.len(),
            max_parallel = self.config.max_parallel,
            "Dispatching synthesis"
        );

        // 公平 semaphore：按循环顺序（即索引顺序）获得 permit
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel));
        let context = Arc::new(context.clone());
        let mut tasks = JoinSet::new();
        let mut admitted = 0;

        for segment in &pending {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|e| ApplicationError::internal(format!("semaphore closed: {}", e)))?,
            };
            admitted += 1;

            let worker = SegmentWorker {
                config: self.config.clone(),
                tts_engine: self.tts_engine.clone(),
                clip_store: self.clip_store.clone(),
                reporter: self.reporter.clone(),
                cancel: self.cancel.clone(),
                context: context.clone(),
                total,
            };
            let segment = segment.clone();

            tasks.spawn(async move {
                let _permit = permit; // 持有 permit 直到片段完成
                let index = segment.index;
                // 内层任务 panic 时仍能得到该索引的结果
                let outcome = match tokio::spawn(worker.run(segment)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(index = index, error = %e, "Synthesis task panicked");
                        SynthesisOutcome::Failure {
                            last_error: format!("{}: {}", TASK_FAILED, e),
                            attempts_made: 0,
                        }
                    }
                };
                (index, outcome)
            });
        }

        if admitted < pending.len() {
            tracing::warn!(
                unstarted = pending.len() - admitted,
                "Dispatch cancelled, remaining segments not started"
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "Synthesis task aborted"),
            }
        }

        let cancelled = self.cancel.is_cancelled();
        let outcomes: Vec<SynthesisOutcome> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| SynthesisOutcome::Failure {
                    last_error: if cancelled { CANCELLED } else { TASK_FAILED }.to_string(),
                    attempts_made: 0,
                })
            })
            .collect();
        let counts = OutcomeCounts::from_outcomes(&outcomes);

        tracing::info!(
            generated = counts.generated,
            skipped = counts.skipped,
            failed = counts.failed,
            "Dispatch finished"
        );

        Ok(DispatchReport {
            outcomes,
            counts,
            cancelled,
        })
    }

    /// 片段已存在时返回缓存结果，时长无法读取时重新合成
    async fn probe_cache(&self, index: usize) -> Option<SynthesisOutcome> {
        if !self.clip_store.exists(index) {
            return None;
        }

        match self.clip_store.measure(index).await {
            Ok(duration) => {
                self.reporter
                    .report(ProgressEvent::Skipped { index, duration });
                Some(SynthesisOutcome::Success {
                    clip_path: self.clip_store.clip_path(index),
                    duration,
                    source: ClipSource::Cached,
                })
            }
            Err(e) => {
                tracing::warn!(
                    index = index,
                    error = %e,
                    "Existing clip unreadable, regenerating"
                );
                None
            }
        }
    }
}

/// 单个片段的合成任务，自带重试循环
struct SegmentWorker {
    config: DispatchConfig,
    tts_engine: Arc<dyn TtsEnginePort>,
    clip_store: Arc<dyn ClipStorePort>,
    reporter: Arc<dyn ProgressReporterPort>,
    cancel: CancellationToken,
    context: Arc<SynthesisContext>,
    total: usize,
}

impl SegmentWorker {
    async fn run(self, segment: Segment) -> SynthesisOutcome {
        let index = segment.index;
        let max_attempts = self.config.max_attempts();
        let mut attempt = 1;

        loop {
            self.reporter.report(ProgressEvent::Generating {
                index,
                total: self.total,
                attempt,
                text: segment.text.clone(),
            });

            let failure = match self.attempt(&segment).await {
                Ok(outcome) => return outcome,
                Err(failure) => failure,
            };

            if !failure.transient || attempt >= max_attempts {
                tracing::error!(
                    index = index,
                    attempts = attempt,
                    transient = failure.transient,
                    error = %failure.message,
                    "Segment synthesis failed"
                );
                self.reporter.report(ProgressEvent::Failed {
                    index,
                    attempts: attempt,
                    error: failure.message.clone(),
                });
                return SynthesisOutcome::Failure {
                    last_error: failure.message,
                    attempts_made: attempt,
                };
            }

            attempt += 1;
            let delay = self.config.retry_delay(attempt);
            tracing::warn!(
                index = index,
                attempt = attempt,
                delay_secs = delay.as_secs_f64(),
                error = %failure.message,
                "Transient synthesis error, retrying"
            );
            self.reporter.report(ProgressEvent::Retrying {
                index,
                attempt,
                delay,
                error: failure.message.clone(),
            });

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return SynthesisOutcome::Failure {
                        last_error: CANCELLED.to_string(),
                        attempts_made: attempt - 1,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt(&self, segment: &Segment) -> Result<SynthesisOutcome, AttemptFailure> {
        let request = SynthesisRequest {
            segment: segment.clone(),
            prompt: self.context.prompt.clone(),
            prompt_text: self.context.prompt_text.clone(),
            language: self.context.language,
            options: self.context.options.clone(),
        };

        let audio = self
            .tts_engine
            .synthesize(request)
            .await
            .map_err(|e| AttemptFailure {
                transient: e.is_transient(),
                message: e.to_string(),
            })?;

        let stored = self
            .clip_store
            .save(segment.index, &audio)
            .await
            .map_err(|e| AttemptFailure {
                transient: e.is_transient(),
                message: e.to_string(),
            })?;

        self.reporter.report(ProgressEvent::Success {
            index: segment.index,
            duration: stored.duration,
        });

        Ok(SynthesisOutcome::Success {
            clip_path: stored.path,
            duration: stored.duration,
            source: ClipSource::Generated,
        })
    }
}
