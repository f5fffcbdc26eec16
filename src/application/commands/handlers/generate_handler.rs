//! GenerateAudiobook Handler
//!
//! 文本 → 分段 → 上传提示音 → 并发合成 → 组装时间轴 → 拼接 → 字幕

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::commands::GenerateAudiobook;
use crate::application::dispatcher::{SynthesisContext, SynthesisDispatcher};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioConcatPort, ClipStorePort, ProgressEvent, ProgressReporterPort, PromptHandle,
    SynthesisOptions, TtsEnginePort,
};
use crate::domain::segment::{count_tokens, preprocess_text, segment_text, Segment};
use crate::domain::timeline::{
    assemble, build_cues, render_srt, AssemblyPlan, OutcomeCounts, RunSummary, SynthesisOutcome,
    TimelineEntry,
};

const TOTAL_STEPS: usize = 5;

/// GenerateAudiobook Handler
pub struct GenerateAudiobookHandler {
    tts_engine: Arc<dyn TtsEnginePort>,
    clip_store: Arc<dyn ClipStorePort>,
    mixer: Arc<dyn AudioConcatPort>,
    reporter: Arc<dyn ProgressReporterPort>,
    cancel: CancellationToken,
}

impl GenerateAudiobookHandler {
    pub fn new(
        tts_engine: Arc<dyn TtsEnginePort>,
        clip_store: Arc<dyn ClipStorePort>,
        mixer: Arc<dyn AudioConcatPort>,
        reporter: Arc<dyn ProgressReporterPort>,
    ) -> Self {
        Self {
            tts_engine,
            clip_store,
            mixer,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 执行一次完整生成
    ///
    /// 输入错误与提示音上传失败返回 Err；单个片段失败与组装失败记录在 RunSummary 中，
    /// 未能生成最终音频时 `output_path` 为 None
    pub async fn handle(&self, command: GenerateAudiobook) -> Result<RunSummary, ApplicationError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        command.dispatch.validate()?;

        // Step 1: 分段
        self.reporter
            .report(ProgressEvent::step(1, TOTAL_STEPS, "Segmenting text"));
        let text = preprocess_text(&command.text);
        let segments = segment_text(&text, &command.segment)?;
        for segment in &segments {
            tracing::debug!(
                index = segment.index,
                tokens = count_tokens(&segment.text),
                text = %segment.text,
                "Segment"
            );
        }
        self.reporter.report(ProgressEvent::info(format!(
            "Split text into {} segments ({} mode)",
            segments.len(),
            command.segment.mode
        )));

        let dispatcher = SynthesisDispatcher::new(
            command.dispatch.clone(),
            self.tts_engine.clone(),
            self.clip_store.clone(),
            self.reporter.clone(),
        )
        .with_cancellation(self.cancel.clone());

        // Step 2: 上传提示音（所有片段都可复用时跳过）
        self.reporter
            .report(ProgressEvent::step(2, TOTAL_STEPS, "Uploading prompt voice"));
        let probe = dispatcher.probe(&segments).await?;
        let prompt = if probe.all_cached() {
            self.reporter
                .report(ProgressEvent::info("All clips present, skipping prompt upload"));
            PromptHandle::default()
        } else {
            self.upload_prompt(&command).await?
        };

        // Step 3: 合成
        self.reporter.report(ProgressEvent::step(
            3,
            TOTAL_STEPS,
            format!("Synthesizing {} segments", probe.misses()),
        ));
        let context = SynthesisContext {
            prompt,
            prompt_text: command.prompt_text.clone(),
            language: command.language,
            options: SynthesisOptions {
                prompt_language: command.prompt_language,
                add_end_silence: command.add_end_silence,
            },
        };
        let report = dispatcher.dispatch_probed(&segments, probe, &context).await?;

        let mut summary = RunSummary {
            run_id,
            generated: report.counts.generated,
            skipped: report.counts.skipped,
            failed: report.counts.failed,
            timeline: Vec::new(),
            total_duration: Duration::ZERO,
            output_path: None,
            subtitle_path: None,
            started_at,
            finished_at: started_at,
        };

        // Step 4: 组装与拼接
        self.reporter
            .report(ProgressEvent::step(4, TOTAL_STEPS, "Assembling audio"));
        if report.cancelled {
            tracing::warn!(run_id = %run_id, "Run cancelled, final audio not assembled");
        } else if let Some(plan) = self.assemble_audio(&report.outcomes, &command).await {
            summary.output_path = Some(command.output_wav.clone());
            summary.total_duration = plan.total_duration;
            summary.timeline = plan.entries;
        }

        // Step 5: 字幕（尽力而为）
        self.reporter
            .report(ProgressEvent::step(5, TOTAL_STEPS, "Writing subtitles"));
        if let Some(srt_path) = command.output_srt.as_deref().filter(|_| summary.is_complete()) {
            summary.subtitle_path = self
                .write_subtitles(&summary.timeline, &segments, srt_path)
                .await;
        }

        summary.finished_at = Utc::now();
        self.reporter.report(ProgressEvent::Summary {
            counts: OutcomeCounts {
                generated: summary.generated,
                skipped: summary.skipped,
                failed: summary.failed,
            },
            total_duration: summary.total_duration,
        });

        tracing::info!(
            run_id = %run_id,
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            total_secs = summary.total_duration.as_secs_f64(),
            complete = summary.is_complete(),
            "Run finished"
        );

        Ok(summary)
    }

    async fn upload_prompt(
        &self,
        command: &GenerateAudiobook,
    ) -> Result<PromptHandle, ApplicationError> {
        if !command.prompt.audio_path.is_file() {
            return Err(ApplicationError::input(format!(
                "prompt voice not found: {}",
                command.prompt.audio_path.display()
            )));
        }

        let handle = self.tts_engine.upload_prompt(command.prompt.clone()).await?;
        tracing::info!(asset_key = %handle.asset_key, "Prompt voice uploaded");
        Ok(handle)
    }

    /// 组装失败或拼接失败时返回 None，最终输出路径不被写入
    async fn assemble_audio(
        &self,
        outcomes: &[SynthesisOutcome],
        command: &GenerateAudiobook,
    ) -> Option<AssemblyPlan> {
        let plan = match assemble(outcomes, &command.crossfade) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "Timeline assembly failed");
                self.reporter
                    .report(ProgressEvent::info(format!("Assembly failed: {}", e)));
                return None;
            }
        };

        for warning in &plan.warnings {
            self.reporter.report(ProgressEvent::info(warning.to_string()));
        }

        match self.mixer.concat(&plan.concat, &command.output_wav).await {
            Ok(info) => {
                tracing::info!(
                    path = %info.path.display(),
                    clips = plan.concat.clips.len(),
                    mixed_secs = info.duration.as_secs_f64(),
                    planned_secs = plan.total_duration.as_secs_f64(),
                    "Final audio written"
                );
                Some(plan)
            }
            Err(e) => {
                tracing::error!(error = %e, "Audio concatenation failed");
                self.reporter
                    .report(ProgressEvent::info(format!("Concatenation failed: {}", e)));
                None
            }
        }
    }

    async fn write_subtitles(
        &self,
        entries: &[TimelineEntry],
        segments: &[Segment],
        path: &Path,
    ) -> Option<PathBuf> {
        let cues = match build_cues(entries, segments) {
            Ok(cues) => cues,
            Err(e) => {
                tracing::warn!(error = %e, "Subtitle derivation failed");
                return None;
            }
        };

        match write_atomic(path, render_srt(&cues).as_bytes()).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), cues = cues.len(), "Subtitles written");
                Some(path.to_path_buf())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write subtitles");
                None
            }
        }
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".part");
    let temp = PathBuf::from(temp);

    let result = match tokio::fs::write(&temp, data).await {
        Ok(()) => tokio::fs::rename(&temp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::DispatchConfig;
    use crate::application::ports::{PromptUpload, TtsError};
    use crate::application::test_support::{
        MemoryClipStore, RecordingMixer, RecordingReporter, ScriptedTts, Step,
    };
    use crate::domain::segment::{SegmentConfig, SegmentMode};
    use crate::domain::timeline::CrossfadeSpec;

    struct Fixture {
        dir: tempfile::TempDir,
        tts: Arc<ScriptedTts>,
        store: Arc<MemoryClipStore>,
        mixer: Arc<RecordingMixer>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("prompt.wav"), b"RIFF").unwrap();
            Self {
                dir,
                tts: Arc::new(ScriptedTts::default()),
                store: Arc::new(MemoryClipStore::default()),
                mixer: Arc::new(RecordingMixer::default()),
            }
        }

        fn handler(&self) -> GenerateAudiobookHandler {
            GenerateAudiobookHandler::new(
                self.tts.clone(),
                self.store.clone(),
                self.mixer.clone(),
                Arc::new(RecordingReporter::default()),
            )
        }

        fn command(&self, text: &str) -> GenerateAudiobook {
            GenerateAudiobook {
                text: text.to_string(),
                prompt: PromptUpload::new(self.dir.path().join("prompt.wav")),
                prompt_text: "提示音".to_string(),
                language: None,
                prompt_language: None,
                add_end_silence: false,
                segment: SegmentConfig::new(SegmentMode::Sentence),
                dispatch: DispatchConfig {
                    max_parallel: 2,
                    max_retries: 3,
                    retry_base_delay: Duration::from_millis(1),
                },
                crossfade: CrossfadeSpec::disabled(),
                output_wav: self.dir.path().join("book.wav"),
                output_srt: Some(self.dir.path().join("book.srt")),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_segment_is_omitted_and_cues_renumber() {
        let fixture = Fixture::new();
        fixture.tts.script(0, vec![Step::Audio(1000)]);
        fixture.tts.script(
            1,
            vec![Step::Fail(TtsError::NetworkError("connection reset".into())); 8],
        );
        fixture.tts.script(2, vec![Step::Audio(1500)]);

        let summary = fixture
            .handler()
            .handle(fixture.command("第一句。第二句。第三句。"))
            .await
            .unwrap();

        assert_eq!(summary.generated, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(fixture.tts.call_times(1).len(), 4);
        assert!(summary.is_complete());

        let plans = fixture.mixer.plans.lock().unwrap().clone();
        assert_eq!(
            plans[0].clips,
            vec![PathBuf::from("clip_000.wav"), PathBuf::from("clip_002.wav")]
        );

        let srt = std::fs::read_to_string(fixture.dir.path().join("book.srt")).unwrap();
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,000\n第一句\n\n\
             2\n00:00:01,000 --> 00:00:02,500\n第三句\n\n"
        );
        assert_eq!(summary.total_duration, Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_rerun_skips_everything() {
        let fixture = Fixture::new();
        let text = "第一句。第二句。第三句。";

        let first = fixture.handler().handle(fixture.command(text)).await.unwrap();
        assert_eq!(first.generated, 3);
        assert_eq!(fixture.tts.uploads(), 1);

        let second = fixture.handler().handle(fixture.command(text)).await.unwrap();
        assert_eq!(second.generated, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(fixture.tts.calls(), 3);
        assert_eq!(fixture.tts.uploads(), 1);
        assert!(second.is_complete());
    }

    #[tokio::test]
    async fn test_no_successes_produces_no_output() {
        let fixture = Fixture::new();
        fixture.tts.script(
            0,
            vec![Step::Fail(TtsError::Rejected {
                status: 400,
                message: "bad".into(),
            })],
        );

        let summary = fixture
            .handler()
            .handle(fixture.command("只有一句"))
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(!summary.is_complete());
        assert!(summary.subtitle_path.is_none());
        assert!(fixture.mixer.plans.lock().unwrap().is_empty());
        assert!(!fixture.dir.path().join("book.srt").exists());
    }

    #[tokio::test]
    async fn test_empty_text_is_input_error() {
        let fixture = Fixture::new();
        let result = fixture.handler().handle(fixture.command("  \n  ")).await;

        assert!(matches!(result, Err(ApplicationError::InputError(_))));
        assert_eq!(fixture.tts.uploads(), 0);
    }

    #[tokio::test]
    async fn test_missing_prompt_is_input_error() {
        let fixture = Fixture::new();
        let mut command = fixture.command("一句话。");
        command.prompt = PromptUpload::new(fixture.dir.path().join("missing.wav"));

        let result = fixture.handler().handle(command).await;
        assert!(matches!(result, Err(ApplicationError::InputError(_))));
        assert_eq!(fixture.tts.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_cached_clip_still_uploads_prompt() {
        let fixture = Fixture::new();
        fixture.store.insert(0, Duration::from_millis(800));
        fixture.store.insert_corrupt(1);
        fixture.store.insert(2, Duration::from_millis(900));

        let summary = fixture
            .handler()
            .handle(fixture.command("一。二。三。"))
            .await
            .unwrap();

        assert_eq!(fixture.tts.uploads(), 1);
        assert_eq!(fixture.tts.calls(), 1);
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.skipped, 2);

        let request = fixture.tts.last_request().unwrap();
        assert_eq!(request.segment.index, 1);
        assert_eq!(request.prompt.asset_key, "prompt");
        assert!(!request.prompt.url.is_empty());
    }

    #[tokio::test]
    async fn test_failed_subtitle_write_leaves_no_temp_file() {
        let fixture = Fixture::new();
        // 目标路径是目录，重命名失败
        let srt_path = fixture.dir.path().join("book.srt");
        std::fs::create_dir(&srt_path).unwrap();
        std::fs::write(srt_path.join("keep"), b"x").unwrap();

        let summary = fixture
            .handler()
            .handle(fixture.command("第一句。第二句。"))
            .await
            .unwrap();

        assert!(summary.is_complete());
        assert!(summary.subtitle_path.is_none());
        assert!(!fixture.dir.path().join("book.srt.part").exists());
    }
}
