//! 应用层测试用的端口替身

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::application::ports::{
    AudioConcatPort, ClipStoreError, ClipStorePort, MixError, MixedAudioInfo, ProgressEvent,
    ProgressReporterPort, PromptHandle, PromptUpload, StoredClip, SynthesisRequest, TtsEnginePort,
    TtsError,
};
use crate::domain::segment::Segment;
use crate::domain::timeline::ConcatPlan;

pub fn segments(n: usize) -> Vec<Segment> {
    (0..n)
        .map(|i| Segment::new(i, format!("第{}段", i), i + 1 == n))
        .collect()
}

/// 单次调用的预设行为，音频字节数即为毫秒时长
#[derive(Debug, Clone)]
pub enum Step {
    Audio(usize),
    AudioAfter(Duration, usize),
    Fail(TtsError),
    Panic(&'static str),
}

/// 按片段索引预设返回值的 TTS 替身，未预设的索引返回 1 秒音频
#[derive(Default)]
pub struct ScriptedTts {
    scripts: Mutex<HashMap<usize, VecDeque<Step>>>,
    calls: Mutex<HashMap<usize, Vec<Instant>>>,
    last_request: Mutex<Option<SynthesisRequest>>,
    uploads: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTts {
    pub fn script(&self, index: usize, steps: Vec<Step>) {
        self.scripts.lock().unwrap().insert(index, steps.into());
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().values().map(Vec::len).sum()
    }

    pub fn call_times(&self, index: usize) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .get(&index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SynthesisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl TtsEnginePort for ScriptedTts {
    async fn upload_prompt(&self, _upload: PromptUpload) -> Result<PromptHandle, TtsError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(PromptHandle {
            url: "https://assets.test/prompt.wav".to_string(),
            asset_key: "prompt".to_string(),
        })
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>, TtsError> {
        let index = request.segment.index;
        self.calls
            .lock()
            .unwrap()
            .entry(index)
            .or_default()
            .push(Instant::now());
        *self.last_request.lock().unwrap() = Some(request);

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&index)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Audio(1000));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        let result = match step {
            Step::Audio(len) => Ok(vec![0u8; len]),
            Step::AudioAfter(delay, len) => {
                tokio::time::sleep(delay).await;
                Ok(vec![0u8; len])
            }
            Step::Fail(err) => Err(err),
            Step::Panic(message) => panic!("{}", message),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// 内存片段存储，空字节视为无效音频
#[derive(Default)]
pub struct MemoryClipStore {
    clips: Mutex<HashMap<usize, Duration>>,
    corrupt: Mutex<HashSet<usize>>,
}

impl MemoryClipStore {
    pub fn insert(&self, index: usize, duration: Duration) {
        self.corrupt.lock().unwrap().remove(&index);
        self.clips.lock().unwrap().insert(index, duration);
    }

    /// 片段存在但无法读取时长，例如被截断的文件
    pub fn insert_corrupt(&self, index: usize) {
        self.clips.lock().unwrap().insert(index, Duration::ZERO);
        self.corrupt.lock().unwrap().insert(index);
    }
}

#[async_trait]
impl ClipStorePort for MemoryClipStore {
    fn clip_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("clip_{:03}.wav", index))
    }

    fn exists(&self, index: usize) -> bool {
        self.clips.lock().unwrap().contains_key(&index)
    }

    async fn save(&self, index: usize, audio: &[u8]) -> Result<StoredClip, ClipStoreError> {
        if audio.is_empty() {
            return Err(ClipStoreError::InvalidAudio("empty body".to_string()));
        }
        let duration = Duration::from_millis(audio.len() as u64);
        self.insert(index, duration);
        Ok(StoredClip {
            path: self.clip_path(index),
            duration,
        })
    }

    async fn measure(&self, index: usize) -> Result<Duration, ClipStoreError> {
        if self.corrupt.lock().unwrap().contains(&index) {
            return Err(ClipStoreError::InvalidAudio(format!("clip {} truncated", index)));
        }
        self.clips
            .lock()
            .unwrap()
            .get(&index)
            .copied()
            .ok_or_else(|| ClipStoreError::IoError(format!("clip {} missing", index)))
    }
}

/// 记录拼接计划的混音替身
#[derive(Default)]
pub struct RecordingMixer {
    pub plans: Mutex<Vec<ConcatPlan>>,
}

#[async_trait]
impl AudioConcatPort for RecordingMixer {
    async fn concat(&self, plan: &ConcatPlan, output: &Path) -> Result<MixedAudioInfo, MixError> {
        if plan.clips.is_empty() {
            return Err(MixError::EmptyPlan);
        }
        self.plans.lock().unwrap().push(plan.clone());
        Ok(MixedAudioInfo {
            path: output.to_path_buf(),
            duration: Duration::ZERO,
            sample_rate: 24_000,
            channels: 1,
        })
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }
}

impl ProgressReporterPort for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
