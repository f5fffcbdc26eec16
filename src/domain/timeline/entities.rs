//! Timeline Context - 实体定义

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// 成功片段的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipSource {
    /// 本次运行合成
    Generated,
    /// 输出目录中已存在，跳过合成
    Cached,
}

/// 单个片段的合成结果
///
/// 每个片段索引恰好对应一个结果，失败也会被记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    Success {
        clip_path: PathBuf,
        duration: Duration,
        source: ClipSource,
    },
    Failure {
        last_error: String,
        attempts_made: u32,
    },
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisOutcome::Success { .. })
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            SynthesisOutcome::Success { duration, .. } => Some(*duration),
            SynthesisOutcome::Failure { .. } => None,
        }
    }
}

/// 结果计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn from_outcomes(outcomes: &[SynthesisOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut counts, outcome| {
            match outcome {
                SynthesisOutcome::Success {
                    source: ClipSource::Generated,
                    ..
                } => counts.generated += 1,
                SynthesisOutcome::Success {
                    source: ClipSource::Cached,
                    ..
                } => counts.skipped += 1,
                SynthesisOutcome::Failure { .. } => counts.failed += 1,
            }
            counts
        })
    }

    pub fn succeeded(&self) -> usize {
        self.generated + self.skipped
    }

    pub fn total(&self) -> usize {
        self.generated + self.skipped + self.failed
    }
}

/// 时间轴条目（仅成功片段）
///
/// `start` / `end` 已扣除交叉淡化重叠
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub index: usize,
    pub clip_path: PathBuf,
    pub duration: Duration,
    pub start: Duration,
    pub end: Duration,
}

/// 一次运行的汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timeline: Vec<TimelineEntry>,
    pub total_duration: Duration,
    /// 最终音频路径，未能生成时为 None
    pub output_path: Option<PathBuf>,
    /// 字幕路径，未请求或写入失败时为 None
    pub subtitle_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            generated: self.generated,
            skipped: self.skipped,
            failed: self.failed,
        }
    }

    /// 最终音频是否成功生成
    pub fn is_complete(&self) -> bool {
        self.output_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(source: ClipSource) -> SynthesisOutcome {
        SynthesisOutcome::Success {
            clip_path: PathBuf::from("clip.wav"),
            duration: Duration::from_secs(1),
            source,
        }
    }

    #[test]
    fn test_counts_from_outcomes() {
        let outcomes = vec![
            success(ClipSource::Generated),
            success(ClipSource::Cached),
            SynthesisOutcome::Failure {
                last_error: "boom".to_string(),
                attempts_made: 4,
            },
            success(ClipSource::Generated),
        ];

        let counts = OutcomeCounts::from_outcomes(&outcomes);
        assert_eq!(counts.generated, 2);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.succeeded(), 3);
        assert_eq!(counts.total(), 4);
    }
}
