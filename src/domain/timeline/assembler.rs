//! 时间轴组装
//!
//! 根据所有片段的合成结果计算拼接计划和时间戳：
//! - 只保留成功片段，保持索引顺序
//! - 每个拼接点重叠 `crossfade` 时长，最终时长 = Σ时长 - Σ重叠
//! - 重叠超过相邻较短片段时，仅对该拼接点下调并记录警告

use std::path::PathBuf;
use std::time::Duration;

use super::crossfade::{CrossfadeCurve, CrossfadeSpec};
use super::entities::{SynthesisOutcome, TimelineEntry};
use super::errors::AssemblyError;

/// 单个拼接点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinSpec {
    /// 实际重叠时长（已下调）
    pub crossfade: Duration,
    pub curve: CrossfadeCurve,
}

/// 交给混音器的拼接计划
///
/// `joins[i]` 位于 `clips[i]` 与 `clips[i + 1]` 之间
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatPlan {
    pub clips: Vec<PathBuf>,
    pub joins: Vec<JoinSpec>,
}

impl ConcatPlan {
    pub fn has_crossfade(&self) -> bool {
        self.joins.iter().any(|join| !join.crossfade.is_zero())
    }
}

/// 拼接点重叠被下调的记录
#[derive(Debug, Clone, PartialEq)]
pub struct ClampWarning {
    /// 拼接点之后的片段索引
    pub index: usize,
    pub requested: Duration,
    pub applied: Duration,
}

impl std::fmt::Display for ClampWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "crossfade before segment {} clamped from {:.3}s to {:.3}s",
            self.index,
            self.requested.as_secs_f64(),
            self.applied.as_secs_f64()
        )
    }
}

/// 组装结果
#[derive(Debug, Clone)]
pub struct AssemblyPlan {
    pub concat: ConcatPlan,
    pub entries: Vec<TimelineEntry>,
    pub total_duration: Duration,
    pub warnings: Vec<ClampWarning>,
}

/// 组装时间轴
///
/// `outcomes` 按片段索引排列（`outcomes[i]` 对应片段 `i`）
pub fn assemble(
    outcomes: &[SynthesisOutcome],
    crossfade: &CrossfadeSpec,
) -> Result<AssemblyPlan, AssemblyError> {
    let successes: Vec<(usize, &PathBuf, Duration)> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(index, outcome)| match outcome {
            SynthesisOutcome::Success {
                clip_path,
                duration,
                ..
            } => Some((index, clip_path, *duration)),
            SynthesisOutcome::Failure { .. } => None,
        })
        .collect();

    if successes.is_empty() {
        return Err(AssemblyError::NoClips);
    }

    let mut entries: Vec<TimelineEntry> = Vec::with_capacity(successes.len());
    let mut joins = Vec::with_capacity(successes.len().saturating_sub(1));
    let mut warnings = Vec::new();

    for (index, clip_path, duration) in successes {
        let start = match entries.last() {
            None => Duration::ZERO,
            Some(prev) => {
                let overlap = if crossfade.is_enabled() {
                    let limit = prev.duration.min(duration);
                    if crossfade.duration > limit {
                        tracing::warn!(
                            index = index,
                            requested_secs = crossfade.duration.as_secs_f64(),
                            applied_secs = limit.as_secs_f64(),
                            "Crossfade longer than adjacent clip, clamping this join"
                        );
                        warnings.push(ClampWarning {
                            index,
                            requested: crossfade.duration,
                            applied: limit,
                        });
                        limit
                    } else {
                        crossfade.duration
                    }
                } else {
                    Duration::ZERO
                };

                joins.push(JoinSpec {
                    crossfade: overlap,
                    curve: crossfade.curve,
                });
                prev.end.saturating_sub(overlap)
            }
        };

        entries.push(TimelineEntry {
            index,
            clip_path: clip_path.clone(),
            duration,
            start,
            end: start + duration,
        });
    }

    let total_duration = entries.last().map_or(Duration::ZERO, |last| last.end);
    let clips = entries.iter().map(|entry| entry.clip_path.clone()).collect();

    Ok(AssemblyPlan {
        concat: ConcatPlan { clips, joins },
        entries,
        total_duration,
        warnings,
    })
}
