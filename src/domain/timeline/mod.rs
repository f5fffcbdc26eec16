//! Timeline Context - 时间轴上下文
//!
//! 合成结果 → 拼接计划 + 时间戳 + 字幕

mod assembler;
mod crossfade;
mod entities;
mod errors;
mod subtitles;

pub use assembler::{assemble, AssemblyPlan, ClampWarning, ConcatPlan, JoinSpec};
pub use crossfade::{CrossfadeCurve, CrossfadeSpec};
pub use entities::{ClipSource, OutcomeCounts, RunSummary, SynthesisOutcome, TimelineEntry};
pub use errors::AssemblyError;
pub use subtitles::{build_cues, format_srt_time, render_srt, SubtitleCue};
