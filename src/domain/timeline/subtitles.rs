//! SRT 字幕生成

use std::time::Duration;

use super::entities::TimelineEntry;
use super::errors::AssemblyError;
use crate::domain::segment::Segment;

/// 单条字幕
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    /// 从 1 开始的连续序号
    pub number: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// 格式化为 SRT 时间 `HH:MM:SS,mmm`（毫秒四舍五入）
pub fn format_srt_time(time: Duration) -> String {
    let total_millis = (time.as_nanos() + 500_000) / 1_000_000;
    let millis = total_millis % 1000;
    let total_secs = total_millis / 1000;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// 每个时间轴条目生成一条字幕，文本取自对应片段
pub fn build_cues(
    entries: &[TimelineEntry],
    segments: &[Segment],
) -> Result<Vec<SubtitleCue>, AssemblyError> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let segment = segments
                .get(entry.index)
                .ok_or(AssemblyError::MissingSegment { index: entry.index })?;
            Ok(SubtitleCue {
                number: i + 1,
                start: entry.start,
                end: entry.end,
                text: segment.text.clone(),
            })
        })
        .collect()
}

pub fn render_srt(cues: &[SubtitleCue]) -> String {
    cues.iter()
        .map(|cue| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                cue.number,
                format_srt_time(cue.start),
                format_srt_time(cue.end),
                cue.text
            )
        })
        .collect()
}
