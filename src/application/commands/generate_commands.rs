//! Generate Commands - 有声书生成命令

use std::path::PathBuf;

use crate::application::dispatcher::DispatchConfig;
use crate::application::ports::PromptUpload;
use crate::domain::segment::{Language, SegmentConfig};
use crate::domain::timeline::CrossfadeSpec;

/// 生成有声书命令
///
/// 片段输出目录与文件名前缀由 `ClipStorePort` 实现决定
#[derive(Debug, Clone)]
pub struct GenerateAudiobook {
    /// 原始输入文本（未预处理）
    pub text: String,
    pub prompt: PromptUpload,
    /// 提示音对应的文本
    pub prompt_text: String,
    /// 目标语言，None 时不加语言标记
    pub language: Option<Language>,
    pub prompt_language: Option<Language>,
    pub add_end_silence: bool,
    pub segment: SegmentConfig,
    pub dispatch: DispatchConfig,
    pub crossfade: CrossfadeSpec,
    /// 最终音频路径
    pub output_wav: PathBuf,
    /// 字幕路径，None 时不生成字幕
    pub output_srt: Option<PathBuf>,
}
