//! Segment Context - 值对象定义

use serde::{Deserialize, Serialize};

use super::errors::SegmentError;

/// 一条待合成的文本片段
///
/// 片段创建后不可修改，`index` 决定最终拼接顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    /// 是否为输入文本的最后一个片段
    pub is_end_of_input: bool,
}

impl Segment {
    pub fn new(index: usize, text: impl Into<String>, is_end_of_input: bool) -> Self {
        Self {
            index,
            text: text.into(),
            is_end_of_input,
        }
    }
}

/// 分段模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMode {
    /// 不分割，整段文本作为一个片段
    Raw,
    /// 按句末标点分割
    #[default]
    Sentence,
    /// 按句末标点 + 分句标点分割
    Clause,
}

impl SegmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentMode::Raw => "raw",
            SegmentMode::Sentence => "sentence",
            SegmentMode::Clause => "clause",
        }
    }
}

impl std::fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SegmentMode {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(SegmentMode::Raw),
            "sentence" => Ok(SegmentMode::Sentence),
            "clause" => Ok(SegmentMode::Clause),
            _ => Err(SegmentError::UnknownMode(s.to_string())),
        }
    }
}

/// Token 预算（仅在 sentence 模式下生效）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBounds {
    /// 软下限：低于此值的片段会被合并到相邻片段
    pub min: usize,
    /// 硬上限：超过此值的片段会被继续切分
    pub max: usize,
}

impl TokenBounds {
    pub fn new(min: usize, max: usize) -> Result<Self, SegmentError> {
        if max == 0 || min > max {
            return Err(SegmentError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }
}

/// 文本分割配置
#[derive(Debug, Clone, Default)]
pub struct SegmentConfig {
    pub mode: SegmentMode,
    pub bounds: Option<TokenBounds>,
    /// 两个汉字之间的空白（含全角空格）视为句子边界
    pub split_on_cjk_spaces: bool,
}

impl SegmentConfig {
    pub fn new(mode: SegmentMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, bounds: TokenBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_cjk_space_split(mut self, enabled: bool) -> Self {
        self.split_on_cjk_spaces = enabled;
        self
    }
}

/// 合成语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// 中文
    Zh,
    /// 台语（闽南语）
    Nan,
    /// 英文
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::Nan => "nan",
            Language::En => "en",
        }
    }

    /// 模型使用的语言标记，例如 `<|zh|>`
    pub fn tag(&self) -> String {
        format!("<|{}|>", self.as_str())
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" => Ok(Language::Zh),
            "nan" => Ok(Language::Nan),
            "en" => Ok(Language::En),
            _ => Err(SegmentError::UnknownLanguage(s.to_string())),
        }
    }
}
