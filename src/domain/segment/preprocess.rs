//! 文本预处理
//!
//! 去除行号前缀（形如 `   12→`），去掉空行，按空格拼接为单行文本

use regex::Regex;
use std::sync::OnceLock;

fn line_number_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\d+→").expect("valid line number pattern"))
}

pub fn preprocess_text(text: &str) -> String {
    text.lines()
        .map(|line| line_number_prefix().replace(line, ""))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
