//! 文本分割器
//!
//! 按标点把长文本切成适合单次合成的片段，sentence 模式下可按 token 预算
//! 细分与合并：
//! 1. 按句末标点切分
//! 2. 超出上限的片段按分句标点切分，仍超出则按字符强制切分
//! 3. 贪心合并相邻片段，合并后不超过上限
//! 4. 低于下限的片段并入相邻片段，末尾片段并入前一个片段

use super::errors::SegmentError;
use super::tokens::{count_tokens, is_cjk};
use super::value_objects::{Segment, SegmentConfig, SegmentMode, TokenBounds};

/// 句末标点（总是分割）
#[inline]
fn is_terminal_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '.' | '？' | '?' | '！' | '!')
}

/// 分句标点（clause 模式或超长片段时分割）
#[inline]
fn is_clause_delimiter(ch: char) -> bool {
    matches!(ch, '，' | ',' | '、' | '；' | ';')
}

#[inline]
fn is_any_delimiter(ch: char) -> bool {
    is_terminal_delimiter(ch) || is_clause_delimiter(ch)
}

/// 按分隔符切分，分隔符本身被丢弃
fn split_dropping(text: &str, is_delimiter: impl Fn(char) -> bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if is_delimiter(ch) {
            push_trimmed(&mut pieces, &mut current);
        } else {
            current.push(ch);
        }
    }
    push_trimmed(&mut pieces, &mut current);

    pieces
}

/// 按分隔符切分，分隔符保留在左侧片段末尾
fn split_keeping(text: &str, is_delimiter: impl Fn(char) -> bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if is_delimiter(ch) {
            push_trimmed(&mut pieces, &mut current);
        }
    }
    push_trimmed(&mut pieces, &mut current);

    pieces
}

fn push_trimmed(pieces: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
    current.clear();
}

/// 两个汉字之间的空白视为边界（例如 "大哉大悟大聖主　　無垢無染無所著"）
fn split_cjk_spaces(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if !ch.is_whitespace() {
            current.push(ch);
            i += 1;
            continue;
        }

        let run_end = chars[i..]
            .iter()
            .position(|c| !c.is_whitespace())
            .map_or(chars.len(), |offset| i + offset);

        let between_cjk =
            i > 0 && is_cjk(chars[i - 1]) && run_end < chars.len() && is_cjk(chars[run_end]);
        if between_cjk {
            push_trimmed(&mut lines, &mut current);
        } else {
            current.extend(&chars[i..run_end]);
        }
        i = run_end;
    }
    push_trimmed(&mut lines, &mut current);

    lines
}

/// 拼接两个片段，两侧都是非汉字字符时补一个空格
fn join_pieces(left: &str, right: &str) -> String {
    let needs_space = match (left.chars().last(), right.chars().next()) {
        (Some(a), Some(b)) => {
            !is_cjk(a) && !is_cjk(b) && !a.is_whitespace() && !b.is_whitespace()
        }
        _ => false,
    };

    if needs_space {
        format!("{} {}", left, right)
    } else {
        format!("{}{}", left, right)
    }
}

/// 去掉开头的任意标点和结尾的分句标点
fn strip_edge_punctuation(text: &str) -> String {
    text.trim()
        .trim_start_matches(|c: char| is_any_delimiter(c) || c.is_whitespace())
        .trim_end_matches(|c: char| is_clause_delimiter(c) || c.is_whitespace())
        .to_string()
}

/// 按字符强制切分，每段不超过 `max_tokens`
///
/// 当前片段内有空白时优先在最后一个空白处断开，避免切断单词
fn force_split(text: &str, max_tokens: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if current.chars().count() < 2 || count_tokens(&current) <= max_tokens {
            continue;
        }

        current.pop();
        let carry = match current.rfind(char::is_whitespace) {
            Some(pos) if !current[..pos].trim().is_empty() => {
                let tail = current[pos..].trim_start().to_string();
                current.truncate(pos);
                tail
            }
            _ => String::new(),
        };
        push_trimmed(&mut pieces, &mut current);
        current.push_str(&carry);
        current.push(ch);
    }
    push_trimmed(&mut pieces, &mut current);

    pieces
}

/// 保证片段不超过上限：先按分句标点，再按字符
fn ensure_max_tokens(chunk: String, max_tokens: usize) -> Vec<String> {
    if count_tokens(&chunk) <= max_tokens {
        return vec![chunk];
    }

    split_keeping(&chunk, is_clause_delimiter)
        .into_iter()
        .flat_map(|clause| {
            if count_tokens(&clause) > max_tokens {
                force_split(&clause, max_tokens)
            } else {
                vec![clause]
            }
        })
        .collect()
}

/// 贪心合并相邻片段
fn merge_greedy(pieces: Vec<String>, max_tokens: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(pieces.len());

    for piece in pieces {
        if let Some(last) = merged.last_mut() {
            let candidate = join_pieces(last, &piece);
            if count_tokens(&candidate) <= max_tokens {
                *last = candidate;
                continue;
            }
        }
        merged.push(piece);
    }

    merged
}

/// 低于下限的片段并入较短的一侧相邻片段，即使合并后超过上限
///
/// 末尾片段只能向前合并；只有一个片段时保持不变
fn merge_short_pieces(pieces: Vec<String>, min_tokens: usize) -> Vec<String> {
    if pieces.len() < 2 {
        return pieces;
    }

    let mut merged: Vec<String> = Vec::with_capacity(pieces.len());
    let mut carry: Option<String> = None;
    let mut iter = pieces.into_iter().peekable();

    while let Some(piece) = iter.next() {
        let piece = match carry.take() {
            Some(short) => join_pieces(&short, &piece),
            None => piece,
        };
        if count_tokens(&piece) >= min_tokens {
            merged.push(piece);
            continue;
        }

        let backward = merged
            .last()
            .map(|last| count_tokens(&join_pieces(last, &piece)));
        let forward = iter
            .peek()
            .map(|next| count_tokens(&join_pieces(&piece, next)));

        match (backward, forward) {
            (Some(back), Some(fwd)) if fwd < back => carry = Some(piece),
            (None, Some(_)) => carry = Some(piece),
            (Some(_), _) => {
                if let Some(last) = merged.last_mut() {
                    *last = join_pieces(last, &piece);
                }
            }
            (None, None) => merged.push(piece),
        }
    }

    merged
}

fn refine_by_tokens(chunks: Vec<String>, bounds: TokenBounds) -> Vec<String> {
    let pieces: Vec<String> = chunks
        .into_iter()
        .flat_map(|chunk| ensure_max_tokens(chunk, bounds.max))
        .collect();

    merge_short_pieces(merge_greedy(pieces, bounds.max), bounds.min)
}

/// 对文本进行分段
///
/// 返回的片段索引从 0 开始连续递增，顺序与原文一致
pub fn segment_text(text: &str, config: &SegmentConfig) -> Result<Vec<Segment>, SegmentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let chunks = match config.mode {
        SegmentMode::Raw => vec![trimmed.to_string()],
        SegmentMode::Sentence | SegmentMode::Clause => {
            let lines = if config.split_on_cjk_spaces {
                split_cjk_spaces(trimmed)
            } else {
                vec![trimmed.to_string()]
            };

            let chunks: Vec<String> = if config.mode == SegmentMode::Clause {
                lines
                    .iter()
                    .flat_map(|line| split_dropping(line, is_any_delimiter))
                    .collect()
            } else {
                lines
                    .iter()
                    .flat_map(|line| split_dropping(line, is_terminal_delimiter))
                    .collect()
            };

            let chunks = match (config.mode, config.bounds) {
                (SegmentMode::Sentence, Some(bounds)) => refine_by_tokens(chunks, bounds),
                _ => chunks,
            };

            chunks
                .iter()
                .map(|chunk| strip_edge_punctuation(chunk))
                .collect()
        }
    };

    let texts: Vec<String> = chunks.into_iter().filter(|c| !c.trim().is_empty()).collect();
    if texts.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let last = texts.len() - 1;
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment::new(index, text, index == last))
        .collect())
}
