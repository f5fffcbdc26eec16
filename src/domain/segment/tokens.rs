//! Token 计数
//!
//! 这里的 token 只用于估算合成时长，不是模型分词器的 token：
//! - 每个汉字计 1
//! - 每个非汉字单词（连续的字母/数字）计 1.5，总数向下取整

/// 检查是否为汉字（CJK 统一表意文字）
#[inline]
pub fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() && !is_cjk(ch)
}

/// 统计单词数量（连续非汉字字母数字为一个单词）
fn count_words(text: &str) -> usize {
    let mut words = 0;
    let mut in_word = false;

    for ch in text.chars() {
        if is_word_char(ch) {
            if !in_word {
                words += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }

    words
}

/// 计算文本的 token 数
pub fn count_tokens(text: &str) -> usize {
    let cjk = text.chars().filter(|&c| is_cjk(c)).count();
    cjk + count_words(text) * 3 / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chinese_only() {
        assert_eq!(count_tokens("你好"), 2);
        assert_eq!(count_tokens("一二三四五"), 5);
    }

    #[test]
    fn test_english_only() {
        assert_eq!(count_tokens("hello"), 1);
        assert_eq!(count_tokens("hello world"), 3);
        assert_eq!(count_tokens("one two three four"), 6);
    }

    #[test]
    fn test_mixed() {
        assert_eq!(count_tokens("你好world"), 3);
        assert_eq!(count_tokens("ká-sú我們"), 5);
    }

    #[test]
    fn test_punctuation_is_free() {
        assert_eq!(count_tokens("，。！？"), 0);
        assert_eq!(count_tokens(""), 0);
    }
}
