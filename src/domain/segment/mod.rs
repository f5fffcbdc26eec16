//! Segment Context - 文本分段上下文
//!
//! 输入文本 → 有序的合成片段，纯函数，无 I/O

mod errors;
mod preprocess;
mod segmenter;
mod tokens;
mod value_objects;

pub use errors::SegmentError;
pub use preprocess::preprocess_text;
pub use segmenter::segment_text;
pub use tokens::{count_tokens, is_cjk};
pub use value_objects::{Language, Segment, SegmentConfig, SegmentMode, TokenBounds};
