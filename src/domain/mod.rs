//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Segment Context: 文本分段
//! - Timeline Context: 时间轴组装与字幕

pub mod segment;
pub mod timeline;
