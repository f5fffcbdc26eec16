//! Utterflow - 长文本零样本语音合成流水线
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Segment Context: 文本预处理与分段
//! - Timeline Context: 时间轴组装、交叉淡化、字幕
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, ClipStore, AudioConcat, ProgressReporter）
//! - Dispatcher: 并发、重试、保序的合成调度
//! - Commands: 生成命令及处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP/Fake TTS Client、文件片段存储、WAV 混音
//! - Events: 进度事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
