//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、ClipStore、AudioConcat、ProgressReporter）
//! - dispatcher: 并发合成调度
//! - commands: 命令及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod dispatcher;
pub mod error;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use commands::{handlers::GenerateAudiobookHandler, GenerateAudiobook};
pub use dispatcher::{
    CacheProbe, DispatchConfig, DispatchReport, SynthesisContext, SynthesisDispatcher,
};
pub use error::ApplicationError;
pub use ports::{
    clip_exists, clip_file_name, AudioConcatPort, ClipStoreError, ClipStorePort, MixError,
    MixedAudioInfo, ProgressEvent, ProgressReporterPort, PromptHandle, PromptUpload,
    StoredClip, SynthesisOptions, SynthesisRequest, TtsEnginePort, TtsError,
};
