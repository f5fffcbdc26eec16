//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_mixer;
mod clip_store;
mod progress;
mod tts_engine;

pub use audio_mixer::{AudioConcatPort, MixError, MixedAudioInfo};
pub use clip_store::{clip_exists, clip_file_name, ClipStoreError, ClipStorePort, StoredClip};
pub use progress::{ProgressEvent, ProgressReporterPort};
pub use tts_engine::{
    PromptHandle, PromptUpload, SynthesisOptions, SynthesisRequest, TtsEnginePort, TtsError,
};
