//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod audio;
pub mod storage;
pub mod tts;

pub use audio::WavMixer;
pub use storage::FileClipStore;
pub use tts::*;
