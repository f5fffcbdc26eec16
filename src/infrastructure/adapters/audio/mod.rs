//! Audio Adapter - WAV 处理与拼接

pub mod wav;
mod wav_mixer;

pub use wav::WavError;
pub use wav_mixer::WavMixer;
