//! WAV Mixer - 基于 symphonia 的片段拼接器
//!
//! 解码所有片段，按第一个片段的采样率与声道数统一格式，
//! 在每个拼接点按计划做交叉淡化，输出 16-bit PCM WAV

use async_trait::async_trait;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::wav::{encode_pcm16, frames_to_duration};
use crate::application::ports::{AudioConcatPort, MixError, MixedAudioInfo};
use crate::domain::timeline::{ConcatPlan, JoinSpec};

/// 解码后的 PCM 数据（交错 f32）
#[derive(Debug, Clone)]
pub(crate) struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

/// 原生 WAV 拼接器
#[derive(Debug, Default, Clone)]
pub struct WavMixer;

impl WavMixer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioConcatPort for WavMixer {
    async fn concat(&self, plan: &ConcatPlan, output: &Path) -> Result<MixedAudioInfo, MixError> {
        if plan.clips.is_empty() {
            return Err(MixError::EmptyPlan);
        }

        let mut clips = Vec::with_capacity(plan.clips.len());
        for path in &plan.clips {
            let data = tokio::fs::read(path).await?;
            clips.push((path.clone(), data));
        }

        // 单个片段也走解码路径，保证输出格式一致
        let joins = plan.joins.clone();
        let mixed = tokio::task::spawn_blocking(move || mix_clips(&clips, &joins))
            .await
            .map_err(|e| MixError::IoError(format!("mix task failed: {}", e)))??;

        let wav = encode_pcm16(&mixed.samples, mixed.sample_rate, mixed.channels);
        write_atomic(output, &wav).await?;

        let duration = frames_to_duration(mixed.frames() as u64, mixed.sample_rate);
        tracing::debug!(
            path = %output.display(),
            clips = plan.clips.len(),
            duration_secs = duration.as_secs_f64(),
            "Clips mixed"
        );

        Ok(MixedAudioInfo {
            path: output.to_path_buf(),
            duration,
            sample_rate: mixed.sample_rate,
            channels: mixed.channels,
        })
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), MixError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".part");
    let temp = PathBuf::from(temp);

    let result = match tokio::fs::write(&temp, data).await {
        Ok(()) => tokio::fs::rename(&temp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

fn mix_clips(clips: &[(PathBuf, Vec<u8>)], joins: &[JoinSpec]) -> Result<DecodedAudio, MixError> {
    let mut iter = clips.iter();
    let (first_path, first_data) = iter.next().ok_or(MixError::EmptyPlan)?;
    let mut mixed = decode_wav(first_data).map_err(|message| MixError::DecodingError {
        path: first_path.clone(),
        message,
    })?;
    let sample_rate = mixed.sample_rate;
    let channels = mixed.channels;

    for (i, (path, data)) in iter.enumerate() {
        let decoded = decode_wav(data).map_err(|message| MixError::DecodingError {
            path: path.clone(),
            message,
        })?;
        let clip = conform(decoded, sample_rate, channels)?;
        let join = joins.get(i).copied();
        append_with_crossfade(&mut mixed.samples, &clip.samples, channels, sample_rate, join);
    }

    Ok(mixed)
}

/// 使用 symphonia 解码 WAV 获取 PCM 数据
pub(crate) fn decode_wav(data: &[u8]) -> Result<DecodedAudio, String> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Probe failed: {}", e))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| "No audio track found".to_string())?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| "Unknown sample rate".to_string())?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| "Unknown channel count".to_string())?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("Decoder creation failed: {}", e))?;

    let mut samples: Vec<f32> = Vec::new();
    let track_id = track.id;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(format!("Packet read error: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let actual_samples = num_frames * spec.channels.count();
        samples.extend(&sample_buf.samples()[..actual_samples]);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// 统一采样率与声道数
fn conform(audio: DecodedAudio, sample_rate: u32, channels: u16) -> Result<DecodedAudio, MixError> {
    let audio = match (audio.channels, channels) {
        (from, to) if from == to => audio,
        (1, to) => DecodedAudio {
            samples: audio
                .samples
                .iter()
                .flat_map(|&s| std::iter::repeat(s).take(to as usize))
                .collect(),
            sample_rate: audio.sample_rate,
            channels: to,
        },
        (from, 1) => DecodedAudio {
            samples: audio
                .samples
                .chunks(from as usize)
                .map(|frame| frame.iter().sum::<f32>() / from as f32)
                .collect(),
            sample_rate: audio.sample_rate,
            channels: 1,
        },
        (from, to) => {
            return Err(MixError::FormatMismatch(format!(
                "cannot mix {} channel clip into {} channel output",
                from, to
            )))
        }
    };

    if audio.sample_rate == sample_rate {
        return Ok(audio);
    }

    tracing::debug!(
        from = audio.sample_rate,
        to = sample_rate,
        "Resampling clip"
    );
    Ok(DecodedAudio {
        samples: resample(&audio.samples, audio.sample_rate, sample_rate, channels),
        sample_rate,
        channels,
    })
}

/// 简单线性重采样
fn resample(samples: &[f32], from_rate: u32, to_rate: u32, channels: u16) -> Vec<f32> {
    let channel_count = channels as usize;
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 {
        return Vec::new();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_frame_count = (frame_count as f64 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        for ch in 0..channel_count {
            let idx0 = src_idx.min(frame_count - 1) * channel_count + ch;
            let idx1 = (src_idx + 1).min(frame_count - 1) * channel_count + ch;
            let s0 = samples[idx0];
            let s1 = samples[idx1];
            resampled.push(s0 + (s1 - s0) * frac);
        }
    }

    resampled
}

/// 追加片段，拼接点重叠部分按曲线淡出前段、淡入后段
fn append_with_crossfade(
    mixed: &mut Vec<f32>,
    clip: &[f32],
    channels: u16,
    sample_rate: u32,
    join: Option<JoinSpec>,
) {
    let channel_count = channels as usize;
    let overlap_frames = join
        .map(|j| (j.crossfade.as_secs_f64() * sample_rate as f64).round() as usize)
        .unwrap_or(0)
        .min(mixed.len() / channel_count)
        .min(clip.len() / channel_count);

    let Some(join) = join.filter(|_| overlap_frames > 0) else {
        mixed.extend_from_slice(clip);
        return;
    };

    let tail_start = mixed.len() - overlap_frames * channel_count;
    for frame in 0..overlap_frames {
        let t = (frame as f64 + 0.5) / overlap_frames as f64;
        let fade_in = join.curve.gain(t) as f32;
        let fade_out = join.curve.gain(1.0 - t) as f32;
        for ch in 0..channel_count {
            let offset = frame * channel_count + ch;
            let prev = mixed[tail_start + offset];
            mixed[tail_start + offset] = prev * fade_out + clip[offset] * fade_in;
        }
    }
    mixed.extend_from_slice(&clip[overlap_frames * channel_count..]);
}
