//! WAV (RIFF) 工具函数
//!
//! TTS 服务以流式方式返回 WAV 时，RIFF 与 data 块的长度字段可能是占位值
//! （0 或 0xFFFFFFFF），此时以实际字节数为准

use std::time::Duration;
use thiserror::Error;

const HEADER_LEN: usize = 12;
const STREAMING_SIZE: u32 = u32::MAX;

#[derive(Debug, Error, PartialEq)]
pub enum WavError {
    #[error("WAV data too short")]
    TooShort,

    #[error("Invalid WAV: missing RIFF header")]
    MissingRiff,

    #[error("Invalid WAV: missing WAVE identifier")]
    MissingWave,

    #[error("Invalid WAV: missing fmt chunk")]
    MissingFmt,

    #[error("Invalid WAV: missing data chunk")]
    MissingData,

    #[error("Invalid fmt chunk: {0}")]
    InvalidFmt(String),
}

/// fmt 块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

/// 解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavLayout {
    pub format: WavFormat,
    /// data 块长度字段的偏移
    pub data_size_offset: usize,
    /// PCM 数据起始偏移
    pub data_start: usize,
    /// 实际可用的 PCM 字节数（整帧）
    pub data_len: usize,
    /// data 块声明的长度与实际不符
    pub streaming: bool,
}

impl WavLayout {
    pub fn frames(&self) -> usize {
        self.data_len / self.format.block_align as usize
    }

    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frames() as u64, self.format.sample_rate)
    }
}

pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = frames as u128 * 1_000_000_000 / sample_rate as u128;
    Duration::from_nanos(nanos as u64)
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// 解析 WAV 文件头
pub fn parse_wav(data: &[u8]) -> Result<WavLayout, WavError> {
    if data.len() < HEADER_LEN + 8 {
        return Err(WavError::TooShort);
    }
    if &data[0..4] != b"RIFF" {
        return Err(WavError::MissingRiff);
    }
    if &data[8..12] != b"WAVE" {
        return Err(WavError::MissingWave);
    }

    let mut pos = HEADER_LEN;
    let mut format: Option<WavFormat> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4);
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(WavError::InvalidFmt(format!("chunk size {}", chunk_size)));
                }
                let fmt = WavFormat {
                    audio_format: read_u16(data, body),
                    channels: read_u16(data, body + 2),
                    sample_rate: read_u32(data, body + 4),
                    byte_rate: read_u32(data, body + 8),
                    block_align: read_u16(data, body + 12),
                    bits_per_sample: read_u16(data, body + 14),
                };
                if fmt.channels == 0 || fmt.sample_rate == 0 || fmt.block_align == 0 {
                    return Err(WavError::InvalidFmt(format!(
                        "channels={} sample_rate={} block_align={}",
                        fmt.channels, fmt.sample_rate, fmt.block_align
                    )));
                }
                format = Some(fmt);
            }
            b"data" => {
                let format = format.ok_or(WavError::MissingFmt)?;
                let available = data.len() - body;
                let declared = chunk_size as usize;
                let streaming =
                    chunk_size == STREAMING_SIZE || chunk_size == 0 || declared > available;
                let raw_len = if streaming { available } else { declared };
                let block_align = format.block_align as usize;

                return Ok(WavLayout {
                    format,
                    data_size_offset: pos + 4,
                    data_start: body,
                    data_len: raw_len - raw_len % block_align,
                    streaming,
                });
            }
            _ => {}
        }

        // 块长度为奇数时按偶数字节对齐
        pos = body
            .saturating_add(chunk_size as usize)
            .saturating_add((chunk_size % 2) as usize);
    }

    match format {
        Some(_) => Err(WavError::MissingData),
        None => Err(WavError::MissingFmt),
    }
}

/// 修正长度字段并去掉不完整的尾帧
///
/// data 块之后的其他块一并丢弃
pub fn normalize_wav(data: &[u8]) -> Result<Vec<u8>, WavError> {
    let layout = parse_wav(data)?;
    let end = layout.data_start + layout.data_len;
    let mut wav = data[..end].to_vec();
    patch_sizes(&mut wav, &layout, layout.data_len);
    Ok(wav)
}

fn patch_sizes(wav: &mut [u8], layout: &WavLayout, data_len: usize) {
    let riff_size = (layout.data_start - 8 + data_len) as u32;
    wav[4..8].copy_from_slice(&riff_size.to_le_bytes());
    wav[layout.data_size_offset..layout.data_size_offset + 4]
        .copy_from_slice(&(data_len as u32).to_le_bytes());
}

/// 在首尾补齐静音
pub fn pad_silence(data: &[u8], start: Duration, end: Duration) -> Result<Vec<u8>, WavError> {
    let layout = parse_wav(data)?;
    if start.is_zero() && end.is_zero() {
        return normalize_wav(data);
    }

    let format = layout.format;
    // 8-bit PCM 为无符号，静音是 0x80
    let silence = if format.bits_per_sample == 8 { 0x80 } else { 0 };
    let frame_bytes = format.block_align as usize;
    let start_bytes = duration_to_frames(start, format.sample_rate) * frame_bytes;
    let end_bytes = duration_to_frames(end, format.sample_rate) * frame_bytes;
    let data_len = start_bytes + layout.data_len + end_bytes;

    let mut wav = Vec::with_capacity(layout.data_start + data_len);
    wav.extend_from_slice(&data[..layout.data_start]);
    wav.resize(layout.data_start + start_bytes, silence);
    wav.extend_from_slice(&data[layout.data_start..layout.data_start + layout.data_len]);
    wav.resize(layout.data_start + data_len, silence);
    patch_sizes(&mut wav, &layout, data_len);
    Ok(wav)
}

fn duration_to_frames(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// 将交错的 f32 样本编码为 16-bit PCM WAV
pub fn encode_pcm16(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = samples.len() * 2;

    let mut wav = Vec::with_capacity(44 + data_size);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        wav.extend_from_slice(&value.to_le_bytes());
    }

    wav
}

/// 生成指定时长的静音 WAV
pub fn silent_wav(duration: Duration, sample_rate: u32) -> Vec<u8> {
    let frames = duration_to_frames(duration, sample_rate);
    encode_pcm16(&vec![0.0; frames], sample_rate, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_second_mono() -> Vec<u8> {
        encode_pcm16(&vec![0.25; 16_000], 16_000, 1)
    }

    #[test]
    fn test_parse_canonical() {
        let wav = one_second_mono();
        let layout = parse_wav(&wav).unwrap();

        assert_eq!(layout.format.sample_rate, 16_000);
        assert_eq!(layout.format.channels, 1);
        assert_eq!(layout.format.bits_per_sample, 16);
        assert_eq!(layout.data_start, 44);
        assert_eq!(layout.data_len, 32_000);
        assert!(!layout.streaming);
        assert_eq!(layout.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_streaming_header_uses_actual_size() {
        let mut wav = one_second_mono();
        wav[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        wav[40..44].copy_from_slice(&u32::MAX.to_le_bytes());

        let layout = parse_wav(&wav).unwrap();
        assert!(layout.streaming);
        assert_eq!(layout.duration(), Duration::from_secs(1));

        let fixed = normalize_wav(&wav).unwrap();
        assert_eq!(read_u32(&fixed, 4), 36 + 32_000);
        assert_eq!(read_u32(&fixed, 40), 32_000);
        assert!(!parse_wav(&fixed).unwrap().streaming);
    }

    #[test]
    fn test_truncated_tail_frame_dropped() {
        let mut wav = encode_pcm16(&vec![0.0; 100], 8_000, 2);
        wav.push(0x01);
        wav[40..44].copy_from_slice(&0u32.to_le_bytes());

        let layout = parse_wav(&wav).unwrap();
        assert_eq!(layout.data_len, 200);
        assert_eq!(layout.frames(), 50);
        assert_eq!(normalize_wav(&wav).unwrap().len(), 44 + 200);
    }

    #[test]
    fn test_skips_unknown_chunks() {
        let canonical = one_second_mono();
        let mut wav = canonical[..36].to_vec();
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&3u32.to_le_bytes());
        wav.extend_from_slice(&[1, 2, 3, 0]); // 奇数长度 + 对齐字节
        wav.extend_from_slice(&canonical[36..]);

        let layout = parse_wav(&wav).unwrap();
        assert_eq!(layout.data_start, 56);
        assert_eq!(layout.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_wav(b"RIFF"), Err(WavError::TooShort));
        assert_eq!(
            parse_wav(b"{\"error\":\"internal server error\"}"),
            Err(WavError::MissingRiff)
        );

        let mut no_data = one_second_mono();
        no_data.truncate(36);
        no_data.extend_from_slice(b"junk\0\0\0\0");
        assert_eq!(parse_wav(&no_data), Err(WavError::MissingData));
    }

    #[test]
    fn test_pad_silence() {
        let wav = one_second_mono();
        let padded = pad_silence(&wav, Duration::from_millis(500), Duration::from_millis(250)).unwrap();
        let layout = parse_wav(&padded).unwrap();

        assert_eq!(layout.duration(), Duration::from_millis(1750));
        // 开头为静音，随后是原始数据
        assert_eq!(&padded[44..46], &[0, 0]);
        let first_original = 44 + 8_000 * 2;
        assert_eq!(&padded[first_original..first_original + 2], &wav[44..46]);
    }

    #[test]
    fn test_silent_wav() {
        let wav = silent_wav(Duration::from_millis(1500), 24_000);
        assert_eq!(parse_wav(&wav).unwrap().duration(), Duration::from_millis(1500));
    }
}
