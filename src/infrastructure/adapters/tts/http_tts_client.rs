//! HTTP TTS Client - 调用零样本语音克隆 HTTP 服务
//!
//! 实现 TtsEnginePort trait
//!
//! 外部 API:
//! 1. POST {presign_url} {"contentType": "..."} → {"assetKey": "...", "formData": {...}}
//! 2. POST {upload_url} multipart(formData + file) → 204
//! 3. POST {api_url} JSON (X-API-Key) → audio/wav binary

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::application::ports::{
    PromptHandle, PromptUpload, SynthesisRequest, TtsEnginePort, TtsError,
};
use crate::infrastructure::adapters::audio::wav::pad_silence;

/// 结尾静音标记，避免模型过早截断句尾
const END_SILENCE_TAG: &str = "<|sil_200ms|>";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresignRequest<'a> {
    content_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresignResponse {
    asset_key: String,
    #[serde(default)]
    form_data: HashMap<String, serde_json::Value>,
}

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZeroShotRequest<'a> {
    input: ZeroShotInput<'a>,
    model_config: ModelConfig<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZeroShotInput<'a> {
    text: String,
    #[serde(rename = "type")]
    kind: &'static str,
    prompt_voice_url: &'a str,
    prompt_voice_asset_key: &'a str,
    prompt_text: String,
}

#[derive(Debug, Serialize)]
struct ModelConfig<'a> {
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioConfig {
    encoding: &'static str,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// 合成接口
    pub api_url: String,
    /// 上传预签名接口
    pub presign_url: String,
    /// 资源上传地址
    pub upload_url: String,
    pub api_key: String,
    pub model_id: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://ent.fedgpt.cc/api/asura/v1/speeches:zero-shot".to_string(),
            presign_url: "https://ent.fedgpt.cc/api/asura/v1/transcriptions:presign".to_string(),
            upload_url: "https://ent.fedgpt.cc/asset/".to_string(),
            api_key: String::new(),
            model_id: "tts-general-0.0.1".to_string(),
            timeout_secs: 120,
        }
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn presign(&self, content_type: &str) -> Result<PresignResponse, TtsError> {
        let response = self
            .client
            .post(&self.config.presign_url)
            .header("X-API-Key", &self.config.api_key)
            .json(&PresignRequest { content_type })
            .send()
            .await
            .map_err(map_send_error)?;

        let response = ensure_status(response, |s| s.is_success()).await?;
        response
            .json::<PresignResponse>()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Invalid presign response: {}", e)))
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn upload_prompt(&self, upload: PromptUpload) -> Result<PromptHandle, TtsError> {
        let raw = tokio::fs::read(&upload.audio_path).await.map_err(|e| {
            TtsError::InvalidPrompt(format!("{}: {}", upload.audio_path.display(), e))
        })?;

        let is_wav = raw.starts_with(b"RIFF");
        let audio = if upload.start_silence.is_zero() && upload.end_silence.is_zero() {
            raw
        } else if is_wav {
            tracing::info!(
                start_secs = upload.start_silence.as_secs_f64(),
                end_secs = upload.end_silence.as_secs_f64(),
                "Padding prompt audio with silence"
            );
            pad_silence(&raw, upload.start_silence, upload.end_silence)
                .map_err(|e| TtsError::InvalidPrompt(e.to_string()))?
        } else {
            tracing::warn!(
                path = %upload.audio_path.display(),
                "Silence padding only supported for WAV prompts, uploading unchanged"
            );
            raw
        };

        let content_type = if is_wav { "audio/wav" } else { "audio/mpeg" };
        let presigned = self.presign(content_type).await?;
        tracing::debug!(asset_key = %presigned.asset_key, "Prompt upload presigned");

        let file_name = upload
            .audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "prompt.wav".to_string());

        let mut form = Form::new();
        for (key, value) in presigned.form_data {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            form = form.text(key, value);
        }
        let part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|e| TtsError::InvalidPrompt(e.to_string()))?;
        form = form.part("file", part);

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_status(response, |s| s.as_u16() == 204).await?;

        Ok(PromptHandle {
            url: String::new(),
            asset_key: presigned.asset_key,
        })
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>, TtsError> {
        let (text, prompt_text) = compose_texts(&request);
        let body = ZeroShotRequest {
            input: ZeroShotInput {
                text,
                kind: "text",
                prompt_voice_url: &request.prompt.url,
                prompt_voice_asset_key: &request.prompt.asset_key,
                prompt_text,
            },
            model_config: ModelConfig {
                model: &self.config.model_id,
            },
            audio_config: AudioConfig {
                encoding: "LINEAR16",
            },
        };

        tracing::debug!(
            index = request.segment.index,
            text_len = body.input.text.len(),
            "Sending zero-shot synthesis request"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .header("X-API-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = ensure_status(response, |s| s.is_success()).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        tracing::debug!(
            index = request.segment.index,
            audio_size = audio.len(),
            "Synthesis completed"
        );

        Ok(audio)
    }
}

/// 组装带语言与静音标记的文本
///
/// 返回 (目标文本, 提示音文本)
fn compose_texts(request: &SynthesisRequest) -> (String, String) {
    let mut text = String::new();
    if let Some(language) = request.language {
        text.push_str(&language.tag());
    }
    text.push_str(&request.segment.text);
    if request.options.add_end_silence {
        text.push_str(END_SILENCE_TAG);
    }

    let prompt_text = match request.options.prompt_language {
        Some(language) => format!("{}{}", language.tag(), request.prompt_text),
        None => request.prompt_text.clone(),
    };

    (text, prompt_text)
}

fn map_send_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::Timeout
    } else if e.is_connect() {
        TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        TtsError::NetworkError(e.to_string())
    }
}

async fn ensure_status(
    response: Response,
    accept: impl Fn(reqwest::StatusCode) -> bool,
) -> Result<Response, TtsError> {
    let status = response.status();
    if accept(status) {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(TtsError::from_status(status.as_u16(), error_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PromptHandle, SynthesisOptions};
    use crate::domain::segment::{Language, Segment};

    fn request(language: Option<Language>, options: SynthesisOptions) -> SynthesisRequest {
        SynthesisRequest {
            segment: Segment::new(0, "今天天气很好", true),
            prompt: PromptHandle {
                url: String::new(),
                asset_key: "key-1".into(),
            },
            prompt_text: "希望你以后能够做的比我还好呦".into(),
            language,
            options,
        }
    }

    #[test]
    fn test_config_default() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.model_id, "tts-general-0.0.1");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_plain_texts() {
        let (text, prompt) = compose_texts(&request(None, SynthesisOptions::default()));
        assert_eq!(text, "今天天气很好");
        assert_eq!(prompt, "希望你以后能够做的比我还好呦");
    }

    #[test]
    fn test_language_and_silence_tags() {
        let options = SynthesisOptions {
            prompt_language: Some(Language::Nan),
            add_end_silence: true,
        };
        let (text, prompt) = compose_texts(&request(Some(Language::Zh), options));
        assert_eq!(text, "<|zh|>今天天气很好<|sil_200ms|>");
        assert_eq!(prompt, "<|nan|>希望你以后能够做的比我还好呦");
    }

    #[test]
    fn test_request_body_shape() {
        let body = ZeroShotRequest {
            input: ZeroShotInput {
                text: "hi".into(),
                kind: "text",
                prompt_voice_url: "",
                prompt_voice_asset_key: "asset",
                prompt_text: "prompt".into(),
            },
            model_config: ModelConfig { model: "m" },
            audio_config: AudioConfig {
                encoding: "LINEAR16",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["input"]["type"], "text");
        assert_eq!(json["input"]["promptVoiceAssetKey"], "asset");
        assert_eq!(json["input"]["promptText"], "prompt");
        assert_eq!(json["modelConfig"]["model"], "m");
        assert_eq!(json["audioConfig"]["encoding"], "LINEAR16");
    }

    #[test]
    fn test_presign_response_parsing() {
        let parsed: PresignResponse = serde_json::from_str(
            r#"{"assetKey":"abc","formData":{"key":"uploads/abc","policy":"p","x-amz-date":20240101}}"#,
        )
        .unwrap();
        assert_eq!(parsed.asset_key, "abc");
        assert_eq!(parsed.form_data.len(), 3);
    }
}
