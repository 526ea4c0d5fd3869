//! Google text-to-speech backends: the free translate endpoint and Cloud TTS.

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::http::ensure_success;
use crate::synth::{SpeechSynthesizer, VoiceParams};
use crate::AudioFormat;

pub const TRANSLATE_BASE_URL: &str = "https://translate.google.com";
pub const CLOUD_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Per-request limit of the free translate endpoint.
pub const TRANSLATE_MAX_CHARS: usize = 100;
/// Cloud TTS accepts 5000 characters; keep some headroom.
pub const CLOUD_MAX_CHARS: usize = 4500;

const CLOUD_SPEAKING_RATE: f32 = 1.1;

/// The free Google Translate speech endpoint. Returns MP3.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: Client,
    base_url: String,
}

impl GoogleTranslateTts {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, TRANSLATE_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> anyhow::Result<Vec<u8>> {
        let speed = if voice.slow { "0.3" } else { "1" };
        let response = self
            .client
            .get(format!("{}/translate_tts", self.base_url))
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", voice.language.as_str()),
                ("client", "tw-ob"),
                ("ttsspeed", speed),
            ])
            .header(header::USER_AGENT, "Mozilla/5.0")
            .send()
            .await
            .context("Google TTS request failed")?;

        let response = ensure_success(response, "Google TTS").await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn max_chars(&self) -> usize {
        TRANSLATE_MAX_CHARS
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn name(&self) -> &'static str {
        "google-translate"
    }
}

/// Audio encodings requested from Cloud TTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudEncoding {
    Mp3,
    /// 16-bit PCM in a WAV container.
    Linear16,
}

impl CloudEncoding {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MP3" => Some(CloudEncoding::Mp3),
            "LINEAR16" | "WAV" => Some(CloudEncoding::Linear16),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    ssml_gender: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: CloudEncoding,
    speaking_rate: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Text-to-Speech over its REST API, authenticated with an API key.
#[derive(Debug, Clone)]
pub struct GoogleCloudTts {
    client: Client,
    base_url: String,
    api_key: String,
    encoding: CloudEncoding,
}

impl GoogleCloudTts {
    pub fn new(client: Client, api_key: String, encoding: CloudEncoding) -> Self {
        Self::with_base_url(client, CLOUD_BASE_URL, api_key, encoding)
    }

    pub fn with_base_url(
        client: Client,
        base_url: &str,
        api_key: String,
        encoding: CloudEncoding,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            encoding,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleCloudTts {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> anyhow::Result<Vec<u8>> {
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &voice.language,
                name: voice.voice.as_deref(),
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: self.encoding,
                speaking_rate: CLOUD_SPEAKING_RATE,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Google Cloud TTS request failed")?;

        let response: SynthesizeResponse = ensure_success(response, "Google Cloud TTS")
            .await?
            .json()
            .await
            .context("Google Cloud TTS returned an unexpected body")?;

        base64::engine::general_purpose::STANDARD
            .decode(response.audio_content)
            .context("Google Cloud TTS audioContent is not valid base64")
    }

    fn max_chars(&self) -> usize {
        CLOUD_MAX_CHARS
    }

    fn format(&self) -> AudioFormat {
        match self.encoding {
            CloudEncoding::Mp3 => AudioFormat::Mp3,
            CloudEncoding::Linear16 => AudioFormat::Wav,
        }
    }

    fn name(&self) -> &'static str {
        "google-cloud"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::spawn_mock;
    use axum::{
        extract::Query,
        http::{StatusCode, Uri},
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;

    #[test]
    fn test_cloud_encoding_parse() {
        assert_eq!(CloudEncoding::parse("mp3"), Some(CloudEncoding::Mp3));
        assert_eq!(CloudEncoding::parse(" LINEAR16 "), Some(CloudEncoding::Linear16));
        assert_eq!(CloudEncoding::parse("ogg"), None);
    }

    #[test]
    fn test_cloud_request_body_shape() {
        let body = SynthesizeRequest {
            input: SynthesisInput { text: "hi" },
            voice: VoiceSelection {
                language_code: "en-US",
                name: None,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: CloudEncoding::Linear16,
                speaking_rate: 1.1,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["input"]["text"], "hi");
        assert_eq!(json["voice"]["languageCode"], "en-US");
        assert!(json["voice"].get("name").is_none());
        assert_eq!(json["audioConfig"]["audioEncoding"], "LINEAR16");
    }

    #[tokio::test]
    async fn test_translate_sends_query_and_returns_bytes() {
        let app = Router::new().route(
            "/translate_tts",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q["tl"], "de");
                assert_eq!(q["ttsspeed"], "0.3");
                q["q"].clone().into_bytes()
            }),
        );
        let base = spawn_mock(app).await;

        let tts = GoogleTranslateTts::with_base_url(Client::new(), &base);
        let voice = VoiceParams {
            language: "de".to_string(),
            voice: None,
            slow: true,
        };
        let audio = tts.synthesize("Guten Tag", &voice).await.unwrap();
        assert_eq!(audio, b"Guten Tag".to_vec());
        assert_eq!(tts.max_chars(), 100);
    }

    #[tokio::test]
    async fn test_translate_error_status_is_an_error() {
        let app = Router::new().route(
            "/translate_tts",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn_mock(app).await;

        let tts = GoogleTranslateTts::with_base_url(Client::new(), &base);
        let err = tts
            .synthesize("hello", &VoiceParams::default())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"), "{msg}");
        assert!(msg.contains("slow down"), "{msg}");
    }

    #[tokio::test]
    async fn test_cloud_decodes_audio_content() {
        let app = Router::new().fallback(
            |uri: Uri, Query(q): Query<HashMap<String, String>>, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(uri.path(), "/v1/text:synthesize");
                assert_eq!(q["key"], "secret");
                assert_eq!(body["voice"]["name"], "en-US-Neural2-D");
                Json(serde_json::json!({ "audioContent": "AQID" }))
            },
        );
        let base = spawn_mock(app).await;

        let tts = GoogleCloudTts::with_base_url(
            Client::new(),
            &base,
            "secret".to_string(),
            CloudEncoding::Mp3,
        );
        let voice = VoiceParams {
            language: "en-US".to_string(),
            voice: Some("en-US-Neural2-D".to_string()),
            slow: false,
        };
        assert_eq!(tts.synthesize("hi", &voice).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(tts.format(), AudioFormat::Mp3);
    }
}
