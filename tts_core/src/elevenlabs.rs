use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::http::ensure_success;
use crate::synth::{SpeechSynthesizer, VoiceParams};
use crate::AudioFormat;

pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Stays under the API's per-request character cap once the SSML wrapper is added.
pub const ELEVENLABS_MAX_CHARS: usize = 2400;

#[derive(Serialize)]
struct SpeechRequest {
    text: String,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// ElevenLabs text-to-speech for a single configured voice. Returns MP3.
#[derive(Debug, Clone)]
pub struct ElevenLabsTts {
    client: Client,
    base_url: String,
    api_key: String,
    voice_id: String,
}

impl ElevenLabsTts {
    pub fn new(client: Client, api_key: String, voice_id: String) -> Self {
        Self::with_base_url(client, ELEVENLABS_BASE_URL, api_key, voice_id)
    }

    pub fn with_base_url(client: Client, base_url: &str, api_key: String, voice_id: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            voice_id,
        }
    }
}

fn speech_request(text: &str) -> SpeechRequest {
    SpeechRequest {
        text: format!(
            "<speak><prosody rate='fast'>{}</prosody></speak>",
            escape_xml(text)
        ),
        voice_settings: VoiceSettings {
            stability: 0.5,
            similarity_boost: 0.75,
        },
    }
}

/// Escape the characters that would otherwise break the SSML wrapper.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTts {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> anyhow::Result<Vec<u8>> {
        // a per-request voice overrides the configured one
        let voice_id = voice.voice.as_deref().unwrap_or(&self.voice_id);
        let response = self
            .client
            .post(format!("{}/v1/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", &self.api_key)
            .json(&speech_request(text))
            .send()
            .await
            .context("ElevenLabs TTS request failed")?;

        let response = ensure_success(response, "ElevenLabs TTS").await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn max_chars(&self) -> usize {
        ELEVENLABS_MAX_CHARS
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}
