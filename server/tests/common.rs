//! Common utilities for integration tests

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use llm_core::{ChatCompleter, Persona};
use server::{app, config::ServerConfig, AppState};
use tts_core::{AudioFormat, SpeechPipeline, SpeechSynthesizer, VoiceParams};

pub const SAMPLE_RATE: u32 = 8_000;

/// Chat backend with a canned outcome.
pub enum FakeChat {
    Reply(String),
    Fail(String),
    Slow(Duration),
}

#[async_trait]
impl ChatCompleter for FakeChat {
    async fn complete(&self, system_prompt: &str, _user_message: &str) -> anyhow::Result<String> {
        assert!(!system_prompt.is_empty());
        match self {
            FakeChat::Reply(reply) => Ok(reply.clone()),
            FakeChat::Fail(msg) => Err(anyhow::anyhow!(msg.clone())),
            FakeChat::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("too late".to_string())
            }
        }
    }
}

/// TTS backend that answers each chunk with a mono WAV holding one sample per
/// character, and fails chunks containing `fail_on`.
pub struct FakeSynth {
    pub max_chars: usize,
    pub fail_on: Option<String>,
    pub delay: Option<Duration>,
}

impl FakeSynth {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            fail_on: None,
            delay: None,
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub fn wav(samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut out = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut out, spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    out.into_inner()
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    async fn synthesize(&self, text: &str, _voice: &VoiceParams) -> anyhow::Result<Vec<u8>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                anyhow::bail!("TTS API error: 500");
            }
        }
        Ok(wav(text.chars().count()))
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Config as loaded at startup, with `overrides` on top of the defaults.
pub fn config_with(overrides: &[(&str, &str)]) -> ServerConfig {
    let mut env: HashMap<&str, &str> = HashMap::from([
        ("OPENAI_API_KEY", "test-key-for-integration-tests"),
        ("RATE_LIMIT_PER_MINUTE", "1000"),
    ]);
    env.extend(overrides.iter().copied());
    ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
        .expect("test config should load")
}

pub fn test_config() -> ServerConfig {
    config_with(&[])
}

/// Create a test app instance around the given fakes
pub fn create_test_app(chat: FakeChat, synth: FakeSynth) -> Router {
    create_test_app_with_config(chat, synth, &test_config())
}

pub fn create_test_app_with_config(chat: FakeChat, synth: FakeSynth, config: &ServerConfig) -> Router {
    let state = AppState {
        chat: Arc::new(chat),
        persona: Arc::new(Persona::default()),
        speech: Arc::new(SpeechPipeline::new(Arc::new(synth), VoiceParams::default())),
        llm_timeout: config.llm_timeout(),
    };
    app(state, config).expect("router should build")
}
