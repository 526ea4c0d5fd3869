// Configuration for the server, read once at startup

use std::time::Duration;

use llm_core::{OpenAiConfig, Persona};
use thiserror::Error;
use tts_core::{ffmpeg::DEFAULT_FFMPEG, BackendConfig, CloudEncoding, VoiceParams};

use crate::validation::is_valid_language_code;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub llm_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub openai: OpenAiConfig,
    pub persona: Persona,
    pub tts_backend: BackendConfig,
    pub voice: VoiceParams,
    pub tts_concurrency: usize,
    pub ffmpeg_path: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = parse_or(&get, "PORT", 8085)?;
        let rate_limit_per_minute = parse_or(&get, "RATE_LIMIT_PER_MINUTE", 60u32)?;
        if rate_limit_per_minute == 0 {
            return Err(invalid("RATE_LIMIT_PER_MINUTE", "0", "must be greater than 0"));
        }
        let llm_timeout_secs = parse_or(&get, "LLM_TIMEOUT_SECS", 120)?;
        let request_timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", 180)?;
        // the LLM call and TTS both run inside the request timeout
        if llm_timeout_secs >= request_timeout_secs {
            return Err(invalid(
                "LLM_TIMEOUT_SECS",
                &llm_timeout_secs.to_string(),
                &format!("must be less than REQUEST_TIMEOUT_SECS ({request_timeout_secs})"),
            ));
        }

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let mut openai = OpenAiConfig::new(require("OPENAI_API_KEY")?);
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            openai.base_url = base_url;
        }
        if let Some(model) = get("LLM_MODEL") {
            openai.model = model;
        }
        openai.temperature = parse_or(&get, "LLM_TEMPERATURE", openai.temperature)?;
        if !(0.0..=2.0).contains(&openai.temperature) {
            return Err(invalid(
                "LLM_TEMPERATURE",
                &openai.temperature.to_string(),
                "must be between 0 and 2",
            ));
        }
        openai.max_tokens = parse_or(&get, "LLM_MAX_TOKENS", openai.max_tokens)?;

        let persona = match (get("SYSTEM_PROMPT"), get("SYSTEM_PROMPT_FILE")) {
            (Some(prompt), _) => Persona::new(prompt),
            (None, Some(path)) => Persona::from_file(&path)
                .map_err(|e| invalid("SYSTEM_PROMPT_FILE", &path, &format!("{e:#}")))?,
            (None, None) => Persona::default(),
        };

        let backend = get("TTS_BACKEND").unwrap_or_else(|| "gtts".to_string());
        let tts_backend = match backend.to_ascii_lowercase().as_str() {
            "gtts" | "google-translate" => BackendConfig::GoogleTranslate,
            "google-cloud" => {
                let encoding = match get("GOOGLE_CLOUD_ENCODING") {
                    None => CloudEncoding::Mp3,
                    Some(value) => CloudEncoding::parse(&value).ok_or_else(|| {
                        invalid("GOOGLE_CLOUD_ENCODING", &value, "expected MP3 or LINEAR16")
                    })?,
                };
                BackendConfig::GoogleCloud {
                    api_key: require("GOOGLE_CLOUD_API_KEY")?,
                    encoding,
                }
            }
            "elevenlabs" => BackendConfig::ElevenLabs {
                api_key: require("ELEVENLABS_API_KEY")?,
                voice_id: require("VOICE_ID")?,
            },
            _ => {
                return Err(invalid(
                    "TTS_BACKEND",
                    &backend,
                    "expected gtts, google-cloud or elevenlabs",
                ))
            }
        };

        let language = get("TTS_LANGUAGE").unwrap_or_else(|| "en".to_string());
        if !is_valid_language_code(&language) {
            return Err(invalid(
                "TTS_LANGUAGE",
                &language,
                "expected a code like en, en-US or en_US",
            ));
        }
        let voice = VoiceParams {
            language,
            voice: get("GOOGLE_CLOUD_VOICE"),
            slow: parse_or(&get, "TTS_SLOW", false)?,
        };

        let tts_concurrency = parse_or(&get, "TTS_CONCURRENCY", 1usize)?;
        if tts_concurrency == 0 {
            return Err(invalid("TTS_CONCURRENCY", "0", "must be greater than 0"));
        }

        let ffmpeg_path = get("FFMPEG_PATH").unwrap_or_else(|| DEFAULT_FFMPEG.to_string());

        Ok(Self {
            port,
            rate_limit_per_minute,
            llm_timeout_secs,
            request_timeout_secs,
            cors_allowed_origins,
            openai,
            persona,
            tts_backend,
            voice,
            tts_concurrency,
            ffmpeg_path,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| invalid(key, &value, &e.to_string())),
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
