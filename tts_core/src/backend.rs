use std::sync::Arc;

use reqwest::Client;

use crate::elevenlabs::ElevenLabsTts;
use crate::google::{CloudEncoding, GoogleCloudTts, GoogleTranslateTts};
use crate::synth::SpeechSynthesizer;

/// Which text-to-speech service to call, with the credentials it needs.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    GoogleTranslate,
    GoogleCloud {
        api_key: String,
        encoding: CloudEncoding,
    },
    ElevenLabs {
        api_key: String,
        voice_id: String,
    },
}

// keep credentials out of logs
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::GoogleTranslate => f.write_str("GoogleTranslate"),
            BackendConfig::GoogleCloud { encoding, .. } => f
                .debug_struct("GoogleCloud")
                .field("encoding", encoding)
                .finish_non_exhaustive(),
            BackendConfig::ElevenLabs { voice_id, .. } => f
                .debug_struct("ElevenLabs")
                .field("voice_id", voice_id)
                .finish_non_exhaustive(),
        }
    }
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::GoogleTranslate => "gtts",
            BackendConfig::GoogleCloud { .. } => "google-cloud",
            BackendConfig::ElevenLabs { .. } => "elevenlabs",
        }
    }

    pub fn build(&self) -> Arc<dyn SpeechSynthesizer> {
        self.build_with_client(Client::new())
    }

    pub fn build_with_client(&self, client: Client) -> Arc<dyn SpeechSynthesizer> {
        match self {
            BackendConfig::GoogleTranslate => Arc::new(GoogleTranslateTts::new(client)),
            BackendConfig::GoogleCloud { api_key, encoding } => {
                Arc::new(GoogleCloudTts::new(client, api_key.clone(), *encoding))
            }
            BackendConfig::ElevenLabs { api_key, voice_id } => Arc::new(ElevenLabsTts::new(
                client,
                api_key.clone(),
                voice_id.clone(),
            )),
        }
    }
}
