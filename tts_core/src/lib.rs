//! Text-to-speech for replies of any length.
//!
//! Backends cap the text one request may carry, so a reply is cleaned and cut
//! into bounded chunks ([`text`]), each chunk is synthesized on its own
//! ([`synth`]) and the resulting segments are joined back into one buffer
//! ([`stitch`]). [`SpeechPipeline`] runs the whole sequence.

pub mod backend;
pub mod elevenlabs;
pub mod error;
pub mod ffmpeg;
pub mod google;
mod http;
pub mod pipeline;
pub mod stitch;
pub mod synth;
pub mod text;
pub mod wav;

use serde::{Deserialize, Serialize};

pub use backend::BackendConfig;
pub use elevenlabs::ElevenLabsTts;
pub use error::{StitchError, TtsError};
pub use ffmpeg::FfmpegMixer;
pub use google::{CloudEncoding, GoogleCloudTts, GoogleTranslateTts};
pub use pipeline::{SpeechOutput, SpeechPipeline};
pub use stitch::{AudioMixer, AudioStitcher, StitchStrategy, StitchedAudio};
pub use synth::{synthesize_segments, AudioSegment, SpeechSynthesizer, VoiceParams};
pub use text::{clean_text, prepare_chunks, split_text, TextChunk};
pub use wav::{PcmTrack, WavMixer};

/// Container/codec a backend returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}
