use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TtsError;
use crate::text::TextChunk;
use crate::AudioFormat;

/// Language and voice selection passed along with every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub language: String,
    pub voice: Option<String>,
    pub slow: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            voice: None,
            slow: false,
        }
    }
}

/// A text-to-speech backend that handles one bounded chunk per call.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize a single chunk and return the encoded audio bytes.
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> anyhow::Result<Vec<u8>>;

    /// Longest input, in characters, one request may carry.
    fn max_chars(&self) -> usize;

    fn format(&self) -> AudioFormat;

    fn name(&self) -> &'static str;
}

/// Encoded audio for one chunk. `index` is the chunk it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// Synthesize every chunk, dropping the ones that fail.
///
/// With `concurrency > 1` up to that many requests are in flight at once; the
/// returned segments are still in chunk order. Fails only when no chunk
/// produced audio.
pub async fn synthesize_segments(
    synth: &dyn SpeechSynthesizer,
    chunks: &[TextChunk],
    voice: &VoiceParams,
    concurrency: usize,
) -> Result<Vec<AudioSegment>, TtsError> {
    let total = chunks.len();

    // build the futures before streaming them; mapping inside the stream
    // leaves the caller's future non-Send
    let requests: Vec<_> = chunks
        .iter()
        .map(|chunk| async move {
            info!(
                "Processing chunk {}/{}: '{}'",
                chunk.index + 1,
                total,
                preview(&chunk.text, 30)
            );
            synth
                .synthesize(&chunk.text, voice)
                .await
                .map(|bytes| AudioSegment {
                    index: chunk.index,
                    bytes,
                })
                .map_err(|source| TtsError::ChunkSynthesisFailure {
                    index: chunk.index,
                    source,
                })
        })
        .collect();

    let results: Vec<_> = stream::iter(requests)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut segments = Vec::with_capacity(total);
    for result in results {
        match result {
            Ok(segment) => segments.push(segment),
            Err(e) => warn!("{e:#}"),
        }
    }

    if segments.is_empty() {
        return Err(TtsError::AllChunksFailed { attempted: total });
    }
    if segments.len() < total {
        warn!(
            "Synthesized {} of {} chunks with {}",
            segments.len(),
            total,
            synth.name()
        );
    }
    Ok(segments)
}

/// First `max` characters of `text`, for log lines.
pub(crate) fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
