//! Combining per-chunk audio segments into one buffer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::StitchError;
use crate::ffmpeg::{FfmpegMixer, DEFAULT_FFMPEG};
use crate::synth::AudioSegment;
use crate::wav::{PcmTrack, WavMixer};
use crate::AudioFormat;

/// Pause inserted between consecutive segments when mixing is available.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(50);

/// Decode/encode capability used to join segments with silence between them.
pub trait AudioMixer: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<PcmTrack>;
    fn encode(&self, track: &PcmTrack) -> anyhow::Result<Vec<u8>>;
}

/// How segments get joined. Chosen once, when the stitcher is built.
#[derive(Clone)]
pub enum StitchStrategy {
    Mixing(Arc<dyn AudioMixer>),
    /// Raw byte concatenation. Only sound for frame-oriented codecs such as MP3.
    ByteConcat,
}

impl std::fmt::Debug for StitchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StitchStrategy::Mixing(_) => f.write_str("Mixing"),
            StitchStrategy::ByteConcat => f.write_str("ByteConcat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchedAudio {
    pub bytes: Vec<u8>,
    /// Segments that made it into `bytes`.
    pub segments: usize,
    pub pauses: usize,
    /// True when byte concatenation was used in place of mixing.
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct AudioStitcher {
    strategy: StitchStrategy,
    pause: Duration,
}

impl AudioStitcher {
    pub fn new(strategy: StitchStrategy) -> Self {
        Self {
            strategy,
            pause: DEFAULT_PAUSE,
        }
    }

    /// Pick the strategy a backend's output format supports, looking for
    /// `ffmpeg` on `PATH` for MP3.
    pub fn for_format(format: AudioFormat) -> Self {
        Self::for_format_with_ffmpeg(format, DEFAULT_FFMPEG)
    }

    /// Like [`AudioStitcher::for_format`] with an explicit ffmpeg binary.
    ///
    /// MP3 segments are mixed when the binary runs and joined frame-wise otherwise.
    pub fn for_format_with_ffmpeg(format: AudioFormat, ffmpeg: &str) -> Self {
        match format {
            AudioFormat::Wav => Self::new(StitchStrategy::Mixing(Arc::new(WavMixer))),
            AudioFormat::Mp3 => match FfmpegMixer::detect(ffmpeg) {
                Some(mixer) => Self::new(StitchStrategy::Mixing(Arc::new(mixer))),
                None => Self::new(StitchStrategy::ByteConcat),
            },
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn strategy(&self) -> &StitchStrategy {
        &self.strategy
    }

    /// Join segments in the order given.
    ///
    /// Never fails: if mixing breaks down the raw bytes are concatenated instead.
    pub fn stitch(&self, segments: &[AudioSegment]) -> StitchedAudio {
        if segments.len() <= 1 {
            return concat_bytes(segments, false);
        }

        match &self.strategy {
            StitchStrategy::Mixing(mixer) => match self.mix(mixer.as_ref(), segments) {
                Ok(stitched) => {
                    info!(
                        "Concatenated {} audio segments with {} pauses",
                        stitched.segments, stitched.pauses
                    );
                    stitched
                }
                Err(e) => {
                    warn!("Audio mixing failed: {e}, using simple concatenation");
                    concat_bytes(segments, true)
                }
            },
            StitchStrategy::ByteConcat => concat_bytes(segments, false),
        }
    }

    fn mix(
        &self,
        mixer: &dyn AudioMixer,
        segments: &[AudioSegment],
    ) -> Result<StitchedAudio, StitchError> {
        let mut combined: Option<PcmTrack> = None;
        let mut used = 0;
        let mut pauses = 0;

        for (position, segment) in segments.iter().enumerate() {
            let track = match mixer.decode(&segment.bytes) {
                Ok(track) => track,
                Err(e) => {
                    warn!(
                        "Failed to process audio segment {} (chunk {}): {e}",
                        position, segment.index
                    );
                    continue;
                }
            };

            match combined.as_mut() {
                None => combined = Some(track),
                Some(acc) => {
                    if !acc.same_layout(&track) {
                        return Err(StitchError::FormatMismatch {
                            index: segment.index,
                            expected: acc.layout(),
                            found: track.layout(),
                        });
                    }
                    acc.append_silence(self.pause);
                    acc.append(&track);
                    pauses += 1;
                }
            }
            used += 1;
        }

        let combined = combined.ok_or(StitchError::NothingDecoded(segments.len()))?;
        let bytes = mixer.encode(&combined).map_err(StitchError::Encode)?;

        Ok(StitchedAudio {
            bytes,
            segments: used,
            pauses,
            degraded: false,
        })
    }
}

fn concat_bytes(segments: &[AudioSegment], degraded: bool) -> StitchedAudio {
    StitchedAudio {
        bytes: segments.iter().flat_map(|s| s.bytes.iter().copied()).collect(),
        segments: segments.len(),
        pauses: 0,
        degraded,
    }
}
