use std::sync::Arc;

use base64::Engine;
use tracing::{info, warn};

use crate::error::TtsError;
use crate::stitch::AudioStitcher;
use crate::synth::{synthesize_segments, SpeechSynthesizer, VoiceParams};
use crate::text::{char_len, prepare_chunks};
use crate::AudioFormat;

/// Speech produced for one reply.
#[derive(Debug, Clone)]
pub struct SpeechOutput {
    pub audio: Vec<u8>,
    pub format: AudioFormat,
    pub chunk_count: usize,
    pub segment_count: usize,
    pub degraded: bool,
}

impl SpeechOutput {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.audio)
    }
}

/// Clean, chunk, synthesize and stitch, against one backend.
#[derive(Clone)]
pub struct SpeechPipeline {
    synth: Arc<dyn SpeechSynthesizer>,
    stitcher: AudioStitcher,
    voice: VoiceParams,
    concurrency: usize,
}

impl SpeechPipeline {
    /// Build a pipeline whose stitch strategy matches the backend's output format.
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, voice: VoiceParams) -> Self {
        let stitcher = AudioStitcher::for_format(synth.format());
        Self::from_parts(synth, stitcher, voice)
    }

    pub fn from_parts(
        synth: Arc<dyn SpeechSynthesizer>,
        stitcher: AudioStitcher,
        voice: VoiceParams,
    ) -> Self {
        Self {
            synth,
            stitcher,
            voice,
            concurrency: 1,
        }
    }

    pub fn with_stitcher(mut self, stitcher: AudioStitcher) -> Self {
        self.stitcher = stitcher;
        self
    }

    /// Maximum synthesis requests in flight per reply.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.synth.name()
    }

    pub async fn speak(&self, text: &str) -> Result<SpeechOutput, TtsError> {
        let max_chars = self.synth.max_chars();
        let chunks = prepare_chunks(text, max_chars)?;
        if chunks.len() > 1 {
            info!(
                "Generating {} TTS for long text ({} characters) in {} chunks",
                self.synth.name(),
                char_len(text),
                chunks.len()
            );
        }

        let segments =
            synthesize_segments(self.synth.as_ref(), &chunks, &self.voice, self.concurrency)
                .await?;

        let stitcher = self.stitcher.clone();
        let stitched = tokio::task::spawn_blocking(move || stitcher.stitch(&segments)).await?;
        if stitched.degraded {
            warn!("Audio stitched by plain concatenation, pauses dropped");
        }

        Ok(SpeechOutput {
            audio: stitched.bytes,
            format: self.synth.format(),
            chunk_count: chunks.len(),
            segment_count: stitched.segments,
            degraded: stitched.degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitch::{AudioMixer, StitchStrategy, DEFAULT_PAUSE};
    use crate::synth::tests::ScriptedSynth;
    use crate::wav::{silence_frames, PcmTrack, WavMixer};

    const THREE_SENTENCES: &str =
        "Hello world. This is a test sentence that talks about something. Short end.";

    /// Decodes any bytes as one non-zero sample per byte, so text-echoing
    /// fakes can go through the mixing path.
    struct EchoMixer;

    impl AudioMixer for EchoMixer {
        fn decode(&self, bytes: &[u8]) -> anyhow::Result<PcmTrack> {
            Ok(PcmTrack {
                sample_rate: 1_000,
                channels: 1,
                samples: vec![1; bytes.len()],
            })
        }

        fn encode(&self, track: &PcmTrack) -> anyhow::Result<Vec<u8>> {
            WavMixer.encode(track)
        }
    }

    #[tokio::test]
    async fn test_short_text_is_one_request() {
        let synth = Arc::new(ScriptedSynth::new(100));
        let pipeline = SpeechPipeline::new(synth.clone(), VoiceParams::default());

        let out = pipeline.speak("  Hello \"there\"  ").await.unwrap();
        assert_eq!(out.chunk_count, 1);
        assert_eq!(out.audio, b"Hello 'there'".to_vec());
        assert_eq!(synth.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_requests() {
        let synth = Arc::new(ScriptedSynth::new(100));
        let pipeline = SpeechPipeline::new(synth.clone(), VoiceParams::default());

        assert!(matches!(pipeline.speak("   ").await, Err(TtsError::EmptyInput)));
        assert_eq!(synth.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mp3_backend_concatenates_in_chunk_order() {
        let synth = Arc::new(ScriptedSynth::new(30));
        let pipeline = SpeechPipeline::from_parts(
            synth.clone(),
            AudioStitcher::new(StitchStrategy::ByteConcat),
            VoiceParams::default(),
        );

        let out = pipeline.speak(THREE_SENTENCES).await.unwrap();
        assert_eq!(
            *synth.seen.lock().unwrap(),
            vec![
                "Hello world.",
                "This is a test sentence that",
                "talks about something.",
                "Short end."
            ]
        );
        assert_eq!(out.chunk_count, 4);
        assert_eq!(out.segment_count, 4);
        assert_eq!(
            String::from_utf8(out.audio).unwrap(),
            "Hello world.This is a test sentence thattalks about something.Short end."
        );
        assert!(!out.degraded);
    }

    #[tokio::test]
    async fn test_two_of_three_chunks_with_mixing() {
        let synth = Arc::new(ScriptedSynth::new(20).failing(&[1]));
        let pipeline = SpeechPipeline::new(synth.clone(), VoiceParams::default())
            .with_stitcher(AudioStitcher::new(StitchStrategy::Mixing(Arc::new(EchoMixer))));

        let out = pipeline
            .speak("First bit here. Second bit here. Third bit here.")
            .await
            .unwrap();
        assert_eq!(out.chunk_count, 3);
        assert_eq!(out.segment_count, 2);
        assert!(!out.degraded);

        // "First bit here." and "Third bit here." are 15 bytes each, one pause between
        let track = WavMixer.decode(&out.audio).unwrap();
        assert_eq!(track.samples.len(), 30 + silence_frames(1_000, DEFAULT_PAUSE));
    }

    #[tokio::test]
    async fn test_all_chunks_failing_surfaces() {
        let synth = Arc::new(ScriptedSynth::new(20).failing(&[0, 1, 2]));
        let pipeline = SpeechPipeline::new(synth, VoiceParams::default());

        let result = pipeline
            .speak("First bit here. Second bit here. Third bit here.")
            .await;
        assert!(matches!(result, Err(TtsError::AllChunksFailed { attempted: 3 })));
    }

    #[tokio::test]
    async fn test_wav_backend_degrades_when_segments_are_not_wav() {
        // a WAV backend selects mixing, but the fake returns raw text bytes
        let synth = Arc::new(ScriptedSynth::new(20).with_format(AudioFormat::Wav));
        let pipeline = SpeechPipeline::new(synth, VoiceParams::default());

        let out = pipeline.speak("One two three. Four five six.").await.unwrap();
        assert!(out.degraded);
        assert_eq!(out.audio, b"One two three.Four five six.".to_vec());
        assert_eq!(out.format, AudioFormat::Wav);
    }

    #[tokio::test]
    async fn test_speak_runs_on_a_spawned_task() {
        let synth = Arc::new(ScriptedSynth::new(20));
        let pipeline = Arc::new(
            SpeechPipeline::new(synth, VoiceParams::default())
                .with_stitcher(AudioStitcher::new(StitchStrategy::ByteConcat))
                .with_concurrency(2),
        );

        // handlers run on spawned tasks, so the future must be Send + 'static
        let handle = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.speak("First bit here. Second bit here.").await }
        });
        let out = handle.await.unwrap().unwrap();
        assert_eq!(out.segment_count, 2);
        assert_eq!(out.audio, b"First bit here.Second bit here.".to_vec());
    }

    #[tokio::test]
    async fn test_base64_output() {
        let synth = Arc::new(ScriptedSynth::new(100));
        let pipeline = SpeechPipeline::new(synth, VoiceParams::default());
        let out = pipeline.speak("hi").await.unwrap();
        assert_eq!(out.to_base64(), "aGk=");
    }
}
