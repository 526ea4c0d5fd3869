use std::io::Cursor;
use std::time::Duration;

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::stitch::AudioMixer;

/// Decoded 16-bit PCM audio, interleaved when there is more than one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmTrack {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl PcmTrack {
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Vec::new(),
        }
    }

    /// Human readable layout, used in mismatch errors.
    pub fn layout(&self) -> String {
        format!("{} Hz x{}", self.sample_rate, self.channels)
    }

    pub fn same_layout(&self, other: &PcmTrack) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    pub fn append(&mut self, other: &PcmTrack) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Append `duration` of digital silence, whole frames only.
    pub fn append_silence(&mut self, duration: Duration) {
        let frames = silence_frames(self.sample_rate, duration);
        let len = self.samples.len() + frames * self.channels as usize;
        self.samples.resize(len, 0);
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

pub(crate) fn silence_frames(sample_rate: u32, duration: Duration) -> usize {
    (sample_rate as u128 * duration.as_millis() / 1000) as usize
}

/// Mixing capability for RIFF/WAV segments, as returned by LINEAR16 backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavMixer;

impl AudioMixer for WavMixer {
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<PcmTrack> {
        let reader = WavReader::new(Cursor::new(bytes)).context("not a readable WAV stream")?;
        let spec = reader.spec();

        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .context("truncated 16-bit PCM data")?,
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(f32_to_i16))
                .collect::<Result<Vec<_>, _>>()
                .context("truncated float PCM data")?,
            (format, bits) => {
                anyhow::bail!("unsupported WAV sample format {format:?}/{bits} bits")
            }
        };

        Ok(PcmTrack {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    fn encode(&self, track: &PcmTrack) -> anyhow::Result<Vec<u8>> {
        let spec = WavSpec {
            channels: track.channels,
            sample_rate: track.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut out = Cursor::new(Vec::with_capacity(44 + track.samples.len() * 2));
        {
            let mut writer = WavWriter::new(&mut out, spec)?;
            let mut pcm = writer.get_i16_writer(track.samples.len() as u32);
            for &s in &track.samples {
                pcm.write_sample(s);
            }
            pcm.flush()?;
            writer.finalize()?;
        }
        Ok(out.into_inner())
    }
}

/// Convert f32 [-1.0, 1.0] to i16.
fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build an in-memory 16-bit WAV holding `samples` at `sample_rate`.
    pub(crate) fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        WavMixer
            .encode(&PcmTrack {
                sample_rate,
                channels: 1,
                samples: samples.to_vec(),
            })
            .unwrap()
    }

    #[test]
    fn test_decode_reads_back_encoded_samples() {
        let bytes = wav_bytes(16_000, &[1, -2, 300, i16::MAX]);
        let track = WavMixer.decode(&bytes).unwrap();
        assert_eq!(track.sample_rate, 16_000);
        assert_eq!(track.channels, 1);
        assert_eq!(track.samples, vec![1, -2, 300, i16::MAX]);
    }

    #[test]
    fn test_decode_converts_float_samples() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut out = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut out, spec).unwrap();
            for s in [0.0f32, 1.0, -1.0, 2.5] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let track = WavMixer.decode(&out.into_inner()).unwrap();
        assert_eq!(track.samples, vec![0, i16::MAX, -i16::MAX, i16::MAX]);
    }

    #[test]
    fn test_decode_rejects_mp3_bytes() {
        assert!(WavMixer.decode(&[0xFF, 0xFB, 0x90, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_append_silence_counts_whole_frames() {
        let mut track = PcmTrack::empty(24_000, 2);
        track.append_silence(Duration::from_millis(50));
        assert_eq!(track.frames(), 1_200);
        assert_eq!(track.samples.len(), 2_400);
        assert!(track.samples.iter().all(|&s| s == 0));
    }
}
