//! MP3 mixing through an external FFmpeg binary.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::stitch::AudioMixer;
use crate::wav::PcmTrack;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Decodes MP3 segments to 16-bit PCM and encodes the mixed track back to MP3.
///
/// Every segment is decoded to the same layout, so backends that return
/// different sample rates still mix.
#[derive(Debug, Clone)]
pub struct FfmpegMixer {
    program: String,
    sample_rate: u32,
    channels: u16,
}

impl FfmpegMixer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            sample_rate: 24_000,
            channels: 1,
        }
    }

    pub fn with_layout(mut self, sample_rate: u32, channels: u16) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }

    /// The mixer, if `program` runs.
    pub fn detect(program: &str) -> Option<Self> {
        if is_ffmpeg_available(program) {
            info!("Found {program}, MP3 segments will be mixed");
            Some(Self::new(program))
        } else {
            info!("{program} not found, MP3 segments will be concatenated as-is");
            None
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(["-hide_banner", "-loglevel", "error"]);
        command
    }

    /// Feed `input` to ffmpeg's stdin and collect stdout.
    fn run(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>> {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to run {}", self.program))?;
        let mut stdin = child.stdin.take().context("ffmpeg stdin unavailable")?;

        let output = std::thread::scope(|scope| {
            // ffmpeg may exit before reading everything; its exit status says why
            scope.spawn(move || {
                let _ = stdin.write_all(input);
            });
            child.wait_with_output()
        })
        .context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg failed: {}", stderr.trim());
        }
        debug!("ffmpeg produced {} bytes", output.stdout.len());
        Ok(output.stdout)
    }
}

impl AudioMixer for FfmpegMixer {
    fn decode(&self, bytes: &[u8]) -> Result<PcmTrack> {
        let rate = self.sample_rate.to_string();
        let channels = self.channels.to_string();
        let raw = self.run(
            &[
                "-f", "mp3", "-i", "pipe:0", "-f", "s16le", "-acodec", "pcm_s16le", "-ar", &rate,
                "-ac", &channels, "pipe:1",
            ],
            bytes,
        )?;
        if raw.is_empty() {
            anyhow::bail!("ffmpeg decoded no audio");
        }

        Ok(PcmTrack {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: raw
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect(),
        })
    }

    fn encode(&self, track: &PcmTrack) -> Result<Vec<u8>> {
        let rate = track.sample_rate.to_string();
        let channels = track.channels.to_string();
        let raw: Vec<u8> = track.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.run(
            &[
                "-f", "s16le", "-ar", &rate, "-ac", &channels, "-i", "pipe:0", "-f", "mp3",
                "pipe:1",
            ],
            &raw,
        )
    }
}

/// Check that `program -version` runs and succeeds.
pub fn is_ffmpeg_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
