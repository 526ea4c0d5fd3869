use thiserror::Error;

/// Errors raised while turning text into speech.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Empty text provided for TTS")]
    EmptyInput,

    /// One chunk could not be synthesized. The chunk is skipped and the rest carry on.
    #[error("Failed to generate TTS for chunk {index}: {source}")]
    ChunkSynthesisFailure {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to generate audio for any of {attempted} text chunks")]
    AllChunksFailed { attempted: usize },

    #[error("Stitching task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Reasons the mixing strategy gives up and hands over to byte concatenation.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("none of the {0} segments could be decoded")]
    NothingDecoded(usize),

    #[error("segment {index} is {found}, expected {expected}")]
    FormatMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("failed to encode combined audio: {0}")]
    Encode(#[source] anyhow::Error),
}
