//! Error kinds shared across the pipeline stages.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid Content-Type header: missing boundary")]
    MalformedContentType,

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("missing file in the request")]
    MissingFile,

    #[error("missing '{0}' in the trigger payload")]
    MissingParameters(&'static str),

    #[error("no transcription text found")]
    EmptyTranscript,

    #[error("file key not found")]
    JobNotFound,

    #[error("{provider} provider failure: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("transcription job failed")]
    TranscriptionJobFailed,

    #[error("synthesis returned no audio payload")]
    NoAudioProduced,

    #[error("timed out waiting for transcription job after {0:?}")]
    Timeout(Duration),
}

impl PipelineError {
    /// True for errors caused by a bad request rather than by the
    /// pipeline or its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedContentType
                | Self::MalformedBody(_)
                | Self::MissingFile
                | Self::MissingParameters(_)
                | Self::EmptyTranscript
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
