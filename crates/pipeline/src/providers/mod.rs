//! External provider boundaries: speech-to-text, translation, and
//! text-to-speech. The pipeline only ever talks to these traits; the
//! HTTP-backed clients live in [`http`].

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transcript::ProviderTranscript;

pub use http::{HttpSpeechToText, HttpSpeechSynthesizer, HttpTranslator};

/// Terminal and non-terminal states of an external transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptionJobState {
    InProgress,
    Completed,
    Failed,
}

impl TranscriptionJobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot of an external transcription job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionJobStatus {
    pub state: TranscriptionJobState,
    /// Location of the result document once the job completes.
    pub transcript_uri: Option<String>,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Starts an asynchronous transcription job on the provider side.
    async fn start_job(
        &self,
        job_name: &str,
        media_uri: &str,
        media_format: &str,
        language_code: &str,
    ) -> Result<()>;

    /// Current state of a previously started job.
    async fn job_status(&self, job_name: &str) -> Result<TranscriptionJobStatus>;

    /// Fetches the result document from the location the provider reported.
    async fn fetch_transcript(&self, uri: &str) -> Result<ProviderTranscript>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesized audio bytes; an empty payload is a provider defect the
    /// synthesis stage reports as `NoAudioProduced`.
    async fn synthesize(&self, text: &str, voice: &str, output_format: &str) -> Result<Vec<u8>>;
}
