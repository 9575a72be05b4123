//! Status query: a read-only projection of the job record for pollers.

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::job::{JobStage, JobStatus};
use crate::store::JobStore;

/// Externally visible slice of a job record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusProjection {
    pub status: JobStatus,
    pub stage: JobStage,
    #[serde(rename = "transcriptionText")]
    pub transcription_text: Option<String>,
    #[serde(rename = "translatedText")]
    pub translated_text: Option<String>,
    #[serde(rename = "translatedAudioUrl")]
    pub translated_audio_url: Option<String>,
}

/// Looks up `file_key` and projects it; side-effect free.
pub fn project(jobs: &JobStore, file_key: &str) -> Result<StatusProjection> {
    let record = jobs.get(file_key).ok_or(PipelineError::JobNotFound)?;
    Ok(StatusProjection {
        status: record.status,
        stage: record.stage,
        transcription_text: record.transcription_text,
        translated_text: record.translated_text,
        translated_audio_url: record.translated_audio_url,
    })
}
