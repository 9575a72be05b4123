//! Job record: the persistent state tracking one upload through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse externally-visible job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploaded,
    Pending,
    Ready,
    Failed,
}

/// Fine-grained pipeline position. The derived ordering is the stage
/// order; a record's stage only ever moves forward through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Upload,
    Transcribing,
    Translating,
    Synthesizing,
    Complete,
}

/// One job record per uploaded file, keyed by `file_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Globally unique; assigned once at upload, immutable afterwards.
    pub file_key: String,

    /// Client-supplied, informational only.
    pub original_filename: String,

    pub status: JobStatus,

    pub stage: JobStage,

    /// Set once at creation.
    pub upload_time: DateTime<Utc>,

    /// Precomputed name of the audio artifact the synthesis stage will
    /// produce, so callers can predict it before the pipeline finishes.
    pub expected_output_file: String,

    pub transcription_text: Option<String>,

    pub translated_text: Option<String>,

    /// Presence implies completion.
    pub translated_audio_url: Option<String>,
}

impl JobRecord {
    /// Fresh record as written by the upload stage.
    pub fn new(file_key: String, original_filename: String, expected_output_file: String) -> Self {
        Self {
            file_key,
            original_filename,
            status: JobStatus::Uploaded,
            stage: JobStage::Upload,
            upload_time: Utc::now(),
            expected_output_file,
            transcription_text: None,
            translated_text: None,
            translated_audio_url: None,
        }
    }
}

/// Partial update merged into an existing record. Each stage reports only
/// the fields it owns plus `stage`/`status`; `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub stage: Option<JobStage>,
    pub transcription_text: Option<String>,
    pub translated_text: Option<String>,
    pub translated_audio_url: Option<String>,
}

impl JobUpdate {
    pub fn stage(stage: JobStage) -> Self {
        Self {
            stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Key prefix up to the first `.`, used to derive artifact names.
pub fn file_stem(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}
