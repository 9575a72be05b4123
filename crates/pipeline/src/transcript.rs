//! Transcript artifact: the normalized document handed from the
//! transcription stage to the translation stage.
//!
//! Providers return richly-annotated results with multiple alternatives
//! per recognized token. Downstream stages depend on one stable schema, so
//! the transcription stage reduces each token to its first alternative and
//! stores the result as a durable JSON object next to the upload.

use serde::{Deserialize, Serialize};

/// Suffix appended to the upload's stem to name the stored artifact.
pub const ARTIFACT_SUFFIX: &str = "_output.json";

/// Raw result document fetched from the speech-to-text provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTranscript {
    pub results: TranscriptResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResults {
    pub transcripts: Vec<TranscriptText>,
    pub items: Vec<TranscriptItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptText {
    pub transcript: String,
}

/// One recognized token with timing and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    pub alternatives: Vec<TranscriptAlternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptAlternative {
    pub confidence: Option<String>,
    pub content: String,
}

/// The normalized artifact persisted to object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub job_name: String,
    pub status: String,
    pub results: TranscriptResults,
}

impl TranscriptDocument {
    /// Reduces a provider document to the stable artifact schema, keeping
    /// only the first alternative of each token.
    pub fn normalize(job_name: String, status: String, provider: ProviderTranscript) -> Self {
        let items = provider
            .results
            .items
            .into_iter()
            .map(|item| {
                let first = item.alternatives.into_iter().take(1).collect();
                TranscriptItem {
                    start_time: item.start_time,
                    end_time: item.end_time,
                    item_type: item.item_type,
                    alternatives: first,
                }
            })
            .collect();

        Self {
            job_name,
            status,
            results: TranscriptResults {
                transcripts: provider.results.transcripts,
                items,
            },
        }
    }

    /// Plain text of the first transcript alternative, if any.
    pub fn transcript_text(&self) -> Option<&str> {
        self.results
            .transcripts
            .first()
            .map(|t| t.transcript.as_str())
    }
}

/// Name of the artifact derived from the upload key's stem.
pub fn artifact_key(file_stem: &str) -> String {
    format!("{file_stem}{ARTIFACT_SUFFIX}")
}
