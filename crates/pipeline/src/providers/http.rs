//! HTTP-backed provider clients.
//!
//! Each client wraps a configurable REST endpoint behind the matching
//! provider trait, so a deployment can point the pipeline at whichever
//! speech/translation service fronts these operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::transcript::ProviderTranscript;

use super::{SpeechSynthesizer, SpeechToText, TranscriptionJobState, TranscriptionJobStatus, Translator};

fn provider_err(provider: &'static str, message: impl Into<String>) -> PipelineError {
    PipelineError::Provider {
        provider,
        message: message.into(),
    }
}

async fn check(provider: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(provider_err(provider, format!("{status} - {body}")))
    }
}

/// Speech-to-text client against a job-oriented REST API.
pub struct HttpSpeechToText {
    api_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct StartJobRequest<'a> {
    job_name: &'a str,
    media_uri: &'a str,
    media_format: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: TranscriptionJobState,
    transcript_uri: Option<String>,
}

impl HttpSpeechToText {
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn start_job(
        &self,
        job_name: &str,
        media_uri: &str,
        media_format: &str,
        language_code: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/jobs", self.api_url))
            .json(&StartJobRequest {
                job_name,
                media_uri,
                media_format,
                language_code,
            })
            .send()
            .await
            .map_err(|e| provider_err("transcription", e.to_string()))?;

        check("transcription", response).await?;
        Ok(())
    }

    async fn job_status(&self, job_name: &str) -> Result<TranscriptionJobStatus> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.api_url, job_name))
            .send()
            .await
            .map_err(|e| provider_err("transcription", e.to_string()))?;

        let status: JobStatusResponse = check("transcription", response)
            .await?
            .json()
            .await
            .map_err(|e| provider_err("transcription", e.to_string()))?;

        Ok(TranscriptionJobStatus {
            state: status.status,
            transcript_uri: status.transcript_uri,
        })
    }

    async fn fetch_transcript(&self, uri: &str) -> Result<ProviderTranscript> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| provider_err("transcription", e.to_string()))?;

        check("transcription", response)
            .await?
            .json()
            .await
            .map_err(|e| provider_err("transcription", e.to_string()))
    }
}

/// Text translation client.
pub struct HttpTranslator {
    api_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TranslateRequestBody<'a> {
    text: &'a str,
    source_language: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponseBody {
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/translate", self.api_url))
            .json(&TranslateRequestBody {
                text,
                source_language: source,
                target_language: target,
            })
            .send()
            .await
            .map_err(|e| provider_err("translation", e.to_string()))?;

        let body: TranslateResponseBody = check("translation", response)
            .await?
            .json()
            .await
            .map_err(|e| provider_err("translation", e.to_string()))?;

        Ok(body.translated_text)
    }
}

/// Text-to-speech client; responds with raw audio bytes.
pub struct HttpSpeechSynthesizer {
    api_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequestBody<'a> {
    text: &'a str,
    voice: &'a str,
    output_format: &'a str,
}

impl HttpSpeechSynthesizer {
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str, output_format: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/synthesize", self.api_url))
            .json(&SynthesizeRequestBody {
                text,
                voice,
                output_format,
            })
            .send()
            .await
            .map_err(|e| provider_err("synthesis", e.to_string()))?;

        let bytes = check("synthesis", response)
            .await?
            .bytes()
            .await
            .map_err(|e| provider_err("synthesis", e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_job_request_wire_shape() {
        let request = StartJobRequest {
            job_name: "TranscriptionJob-x-1",
            media_uri: "s3://input/x.mp3",
            media_format: "mp3",
            language_code: "en-US",
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"job_name\":\"TranscriptionJob-x-1\""));
        assert!(json.contains("\"language_code\":\"en-US\""));
    }

    #[test]
    fn test_job_status_response_parses() {
        let body: JobStatusResponse = serde_json::from_str(
            r#"{"status":"COMPLETED","transcript_uri":"https://results/x.json"}"#,
        )
        .unwrap();
        assert_eq!(body.status, TranscriptionJobState::Completed);
        assert_eq!(body.transcript_uri.as_deref(), Some("https://results/x.json"));
    }
}
