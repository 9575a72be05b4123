//! Transcription stage: starts an external transcription job for a newly
//! stored upload, polls it to a terminal state, normalizes the result into
//! the transcript artifact, and hands off to translation.

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::job::{file_stem, JobStage, JobStatus, JobUpdate};
use crate::object_store::{ObjectEvent, ObjectMetadata};
use crate::providers::{SpeechToText, TranscriptionJobState, TranscriptionJobStatus};
use crate::transcript::{artifact_key, TranscriptDocument};
use crate::trigger::{StageMessage, TranslateRequest};

use super::upload::{META_INPUT_LANGUAGE, META_OUTPUT_LANGUAGE};
use super::PipelineContext;

pub async fn handle(ctx: &PipelineContext, event: ObjectEvent) -> Result<()> {
    // Language codes travel as object metadata set by the upload stage.
    let metadata = ctx.objects.head(&event.bucket, &event.key).await?;
    let input_language = language(&metadata, META_INPUT_LANGUAGE, &ctx.config.default_input_language);
    let output_language =
        language(&metadata, META_OUTPUT_LANGUAGE, &ctx.config.default_output_language);

    ctx.jobs.partial_update(
        &event.key,
        JobUpdate {
            stage: Some(JobStage::Transcribing),
            status: Some(JobStatus::Pending),
            ..Default::default()
        },
    )?;

    let stem = file_stem(&event.key);
    let job_name = format!("TranscriptionJob-{}-{}", stem, Utc::now().timestamp());
    let media_uri = format!("s3://{}/{}", event.bucket, event.key);
    info!(%job_name, %media_uri, %input_language, "starting transcription job");

    ctx.transcriber
        .start_job(&job_name, &media_uri, "mp3", &input_language)
        .await?;

    let status = await_completion(
        ctx.transcriber.as_ref(),
        &job_name,
        ctx.config.poll_interval,
        ctx.config.poll_deadline,
    )
    .await?;

    if status.state == TranscriptionJobState::Failed {
        return Err(PipelineError::TranscriptionJobFailed);
    }

    let transcript_uri = status.transcript_uri.ok_or_else(|| PipelineError::Provider {
        provider: "transcription",
        message: "completed job reported no transcript location".to_string(),
    })?;

    let provider_doc = ctx.transcriber.fetch_transcript(&transcript_uri).await?;
    let document = TranscriptDocument::normalize(job_name, "COMPLETED".to_string(), provider_doc);

    let transcription_text = document.transcript_text().unwrap_or_default().to_string();
    ctx.jobs.partial_update(
        &event.key,
        JobUpdate {
            transcription_text: Some(transcription_text),
            ..Default::default()
        },
    )?;

    let transcript_file = artifact_key(stem);
    let json = serde_json::to_vec(&document)
        .map_err(|e| PipelineError::Storage(format!("serialize transcript artifact: {e}")))?;
    ctx.objects
        .put(
            &event.bucket,
            &transcript_file,
            &json,
            "application/json",
            &ObjectMetadata::new(),
        )
        .await?;
    info!(%transcript_file, "transcript artifact stored, triggering translation");

    ctx.trigger.send(StageMessage::Translate(TranslateRequest {
        bucket: event.bucket,
        transcript_file,
        file_key: event.key,
        input_language,
        output_language,
    }));

    Ok(())
}

/// Polls the external job on a fixed interval until it reaches a terminal
/// state, giving up with `Timeout` once the deadline elapses.
async fn await_completion(
    transcriber: &dyn SpeechToText,
    job_name: &str,
    interval: Duration,
    deadline: Duration,
) -> Result<TranscriptionJobStatus> {
    let started = tokio::time::Instant::now();
    loop {
        let status = transcriber.job_status(job_name).await?;
        debug!(%job_name, state = ?status.state, "transcription job polled");
        if status.state.is_terminal() {
            return Ok(status);
        }
        if started.elapsed() >= deadline {
            return Err(PipelineError::Timeout(deadline));
        }
        sleep(interval).await;
    }
}

fn language(metadata: &ObjectMetadata, key: &str, default: &str) -> String {
    metadata
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}
