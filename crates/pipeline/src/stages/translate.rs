//! Translation stage: pulls the transcript artifact, translates its plain
//! text, and hands the result to synthesis.

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::job::{JobStage, JobUpdate};
use crate::transcript::{TranscriptDocument, ARTIFACT_SUFFIX};
use crate::trigger::{StageMessage, SynthesizeRequest, TranslateRequest};

use super::PipelineContext;

pub async fn handle(ctx: &PipelineContext, request: TranslateRequest) -> Result<()> {
    if request.bucket.is_empty() {
        return Err(PipelineError::MissingParameters("bucket"));
    }
    if request.transcript_file.is_empty() {
        return Err(PipelineError::MissingParameters("transcript_file"));
    }

    let bytes = ctx
        .objects
        .get(&request.bucket, &request.transcript_file)
        .await?;
    let document: TranscriptDocument = serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::Storage(format!("invalid transcript artifact: {e}")))?;

    let text = match document.transcript_text() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return Err(PipelineError::EmptyTranscript),
    };

    ctx.jobs
        .partial_update(&request.file_key, JobUpdate::stage(JobStage::Translating))?;

    let translated = ctx
        .translator
        .translate(&text, &request.input_language, &request.output_language)
        .await?;
    info!(file_key = %request.file_key, "translation done, triggering synthesis");

    ctx.jobs.partial_update(
        &request.file_key,
        JobUpdate {
            translated_text: Some(translated.clone()),
            ..Default::default()
        },
    )?;

    ctx.trigger.send(StageMessage::Synthesize(SynthesizeRequest {
        translated_text: translated,
        bucket: request.bucket,
        output_file: output_file_name(&request.transcript_file),
        file_key: request.file_key,
    }));

    Ok(())
}

/// Audio artifact name derived from the transcript file, trimmed back to
/// the upload's stem so it matches the `expected_output_file` promised at
/// upload time.
fn output_file_name(transcript_file: &str) -> String {
    let stem = transcript_file
        .strip_suffix(ARTIFACT_SUFFIX)
        .unwrap_or_else(|| transcript_file.split('.').next().unwrap_or(transcript_file));
    format!("{stem}_speech.mp3")
}
