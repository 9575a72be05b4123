//! Synthesis stage: turns the translated text into speech audio, stores it
//! in the output bucket, and performs the terminal job-store update. This
//! is the only stage allowed to mark a job `ready`.

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::job::{JobStage, JobStatus, JobUpdate};
use crate::object_store::ObjectMetadata;
use crate::trigger::SynthesizeRequest;

use super::PipelineContext;

pub async fn handle(ctx: &PipelineContext, request: SynthesizeRequest) -> Result<()> {
    if request.file_key.is_empty() {
        return Err(PipelineError::MissingParameters("file_key"));
    }
    if request.output_file.is_empty() {
        return Err(PipelineError::MissingParameters("output_file"));
    }

    ctx.jobs
        .partial_update(&request.file_key, JobUpdate::stage(JobStage::Synthesizing))?;

    let audio = ctx
        .synthesizer
        .synthesize(
            &request.translated_text,
            &ctx.config.synthesis_voice,
            "mp3",
        )
        .await?;
    if audio.is_empty() {
        return Err(PipelineError::NoAudioProduced);
    }

    ctx.objects
        .put(
            &ctx.config.output_bucket,
            &request.output_file,
            &audio,
            "audio/mpeg",
            &ObjectMetadata::new(),
        )
        .await?;

    let audio_url = ctx
        .objects
        .public_url(&ctx.config.output_bucket, &request.output_file);
    info!(file_key = %request.file_key, %audio_url, "audio stored, job complete");

    // Terminal update.
    ctx.jobs.partial_update(
        &request.file_key,
        JobUpdate {
            translated_audio_url: Some(audio_url),
            stage: Some(JobStage::Complete),
            status: Some(JobStatus::Ready),
            ..Default::default()
        },
    )?;

    Ok(())
}
