//! Upload stage: decodes the incoming request, persists the audio to the
//! input bucket, creates the job record, and kicks off transcription.

use base64::Engine;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::job::{file_stem, JobRecord};
use crate::multipart::{self, FormValue};
use crate::object_store::{ObjectEvent, ObjectMetadata};
use crate::trigger::StageMessage;

use super::PipelineContext;

/// Metadata keys attached to the stored upload; read back by the
/// transcription stage instead of a second record lookup.
pub const META_UPLOAD_TIME: &str = "upload_time";
pub const META_EXPECTED_OUTPUT: &str = "expected_output_file";
pub const META_INPUT_LANGUAGE: &str = "input-language";
pub const META_OUTPUT_LANGUAGE: &str = "output-language";

/// An HTTP-style upload request as seen by the stage: headers already
/// reduced to what the stage needs.
pub struct UploadRequest {
    pub content_type: String,
    pub body: Vec<u8>,
    /// Body arrived base64-encoded in transport.
    pub base64_encoded: bool,
}

/// Runs the upload stage and returns the new job's `file_key`.
pub async fn handle(ctx: &PipelineContext, request: UploadRequest) -> Result<String> {
    let body = if request.base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(&request.body)
            .map_err(|e| PipelineError::MalformedBody(format!("invalid base64 body: {e}")))?
    } else {
        request.body
    };

    let form = multipart::decode(&body, &request.content_type)?;
    if form.skipped_parts > 0 {
        warn!(skipped = form.skipped_parts, "skipped unparseable multipart parts");
    }

    let (original_filename, content) = match form.fields.get("file") {
        Some(FormValue::File { filename, content }) if !content.is_empty() => {
            (filename.clone(), content.clone())
        }
        _ => return Err(PipelineError::MissingFile),
    };

    let input_language = form
        .fields
        .get("input_language")
        .and_then(|v| v.as_text())
        .unwrap_or(&ctx.config.default_input_language)
        .to_string();
    let output_language = form
        .fields
        .get("output_language")
        .and_then(|v| v.as_text())
        .unwrap_or(&ctx.config.default_output_language)
        .to_string();

    let now = Utc::now();
    let file_key = generate_file_key(&now.format("%Y%m%dT%H%M%SZ").to_string());
    let expected_output_file = format!("{}_speech.mp3", file_stem(&file_key));

    let mut metadata = ObjectMetadata::new();
    metadata.insert(META_UPLOAD_TIME.to_string(), now.to_rfc3339());
    metadata.insert(META_EXPECTED_OUTPUT.to_string(), expected_output_file.clone());
    metadata.insert(META_INPUT_LANGUAGE.to_string(), input_language);
    metadata.insert(META_OUTPUT_LANGUAGE.to_string(), output_language);

    ctx.objects
        .put(
            &ctx.config.input_bucket,
            &file_key,
            &content,
            "audio/mpeg",
            &metadata,
        )
        .await?;

    ctx.jobs.create(JobRecord::new(
        file_key.clone(),
        original_filename,
        expected_output_file,
    ))?;

    info!(%file_key, "upload stored, triggering transcription");
    ctx.trigger.send(StageMessage::ObjectCreated(ObjectEvent {
        bucket: ctx.config.input_bucket.clone(),
        key: file_key.clone(),
    }));

    Ok(file_key)
}

/// `<UTC timestamp, second precision>_<4-char random suffix>.mp3`; the
/// suffix keeps same-second uploads apart, collisions are treated as
/// negligible.
fn generate_file_key(timestamp: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string()[..4].to_string();
    format!("{timestamp}_{suffix}.mp3")
}
