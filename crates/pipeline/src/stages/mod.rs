//! Pipeline stages and the worker that drives them.
//!
//! Every stage is a stateless handler over an injected [`PipelineContext`];
//! there is no shared mutable state between stages beyond the job store
//! and the object store. A stage that fails never triggers its successor,
//! and the worker marks the job record `failed` so status queries can tell
//! a stalled job from one still in flight.

pub mod status;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
pub mod upload;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::job::{JobStatus, JobUpdate};
use crate::object_store::ObjectStore;
use crate::providers::{SpeechSynthesizer, SpeechToText, Translator};
use crate::store::JobStore;
use crate::trigger::{StageMessage, StageTrigger};

/// Explicitly constructed client handles passed into every stage entry
/// point, so tests can substitute fakes for any collaborator.
pub struct PipelineContext {
    pub config: Config,
    pub jobs: Arc<JobStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub transcriber: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub trigger: StageTrigger,
}

/// Consumes stage messages and runs each handler in its own task. The
/// sender never waits on the handler: progress is only observable through
/// the job store.
pub fn run_pipeline(
    ctx: Arc<PipelineContext>,
    mut rx: mpsc::UnboundedReceiver<StageMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                dispatch(&ctx, message).await;
            });
        }
        info!("pipeline worker stopped");
    })
}

/// Runs one stage handler and applies the failure policy: log, mark the
/// record failed, do not trigger the next stage.
pub async fn dispatch(ctx: &PipelineContext, message: StageMessage) {
    let (stage_name, file_key, result) = match message {
        StageMessage::ObjectCreated(event) => {
            let file_key = event.key.clone();
            ("transcription", file_key, transcribe::handle(ctx, event).await)
        }
        StageMessage::Translate(request) => {
            let file_key = request.file_key.clone();
            ("translation", file_key, translate::handle(ctx, request).await)
        }
        StageMessage::Synthesize(request) => {
            let file_key = request.file_key.clone();
            ("synthesis", file_key, synthesize::handle(ctx, request).await)
        }
    };

    if let Err(err) = result {
        error!(stage = stage_name, %file_key, %err, "stage failed");
        // A record that was never created cannot be marked; nothing else
        // to do for that case.
        let _ = ctx
            .jobs
            .partial_update(&file_key, JobUpdate::status(JobStatus::Failed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use base64::Engine;
    use parking_lot::Mutex;

    use crate::error::{PipelineError, Result};
    use crate::job::{file_stem, JobRecord, JobStage};
    use crate::multipart::tests_support as multipart_support;
    use crate::object_store::{FsObjectStore, ObjectMetadata};
    use crate::providers::{TranscriptionJobState, TranscriptionJobStatus};
    use crate::transcript::{
        artifact_key, ProviderTranscript, TranscriptAlternative, TranscriptDocument,
        TranscriptItem, TranscriptResults, TranscriptText,
    };
    use crate::trigger;

    use upload::UploadRequest;

    struct FakeTranscriber {
        states: Mutex<VecDeque<TranscriptionJobState>>,
        started: Mutex<Vec<String>>,
    }

    impl FakeTranscriber {
        fn completing_after(polls: usize) -> Self {
            let mut states = VecDeque::new();
            for _ in 0..polls {
                states.push_back(TranscriptionJobState::InProgress);
            }
            states.push_back(TranscriptionJobState::Completed);
            Self {
                states: Mutex::new(states),
                started: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                states: Mutex::new(VecDeque::from([TranscriptionJobState::Failed])),
                started: Mutex::new(Vec::new()),
            }
        }

        fn never_finishing() -> Self {
            Self {
                states: Mutex::new(VecDeque::new()),
                started: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl crate::providers::SpeechToText for FakeTranscriber {
        async fn start_job(
            &self,
            job_name: &str,
            _media_uri: &str,
            _media_format: &str,
            _language_code: &str,
        ) -> Result<()> {
            self.started.lock().push(job_name.to_string());
            Ok(())
        }

        async fn job_status(&self, _job_name: &str) -> Result<TranscriptionJobStatus> {
            let state = self
                .states
                .lock()
                .pop_front()
                .unwrap_or(TranscriptionJobState::InProgress);
            Ok(TranscriptionJobStatus {
                state,
                transcript_uri: matches!(state, TranscriptionJobState::Completed)
                    .then(|| "https://results/doc.json".to_string()),
            })
        }

        async fn fetch_transcript(&self, _uri: &str) -> Result<ProviderTranscript> {
            Ok(ProviderTranscript {
                results: TranscriptResults {
                    transcripts: vec![TranscriptText {
                        transcript: "hello world".to_string(),
                    }],
                    items: vec![TranscriptItem {
                        start_time: Some("0.0".to_string()),
                        end_time: Some("0.4".to_string()),
                        item_type: "pronunciation".to_string(),
                        alternatives: vec![
                            TranscriptAlternative {
                                confidence: Some("0.99".to_string()),
                                content: "hello".to_string(),
                            },
                            TranscriptAlternative {
                                confidence: Some("0.10".to_string()),
                                content: "hollow".to_string(),
                            },
                        ],
                    }],
                },
            })
        }
    }

    struct FakeTranslator;

    #[async_trait]
    impl crate::providers::Translator for FakeTranslator {
        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
            Ok(format!("[{target}] {text}"))
        }
    }

    struct FakeSynthesizer {
        audio: Vec<u8>,
    }

    #[async_trait]
    impl crate::providers::SpeechSynthesizer for FakeSynthesizer {
        async fn synthesize(&self, _text: &str, _voice: &str, _format: &str) -> Result<Vec<u8>> {
            Ok(self.audio.clone())
        }
    }

    struct Fixture {
        ctx: Arc<PipelineContext>,
        rx: mpsc::UnboundedReceiver<StageMessage>,
        _dir: tempfile::TempDir,
    }

    fn fixture(transcriber: FakeTranscriber, audio: Vec<u8>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default()
            .with_buckets("input-bucket", "output-bucket")
            .with_storage_root(dir.path())
            .with_poll(Duration::from_millis(1), Duration::from_millis(250))
            .in_memory_table();

        let (trigger, rx) = trigger::channel();
        let ctx = Arc::new(PipelineContext {
            config,
            jobs: Arc::new(JobStore::in_memory()),
            objects: Arc::new(FsObjectStore::new(dir.path())),
            transcriber: Arc::new(transcriber),
            translator: Arc::new(FakeTranslator),
            synthesizer: Arc::new(FakeSynthesizer { audio }),
            trigger,
        });

        Fixture {
            ctx,
            rx,
            _dir: dir,
        }
    }

    async fn drain(fixture: &mut Fixture) {
        while let Ok(message) = fixture.rx.try_recv() {
            dispatch(&fixture.ctx, message).await;
        }
    }

    fn upload_body() -> (Vec<u8>, String) {
        multipart_support::form(&[
            ("file", Some("clip.mp3"), b"ID3 fake audio".as_slice()),
            ("input_language", None, b"en-US".as_slice()),
            ("output_language", None, b"es".as_slice()),
        ])
    }

    #[tokio::test]
    async fn test_full_pipeline_reaches_ready() {
        let mut fixture = fixture(FakeTranscriber::completing_after(2), b"mp3!".to_vec());

        let (body, content_type) = upload_body();
        let file_key = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body,
                base64_encoded: false,
            },
        )
        .await
        .unwrap();

        // Upload alone leaves the record at the initial state.
        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.status, crate::job::JobStatus::Uploaded);
        assert_eq!(record.stage, JobStage::Upload);

        drain(&mut fixture).await;

        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.status, crate::job::JobStatus::Ready);
        assert_eq!(record.stage, JobStage::Complete);
        assert_eq!(record.transcription_text.as_deref(), Some("hello world"));
        assert_eq!(record.translated_text.as_deref(), Some("[es] hello world"));

        let expected_url = format!(
            "https://output-bucket.s3.amazonaws.com/{}_speech.mp3",
            file_stem(&file_key)
        );
        assert_eq!(record.translated_audio_url.as_deref(), Some(expected_url.as_str()));

        // The audio artifact actually exists under the promised name.
        let audio = fixture
            .ctx
            .objects
            .get("output-bucket", &record.expected_output_file)
            .await
            .unwrap();
        assert_eq!(audio, b"mp3!");
    }

    #[tokio::test]
    async fn test_failed_transcription_job_marks_record_failed() {
        let mut fixture = fixture(FakeTranscriber::failing(), b"mp3!".to_vec());

        let (body, content_type) = upload_body();
        let file_key = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body,
                base64_encoded: false,
            },
        )
        .await
        .unwrap();

        drain(&mut fixture).await;

        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.status, crate::job::JobStatus::Failed);
        // The pipeline never advanced past transcription.
        assert_eq!(record.stage, JobStage::Transcribing);
        assert!(record.translated_text.is_none());
        assert!(record.translated_audio_url.is_none());
    }

    #[tokio::test]
    async fn test_polling_deadline_surfaces_timeout() {
        let mut fixture = fixture(FakeTranscriber::never_finishing(), b"mp3!".to_vec());

        let (body, content_type) = upload_body();
        let file_key = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body,
                base64_encoded: false,
            },
        )
        .await
        .unwrap();

        drain(&mut fixture).await;

        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.status, crate::job::JobStatus::Failed);
        assert_eq!(record.stage, JobStage::Transcribing);
    }

    #[tokio::test]
    async fn test_empty_audio_payload_fails_synthesis() {
        let mut fixture = fixture(FakeTranscriber::completing_after(0), Vec::new());

        let (body, content_type) = upload_body();
        let file_key = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body,
                base64_encoded: false,
            },
        )
        .await
        .unwrap();

        drain(&mut fixture).await;

        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.status, crate::job::JobStatus::Failed);
        assert_eq!(record.stage, JobStage::Synthesizing);
        assert!(record.translated_audio_url.is_none());
    }

    #[tokio::test]
    async fn test_base64_transport_body_is_decoded_before_parsing() {
        let mut fixture = fixture(FakeTranscriber::completing_after(0), b"mp3!".to_vec());

        let (body, content_type) = upload_body();
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(&body)
            .into_bytes();
        let file_key = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body: encoded,
                base64_encoded: true,
            },
        )
        .await
        .unwrap();

        // The stored upload is the decoded audio, not the transport bytes.
        let stored = fixture
            .ctx
            .objects
            .get("input-bucket", &file_key)
            .await
            .unwrap();
        assert_eq!(stored, b"ID3 fake audio");

        drain(&mut fixture).await;
        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.status, crate::job::JobStatus::Ready);
    }

    #[tokio::test]
    async fn test_invalid_base64_transport_body_is_client_error() {
        let fixture = fixture(FakeTranscriber::completing_after(0), b"mp3!".to_vec());

        let (_, content_type) = upload_body();
        let err = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body: b"not base64 at all!!!".to_vec(),
                base64_encoded: true,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::MalformedBody(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_empty_transcript_artifact_fails_translation() {
        let mut fixture = fixture(FakeTranscriber::completing_after(0), b"mp3!".to_vec());

        let file_key = "20260101T120000Z_ab12.mp3".to_string();
        fixture
            .ctx
            .jobs
            .create(JobRecord::new(
                file_key.clone(),
                "clip.mp3".to_string(),
                "20260101T120000Z_ab12_speech.mp3".to_string(),
            ))
            .unwrap();
        fixture
            .ctx
            .jobs
            .partial_update(&file_key, JobUpdate::stage(JobStage::Transcribing))
            .unwrap();

        // Artifact with no transcript text at all.
        let document = TranscriptDocument::normalize(
            "TranscriptionJob-x-1".to_string(),
            "COMPLETED".to_string(),
            ProviderTranscript {
                results: TranscriptResults::default(),
            },
        );
        let transcript_file = artifact_key(file_stem(&file_key));
        fixture
            .ctx
            .objects
            .put(
                "input-bucket",
                &transcript_file,
                &serde_json::to_vec(&document).unwrap(),
                "application/json",
                &ObjectMetadata::new(),
            )
            .await
            .unwrap();

        let err = translate::handle(
            &fixture.ctx,
            trigger::TranslateRequest {
                bucket: "input-bucket".to_string(),
                transcript_file,
                file_key: file_key.clone(),
                input_language: "en-US".to_string(),
                output_language: "es".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyTranscript));
        // Synthesis was never triggered and the record did not advance.
        assert!(fixture.rx.try_recv().is_err());
        let record = fixture.ctx.jobs.get(&file_key).unwrap();
        assert_eq!(record.stage, JobStage::Transcribing);
        assert!(record.translated_text.is_none());
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_client_error() {
        let fixture = fixture(FakeTranscriber::completing_after(0), b"mp3!".to_vec());

        let (body, content_type) =
            multipart_support::form(&[("input_language", None, b"en-US".as_slice())]);
        let err = upload::handle(
            &fixture.ctx,
            UploadRequest {
                content_type,
                body,
                base64_encoded: false,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::MissingFile));
        assert!(err.is_client_error());
    }
}
