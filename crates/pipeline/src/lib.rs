//! Asynchronous speech-translation pipeline.
//!
//! An uploaded recording moves through four stages (upload, transcription,
//! translation, synthesis), each an independently triggered
//! stateless handler. Stages communicate only through the shared job store
//! and one-shot triggering of the next stage; clients observe progress by
//! polling the status projection.

pub mod config;
pub mod error;
pub mod job;
pub mod multipart;
pub mod object_store;
pub mod providers;
pub mod stages;
pub mod store;
pub mod transcript;
pub mod trigger;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use job::{JobRecord, JobStage, JobStatus, JobUpdate};
pub use object_store::{FsObjectStore, ObjectEvent, ObjectStore};
pub use stages::{run_pipeline, PipelineContext};
pub use store::JobStore;
pub use trigger::{StageMessage, StageTrigger};
