//! Stage handoff: an explicit message queue between pipeline stages.
//!
//! Each stage finishes by pushing the next stage's payload onto the queue
//! and returning; the pipeline worker picks messages up and runs the
//! matching handler in its own task. Delivery is fire-and-forget with
//! at-least-once semantics assumed, so handlers tolerate replays.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::object_store::ObjectEvent;

/// Payload handed to the translation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub bucket: String,
    pub transcript_file: String,
    /// The upload's record key, carried explicitly so the terminal update
    /// lands on the record the upload stage created.
    pub file_key: String,
    pub input_language: String,
    pub output_language: String,
}

/// Payload handed to the synthesis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub translated_text: String,
    pub bucket: String,
    pub output_file: String,
    pub file_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMessage {
    /// New object landed in the input bucket; starts transcription.
    ObjectCreated(ObjectEvent),
    Translate(TranslateRequest),
    Synthesize(SynthesizeRequest),
}

/// Cloneable sending half given to every stage.
#[derive(Clone)]
pub struct StageTrigger {
    tx: mpsc::UnboundedSender<StageMessage>,
}

impl StageTrigger {
    /// Fire-and-forget: the sender does not learn whether the downstream
    /// stage ever ran. A closed queue only means the worker is shutting
    /// down, which the sender cannot act on.
    pub fn send(&self, message: StageMessage) {
        if self.tx.send(message).is_err() {
            tracing::warn!("stage trigger dropped: pipeline worker stopped");
        }
    }
}

pub fn channel() -> (StageTrigger, mpsc::UnboundedReceiver<StageMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StageTrigger { tx }, rx)
}
