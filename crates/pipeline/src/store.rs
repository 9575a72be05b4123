//! Durable key-value store for job records.
//!
//! In-memory map with optional JSON persistence; every mutation is written
//! back so a restarted server sees the latest committed state. Partial
//! updates from different stages touch disjoint fields, so the store needs
//! no cross-stage transactions; it only guards the stage order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{PipelineError, Result};
use crate::job::{JobRecord, JobUpdate};

#[derive(Debug)]
pub struct JobStore {
    path: Option<PathBuf>,
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobStore {
    /// Volatile store, used in tests and single-run tools.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Store persisted as a JSON table at `path`, loading existing records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let jobs = if path.exists() {
            let data = fs::read_to_string(&path)
                .map_err(|e| PipelineError::Storage(format!("read job table: {e}")))?;
            // A table that cannot be parsed must not be silently replaced:
            // the next save would overwrite every existing record.
            serde_json::from_str(&data)
                .map_err(|e| PipelineError::Storage(format!("parse job table: {e}")))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: Some(path),
            jobs: RwLock::new(jobs),
        })
    }

    /// Inserts a new record. The upload stage is the only caller and the
    /// key is freshly generated, so an existing entry is overwritten.
    pub fn create(&self, record: JobRecord) -> Result<()> {
        let mut jobs = self.jobs.write();
        jobs.insert(record.file_key.clone(), record);
        self.save(&jobs)
    }

    /// Merges `update` into the record for `file_key`.
    ///
    /// `stage` only ever advances; an update carrying an earlier stage
    /// leaves the current stage in place (replayed triggers must not roll
    /// a job backwards).
    pub fn partial_update(&self, file_key: &str, update: JobUpdate) -> Result<()> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(file_key).ok_or(PipelineError::JobNotFound)?;

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(stage) = update.stage {
            if stage > record.stage {
                record.stage = stage;
            }
        }
        if let Some(text) = update.transcription_text {
            record.transcription_text = Some(text);
        }
        if let Some(text) = update.translated_text {
            record.translated_text = Some(text);
        }
        if let Some(url) = update.translated_audio_url {
            record.translated_audio_url = Some(url);
        }

        self.save(&jobs)
    }

    pub fn get(&self, file_key: &str) -> Option<JobRecord> {
        self.jobs.read().get(file_key).cloned()
    }

    fn save(&self, jobs: &HashMap<String, JobRecord>) -> Result<()> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(jobs)
                .map_err(|e| PipelineError::Storage(format!("serialize job table: {e}")))?;
            fs::write(path, json)
                .map_err(|e| PipelineError::Storage(format!("write job table: {e}")))?;
        }
        Ok(())
    }
}
