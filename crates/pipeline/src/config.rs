//! Pipeline configuration, environment-driven with builder-style setters.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Everything externally supplied: bucket names, table location, language
/// defaults, provider endpoints, and polling bounds.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_bucket: String,
    pub output_bucket: String,
    /// Root directory of the filesystem object store.
    pub storage_root: PathBuf,
    /// Job table file; `None` keeps the table in memory.
    pub job_table_path: Option<PathBuf>,
    pub default_input_language: String,
    pub default_output_language: String,
    pub synthesis_voice: String,
    pub transcribe_api_url: String,
    pub translate_api_url: String,
    pub synthesize_api_url: String,
    /// Fixed interval between transcription-job status polls.
    pub poll_interval: Duration,
    /// Deadline after which the polling loop gives up with `Timeout`.
    pub poll_deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_bucket: "speech-translation-input".to_string(),
            output_bucket: "speech-translation-output".to_string(),
            storage_root: PathBuf::from("pipeline_data/objects"),
            job_table_path: Some(PathBuf::from("pipeline_data/jobs.json")),
            default_input_language: "en-US".to_string(),
            default_output_language: "es".to_string(),
            synthesis_voice: "Joanna".to_string(),
            transcribe_api_url: "http://localhost:9200".to_string(),
            translate_api_url: "http://localhost:9201".to_string(),
            synthesize_api_url: "http://localhost:9202".to_string(),
            poll_interval: Duration::from_secs(5),
            poll_deadline: Duration::from_secs(600),
        }
    }
}

impl Config {
    /// Reads overrides from the environment on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("INPUT_BUCKET") {
            config.input_bucket = value;
        }
        if let Ok(value) = env::var("OUTPUT_BUCKET") {
            config.output_bucket = value;
        }
        if let Ok(value) = env::var("STORAGE_ROOT") {
            config.storage_root = PathBuf::from(value);
        }
        if let Ok(value) = env::var("JOB_TABLE_PATH") {
            config.job_table_path = Some(PathBuf::from(value));
        }
        if let Ok(value) = env::var("DEFAULT_INPUT_LANGUAGE") {
            config.default_input_language = value;
        }
        if let Ok(value) = env::var("DEFAULT_OUTPUT_LANGUAGE") {
            config.default_output_language = value;
        }
        if let Ok(value) = env::var("SYNTHESIS_VOICE") {
            config.synthesis_voice = value;
        }
        if let Ok(value) = env::var("TRANSCRIBE_API_URL") {
            config.transcribe_api_url = value;
        }
        if let Ok(value) = env::var("TRANSLATE_API_URL") {
            config.translate_api_url = value;
        }
        if let Ok(value) = env::var("SYNTHESIZE_API_URL") {
            config.synthesize_api_url = value;
        }
        if let Some(secs) = env_secs("POLL_INTERVAL_SECS") {
            config.poll_interval = secs;
        }
        if let Some(secs) = env_secs("POLL_DEADLINE_SECS") {
            config.poll_deadline = secs;
        }
        config
    }

    pub fn with_buckets(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_bucket = input.into();
        self.output_bucket = output.into();
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    pub fn with_languages(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.default_input_language = input.into();
        self.default_output_language = output.into();
        self
    }

    pub fn with_poll(mut self, interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_deadline = deadline;
        self
    }

    pub fn in_memory_table(mut self) -> Self {
        self.job_table_path = None;
        self
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}
