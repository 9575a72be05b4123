//! Speech translation server: accepts audio uploads, drives the
//! transcribe/translate/synthesize pipeline, and serves status queries.

mod api;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use pipeline::providers::{HttpSpeechSynthesizer, HttpSpeechToText, HttpTranslator};
use pipeline::{run_pipeline, trigger, Config, FsObjectStore, JobStore, PipelineContext};

/// Uploads are whole audio recordings; allow up to 25 MiB.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "translate_server=debug,pipeline=debug".into()),
        )
        .init();

    let config = Config::from_env();
    info!(
        input_bucket = %config.input_bucket,
        output_bucket = %config.output_bucket,
        "starting speech translation server"
    );

    let jobs = Arc::new(match &config.job_table_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            JobStore::open(path)?
        }
        None => JobStore::in_memory(),
    });
    let objects = Arc::new(FsObjectStore::new(config.storage_root.clone()));

    let (stage_trigger, rx) = trigger::channel();
    let ctx = Arc::new(PipelineContext {
        transcriber: Arc::new(HttpSpeechToText::new(config.transcribe_api_url.clone())),
        translator: Arc::new(HttpTranslator::new(config.translate_api_url.clone())),
        synthesizer: Arc::new(HttpSpeechSynthesizer::new(config.synthesize_api_url.clone())),
        config,
        jobs,
        objects,
        trigger: stage_trigger,
    });

    let worker = run_pipeline(ctx.clone(), rx);

    let app = Router::new()
        .route("/upload", post(api::upload))
        .route("/status/:file_key", get(api::job_status))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // CORS for browser clients
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    info!("listening on http://{}", addr);
    info!("  POST /upload            - Upload a recording");
    info!("  GET  /status/:file_key  - Poll job status");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let served = axum::serve(listener, app).await;
    worker.abort();
    served?;
    Ok(())
}
