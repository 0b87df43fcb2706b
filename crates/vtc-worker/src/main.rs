//! Transcode worker binary.
//!
//! One process handles exactly one job. The only outward signal is the
//! exit status: 0 on success, 1 on failure. The queue is never touched
//! from here.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vtc_media::{FfmpegEngine, TranscodeEngine};
use vtc_models::default_plan;
use vtc_storage::S3Store;
use vtc_worker::{JobContext, JobRunner, WorkerConfig, WorkerResult};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting vtc-worker");

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("Job failed: {}", e);
            1
        }
    };

    // The job context (and with it the work directory) has been
    // dropped by the time we get here.
    std::process::exit(exit_code);
}

async fn run() -> WorkerResult<()> {
    let config = WorkerConfig::from_env()?;
    info!("Worker config: {:?}", config);

    let store = Arc::new(S3Store::from_env().await);
    let engine: Arc<dyn TranscodeEngine> =
        Arc::new(FfmpegEngine::with_timeout(config.transcode_timeout.as_secs())?);

    let ctx = JobContext::create(
        config.source.clone(),
        config.destination_bucket.clone(),
        &config.work_dir,
    )
    .await?;

    let runner = JobRunner::new(store, engine, default_plan());
    runner.run(&ctx).await?;
    Ok(())
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vtc=info".parse().expect("static directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}
