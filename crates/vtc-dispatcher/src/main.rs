//! Notification dispatcher binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vtc_dispatcher::{Dispatcher, DispatcherConfig};
use vtc_launcher::EcsLauncher;
use vtc_queue::SqsQueue;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting vtc-dispatcher");

    let config = match DispatcherConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load dispatcher config: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match SqsQueue::from_env().await {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create queue client: {}", e);
            std::process::exit(1);
        }
    };

    let launcher = match EcsLauncher::from_env().await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to create job launcher: {}", e);
            std::process::exit(1);
        }
    };

    let dispatcher = Dispatcher::new(config, Arc::new(queue), Arc::new(launcher));

    // Graceful shutdown: finish the current cycle, stop polling.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    if let Err(e) = dispatcher.run(shutdown_rx).await {
        error!("Dispatcher error: {}", e);
        std::process::exit(1);
    }

    info!("Dispatcher shutdown complete");
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
