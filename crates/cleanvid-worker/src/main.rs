//! Directory monitor binary.

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cleanvid_media::FfmpegCleaner;
use cleanvid_queue::RedisBroker;
use cleanvid_worker::{metrics, Monitor, MonitorConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cleanvid=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting cleanvid-monitor");

    let config = MonitorConfig::from_env();
    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Monitor config: {:?}", config);

    if let Some(addr) = &config.metrics_addr {
        match metrics::init_metrics(addr) {
            Ok(()) => info!("Prometheus metrics listening on {}", addr),
            Err(e) => {
                error!("Failed to start metrics exporter: {}", e);
                std::process::exit(1);
            }
        }
    }

    let broker = match RedisBroker::new(&config.broker) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to create broker client: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = broker.ping().await {
        // Not fatal: the cycle still runs its local work and retries the broker.
        error!("Broker not reachable yet: {}", e);
    }

    let mut cleaner = FfmpegCleaner::new();
    if let Some(secs) = config.ffmpeg_timeout_secs {
        cleaner = cleaner.with_timeout(secs);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, finishing the current file");
        let _ = shutdown_tx.send(true);
    });

    let monitor = Monitor::new(config, broker, cleaner, shutdown_rx);
    if let Err(e) = monitor.run().await {
        error!("Monitor stopped: {}", e);
        std::process::exit(1);
    }

    info!("Monitor shutdown complete");
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!("Cannot listen for SIGTERM: {}", e);
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
}
