use anyhow::Result;
use bwmon::*;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use bwmon::output::OutputMode;
use bwmon::version::{NAME, VERSION};

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the table/csv/html output, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = NAME,
        version = VERSION,
        mode = ?app_config.output.mode,
        interval_secs = app_config.sampling.interval_secs,
        "starting"
    );

    let chain = sources::SourceChain::from_config(&app_config.sources);
    tracing::debug!(sources = ?chain.names(), "source preference order");
    let sources = Arc::new(Mutex::new(chain));
    let adapter_timeout = app_config.adapter_timeout();
    let probe_deadline = adapter_timeout.saturating_mul(app_config.sources.order.len() as u32);

    let mut registry = registry::InterfaceRegistry::new(app_config.registry_config());
    let initial = worker::baseline(&sources, &mut registry, adapter_timeout, probe_deadline)
        .await
        .map_err(|e| anyhow::anyhow!("startup: {}", e))?;
    tracing::info!(
        source = initial.source.as_deref().unwrap_or("-"),
        interfaces = registry.len(),
        "baseline taken"
    );

    let (snapshot_tx, snapshot_rx) = watch::channel(initial);
    let ws_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let sources_config = app_config.sources.clone();

    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            sources,
            registry,
            snapshot_tx,
            ws_connections: ws_connections.clone(),
            shutdown_rx,
            rebuild: Some(Box::new(move || {
                sources::SourceChain::build_all(&sources_config)
            })),
        },
        worker::WorkerConfig {
            sample_interval: app_config.sample_interval(),
            adapter_timeout,
            stats_log_interval_secs: app_config.sampling.stats_log_interval_secs,
            stuck_after_ticks: app_config.sampling.stuck_after_ticks,
        },
    );

    if app_config.output.mode == OutputMode::Http {
        let app = routes::app(snapshot_rx, ws_connections, app_config.output.clone());
        let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", addr);

        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = shutdown_signal() => {
                tracing::info!("Received shutdown signal");
            }
        }
    } else {
        tokio::select! {
            result = output::run(app_config.output.clone(), snapshot_rx) => {
                result?;
            }
            _ = shutdown_signal() => {
                tracing::info!("Received shutdown signal");
            }
        }
    }

    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    Ok(())
}
