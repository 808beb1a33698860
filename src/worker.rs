// Polling worker: one acquisition per tick, fed into the registry, published as a
// snapshot. Acquisitions run on the blocking pool under a deadline; the registry
// is owned by this task so it is the only writer.

use crate::models::Snapshot;
use crate::registry::{InterfaceRegistry, TickReport};
use crate::sources::{
    AcquireError, AdapterError, Acquisition, BusySource, SourceChain, SourceFactory,
};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, TryLockError};
use tokio::sync::{oneshot, watch};
use tokio::time::{Duration, Instant, interval, interval_at};
use tracing::Instrument;

/// Chain, registry, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub sources: Arc<Mutex<SourceChain>>,
    /// Already holding the baseline tick (see [`baseline`]).
    pub registry: InterfaceRegistry,
    pub snapshot_tx: watch::Sender<Snapshot>,
    pub ws_connections: Arc<AtomicUsize>,
    pub shutdown_rx: oneshot::Receiver<()>,
    /// Rebuilds the adapters when one is stuck; without it a stuck chain is waited on.
    pub rebuild: Option<SourceFactory>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub sample_interval: Duration,
    /// Deadline for one acquisition; a slower tick is skipped.
    pub adapter_timeout: Duration,
    /// How often to log engine stats (real seconds).
    pub stats_log_interval_secs: u64,
    /// Consecutive in-flight ticks after which the blocked adapter is dropped.
    pub stuck_after_ticks: u32,
}

/// Counters reported by the periodic "engine stats" log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub skipped: u64,
    pub timeouts: u64,
    pub in_flight: u64,
    pub exhausted: u64,
    pub resets: u64,
    pub clock_anomalies: u64,
    pub source_switches: u64,
    pub chain_rebuilds: u64,
}

impl EngineStats {
    fn record_failure(&mut self, error: &AcquireError) {
        self.skipped += 1;
        match error {
            AcquireError::Timeout(_) | AcquireError::Adapter(AdapterError::Timeout { .. }) => {
                self.timeouts += 1
            }
            AcquireError::InFlight => self.in_flight += 1,
            AcquireError::Exhausted(_) => self.exhausted += 1,
            _ => {}
        }
    }

    fn record_tick(&mut self, report: &TickReport, switched: bool) {
        self.resets += u64::from(report.resets);
        self.clock_anomalies += report.clock_anomalies as u64;
        if switched {
            self.source_switches += 1;
        }
    }
}

/// Runs one acquisition on the blocking pool, bounded by `deadline`.
///
/// At most one acquisition is in flight: if a previous one (e.g. one abandoned
/// after its deadline) still holds the chain, this returns `InFlight` at once.
pub async fn acquire(
    sources: &Arc<Mutex<SourceChain>>,
    adapter_timeout: Duration,
    deadline: Duration,
) -> Result<Acquisition, AcquireError> {
    let chain = Arc::clone(sources);
    let task = tokio::task::spawn_blocking(move || {
        let mut chain = match chain.try_lock() {
            Ok(chain) => chain,
            Err(TryLockError::WouldBlock) => return Err(AcquireError::InFlight),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        chain.collect(Some(adapter_timeout))
    });
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(AcquireError::Task(e.to_string())),
        Err(_) => Err(AcquireError::Timeout(deadline)),
    }
}

/// Takes the startup acquisition and records it as the baseline tick.
/// Failure here means no source works on this host.
pub async fn baseline(
    sources: &Arc<Mutex<SourceChain>>,
    registry: &mut InterfaceRegistry,
    adapter_timeout: Duration,
    deadline: Duration,
) -> Result<Snapshot, AcquireError> {
    let acquisition = acquire(sources, adapter_timeout, deadline).await?;
    let (snapshot, report, _) = apply(registry, acquisition);
    tracing::debug!(
        tick = report.tick,
        interfaces = report.seen,
        "baseline recorded"
    );
    Ok(snapshot)
}

/// Feeds a successful acquisition into the registry and builds the snapshot to publish.
///
/// The source switch is decided here, against the source of the samples the
/// registry actually holds: an acquisition dropped at its deadline never counts.
fn apply(
    registry: &mut InterfaceRegistry,
    acquisition: Acquisition,
) -> (Snapshot, TickReport, bool) {
    let previous = registry.source();
    let switched = registry.adopt_source(acquisition.source);
    if switched {
        tracing::warn!(
            from = previous,
            to = acquisition.source,
            "statistics source changed; re-baselining all interfaces"
        );
    }
    // sample stamps are authoritative; the total row uses the latest of them
    let tick_time = acquisition
        .samples
        .iter()
        .map(|s| s.timestamp)
        .max()
        .unwrap_or(acquisition.at);
    let report = registry.record_tick(acquisition.samples, tick_time);

    let mut snapshot = registry.snapshot();
    snapshot.timestamp_ms = now_ms();
    snapshot.source = Some(acquisition.source.to_string());
    (snapshot, report, switched)
}

fn busy_of(sources: &Arc<Mutex<SourceChain>>) -> BusySource {
    match sources.lock() {
        Ok(chain) => chain.busy(),
        Err(poisoned) => poisoned.into_inner().busy(),
    }
}

/// Swaps a chain whose adapter never returned for a fresh one without that adapter.
/// The blocked call keeps the old chain until it returns, then drops it.
fn replace_stuck(
    factory: &SourceFactory,
    busy: &BusySource,
) -> Option<(Arc<Mutex<SourceChain>>, BusySource)> {
    let Some(stuck) = busy.current() else {
        tracing::warn!("acquisitions blocked, but no adapter is mid-collect; waiting");
        return None;
    };
    let Some(chain) = SourceChain::rebuilt_without(factory, stuck) else {
        tracing::warn!(source = stuck, "adapter stuck and no other source configured; waiting");
        return None;
    };
    tracing::warn!(
        source = stuck,
        remaining = ?chain.names(),
        "adapter stuck in a blocking call; rebuilding the source chain without it"
    );
    let busy = chain.busy();
    Some((Arc::new(Mutex::new(chain)), busy))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                operation = "get_timestamp",
                "system time error"
            );
            0
        })
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        mut sources,
        mut registry,
        snapshot_tx,
        ws_connections,
        mut shutdown_rx,
        rebuild,
    } = deps;
    let WorkerConfig {
        sample_interval,
        adapter_timeout,
        stats_log_interval_secs,
        stuck_after_ticks,
    } = config;
    let mut busy = busy_of(&sources);

    let stats_log_interval = Duration::from_secs(stats_log_interval_secs);

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        sample_interval_ms = sample_interval.as_millis() as u64
    );

    tokio::spawn(async move {
        // the baseline was taken just before spawning, so the first delta is one interval out
        let mut tick = interval_at(Instant::now() + sample_interval, sample_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        stats_log_tick.tick().await;

        let mut stats = EngineStats::default();
        let mut blocked_ticks: u32 = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let result = tokio::select! {
                        r = acquire(&sources, adapter_timeout, adapter_timeout) => r,
                        _ = &mut shutdown_rx => {
                            tracing::debug!("Worker shutting down mid-acquisition");
                            break;
                        }
                    };
                    stats.ticks += 1;
                    match result {
                        Ok(acquisition) => {
                            blocked_ticks = 0;
                            let (snapshot, report, switched) = apply(&mut registry, acquisition);
                            stats.record_tick(&report, switched);
                            tracing::debug!(
                                tick = report.tick,
                                seen = report.seen,
                                updated = report.updated,
                                wraps = report.wraps,
                                resets = report.resets,
                                went_stale = report.went_stale,
                                forgotten = report.forgotten,
                                "tick recorded"
                            );
                            snapshot_tx.send_replace(snapshot);
                        }
                        Err(e) => {
                            stats.record_failure(&e);
                            tracing::warn!(
                                error = %e,
                                operation = "acquire",
                                "tick skipped; statistics unchanged"
                            );
                            let warning = e.to_string();
                            snapshot_tx.send_modify(|s| {
                                s.warning = Some(warning);
                                s.timestamp_ms = now_ms();
                            });

                            if matches!(e, AcquireError::InFlight) {
                                blocked_ticks += 1;
                            } else {
                                blocked_ticks = 0;
                            }
                            if blocked_ticks >= stuck_after_ticks {
                                blocked_ticks = 0;
                                if let Some((chain, chain_busy)) =
                                    rebuild.as_ref().and_then(|f| replace_stuck(f, &busy))
                                {
                                    sources = chain;
                                    busy = chain_busy;
                                    stats.chain_rebuilds += 1;
                                }
                            }
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ticks = stats.ticks,
                        skipped = stats.skipped,
                        timeouts = stats.timeouts,
                        in_flight = stats.in_flight,
                        exhausted = stats.exhausted,
                        resets = stats.resets,
                        clock_anomalies = stats.clock_anomalies,
                        source_switches = stats.source_switches,
                        chain_rebuilds = stats.chain_rebuilds,
                        interfaces = registry.len(),
                        ws_clients = ws_connections.load(std::sync::atomic::Ordering::Relaxed),
                        "engine stats"
                    );
                }
            }
        }
    }
    .instrument(worker_span))
}
