// Shared test helpers

use bwmon::models::*;
use bwmon::registry::{InterfaceRegistry, RegistryConfig};
use std::time::{Duration, Instant};

pub fn bytes(rx_bytes: u64, tx_bytes: u64) -> Counters {
    Counters {
        rx_bytes,
        tx_bytes,
        ..Default::default()
    }
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// 64-bit sample stamped `offset` after `base`.
pub fn sample(base: Instant, offset: Duration, name: &str, counters: Counters) -> CounterSample {
    CounterSample::new(name, counters, CounterWidth::Bits64, base + offset)
}

/// Feeds one tick of `(name, counters)` rows at `base + offset`.
pub fn tick(
    registry: &mut InterfaceRegistry,
    base: Instant,
    offset: Duration,
    rows: &[(&str, Counters)],
) -> bwmon::registry::TickReport {
    let samples = rows
        .iter()
        .map(|(name, c)| sample(base, offset, name, *c))
        .collect();
    registry.record_tick(samples, base + offset)
}

/// Snapshot after two ticks: eth0 at 1000 B/s rx / 500 B/s tx, wlan0 at 250 B/s rx.
pub fn two_tick_snapshot() -> Snapshot {
    let mut registry = InterfaceRegistry::new(RegistryConfig::default());
    let base = Instant::now();
    tick(
        &mut registry,
        base,
        Duration::ZERO,
        &[("eth0", bytes(1000, 1000)), ("wlan0", bytes(0, 0))],
    );
    tick(
        &mut registry,
        base,
        secs(1),
        &[("eth0", bytes(2000, 1500)), ("wlan0", bytes(250, 0))],
    );
    let mut snapshot = registry.snapshot();
    snapshot.source = Some("scripted".into());
    snapshot.timestamp_ms = 1_700_000_000_000;
    snapshot
}
