// Interface registry: name -> aggregation state, fed one sample set per tick.
// Only the poller mutates it; renderers get owned snapshots.

mod entry;

pub use entry::{InterfaceEntry, Observation};

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::filter::InterfaceFilter;
use crate::models::{
    CounterKind, CounterSample, CounterWidth, Counters, InterfaceSnapshot, PerKind, Snapshot,
};
use crate::resolver::PlausibilityLimits;
use crate::rolling::{DEFAULT_WINDOW, RollingStat};

/// Name of the synthetic row summing all counted interfaces.
pub const TOTAL_NAME: &str = "total";

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub window: Duration,
    /// Forced counter width; `None` takes the width reported by the source.
    pub width_override: Option<CounterWidth>,
    pub limits: PlausibilityLimits,
    /// Consecutive absent ticks after which an interface disappears from snapshots.
    pub stale_after_ticks: u32,
    /// Consecutive absent ticks after which its state is dropped.
    pub forget_after_ticks: u32,
    pub filter: InterfaceFilter,
    /// Count filtered-out interfaces in the total row.
    pub sum_hidden: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            width_override: None,
            limits: PlausibilityLimits::default(),
            stale_after_ticks: 1,
            forget_after_ticks: 10,
            filter: InterfaceFilter::All,
            sum_hidden: false,
        }
    }
}

/// Counts from one `record_tick` call, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub seen: usize,
    pub new_interfaces: usize,
    pub updated: usize,
    pub wraps: u32,
    pub resets: u32,
    pub clock_anomalies: usize,
    pub duplicates: usize,
    pub went_stale: usize,
    pub forgotten: usize,
}

#[derive(Debug)]
pub struct InterfaceRegistry {
    config: RegistryConfig,
    entries: HashMap<String, InterfaceEntry>,
    tick: u64,
    next_seq: u64,
    total: PerKind<RollingStat>,
    last_tick_time: Option<Instant>,
    /// Source the held baselines were taken from.
    source: Option<&'static str>,
}

impl InterfaceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let window = config.window;
        Self {
            config,
            entries: HashMap::new(),
            tick: 0,
            next_seq: 0,
            total: PerKind::from_fn(|_| RollingStat::new(window)),
            last_tick_time: None,
            source: None,
        }
    }

    /// Feeds one tick's sample set. Per-interface problems never abort the tick.
    pub fn record_tick(&mut self, samples: Vec<CounterSample>, tick_time: Instant) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };
        let mut seen: HashSet<String> = HashSet::with_capacity(samples.len());
        let mut total_deltas = Counters::default();

        for sample in samples {
            if !seen.insert(sample.interface.clone()) {
                report.duplicates += 1;
                tracing::debug!(interface = %sample.interface, "duplicate interface in sample set ignored");
                continue;
            }
            report.seen += 1;

            let entry = match self.entries.entry(sample.interface.clone()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(v) => {
                    let width = self.config.width_override.unwrap_or(sample.width);
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    report.new_interfaces += 1;
                    tracing::debug!(
                        interface = %sample.interface,
                        counter_width = width.bits(),
                        "new interface"
                    );
                    v.insert(InterfaceEntry::new(
                        sample.interface.clone(),
                        seq,
                        width,
                        self.config.window,
                    ))
                }
            };

            match entry.observe(sample, self.tick, &self.config.limits) {
                Observation::Baseline => {}
                Observation::Updated(delta) => {
                    report.updated += 1;
                    report.wraps += delta.wraps;
                    report.resets += delta.resets;
                    if delta.resets > 0 {
                        tracing::debug!(
                            interface = entry.name(),
                            resets = delta.resets,
                            "implausible counter jump treated as reset"
                        );
                    }
                    if self.config.sum_hidden || self.config.filter.is_visible(entry.name()) {
                        for kind in CounterKind::ALL {
                            let t = total_deltas.get_mut(kind);
                            *t = t.saturating_add(*delta.deltas.get(kind));
                        }
                    }
                }
                Observation::Skipped(anomaly) => {
                    report.clock_anomalies += 1;
                    tracing::debug!(interface = entry.name(), error = %anomaly, "interface skipped this tick");
                }
            }
        }

        let stale_after = self.config.stale_after_ticks;
        let forget_after = self.config.forget_after_ticks;
        self.entries.retain(|name, entry| {
            if seen.contains(name) {
                return true;
            }
            let absent = entry.mark_absent();
            if absent == stale_after {
                report.went_stale += 1;
            }
            if absent >= forget_after {
                report.forgotten += 1;
                tracing::debug!(interface = %name, absent_ticks = absent, "interface retired");
                return false;
            }
            true
        });

        self.update_total(&total_deltas, tick_time);
        report
    }

    fn update_total(&mut self, deltas: &Counters, tick_time: Instant) {
        let elapsed = self
            .last_tick_time
            .and_then(|last| tick_time.checked_duration_since(last));
        if let Some(elapsed) = elapsed
            && !elapsed.is_zero()
        {
            for kind in CounterKind::ALL {
                self.total
                    .get_mut(kind)
                    .update(*deltas.get(kind), elapsed, tick_time);
            }
        }
        if self.last_tick_time.is_none_or(|last| tick_time > last) {
            self.last_tick_time = Some(tick_time);
        }
    }

    /// Visible interfaces in first-sighting order, plus the total row.
    pub fn snapshot(&self) -> Snapshot {
        let mut visible: Vec<&InterfaceEntry> = self
            .entries
            .values()
            .filter(|e| self.is_visible(e))
            .collect();
        visible.sort_by_key(|e| e.first_seen());

        Snapshot {
            tick: self.tick,
            timestamp_ms: 0,
            source: None,
            warning: None,
            interfaces: visible
                .into_iter()
                .map(|e| InterfaceSnapshot {
                    name: e.name().to_string(),
                    stats: e.values(),
                })
                .collect(),
            total: InterfaceSnapshot {
                name: TOTAL_NAME.to_string(),
                stats: self.total.map(RollingStat::values),
            },
        }
    }

    fn is_visible(&self, entry: &InterfaceEntry) -> bool {
        entry.absent_ticks() < self.config.stale_after_ticks
            && self.config.filter.is_visible(entry.name())
    }

    /// Clears max, sum and averaging windows everywhere; baselines are kept.
    pub fn reset_stats(&mut self) {
        for entry in self.entries.values_mut() {
            entry.reset_stats();
        }
        for kind in CounterKind::ALL {
            self.total.get_mut(kind).reset();
        }
    }

    /// Forgets every previous sample; used when the active source changes.
    pub fn rebaseline(&mut self) {
        for entry in self.entries.values_mut() {
            entry.rebaseline();
        }
    }

    /// Notes the source of the next sample set. When it differs from the source of
    /// the held baselines, every interface re-baselines and `true` is returned.
    pub fn adopt_source(&mut self, source: &'static str) -> bool {
        let switched = self.source.is_some_and(|held| held != source);
        if switched {
            self.rebaseline();
        }
        self.source = Some(source);
        switched
    }

    pub fn source(&self) -> Option<&'static str> {
        self.source
    }

    pub fn get(&self, name: &str) -> Option<&InterfaceEntry> {
        self.entries.get(name)
    }

    pub fn total(&self, kind: CounterKind) -> &RollingStat {
        self.total.get(kind)
    }

    /// Tracked interfaces, including stale and filtered ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}
