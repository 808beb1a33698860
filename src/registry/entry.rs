// Per-interface aggregation state held by the registry.

use std::time::Duration;

use crate::models::{CounterKind, CounterSample, CounterWidth, PerKind, StatValues};
use crate::resolver::{ClockAnomaly, PlausibilityLimits, SampleDelta, resolve_sample};
use crate::rolling::RollingStat;

/// What happened when a sample was fed to its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First sample (or first after a re-baseline): nothing to diff against.
    Baseline,
    Updated(SampleDelta),
    Skipped(ClockAnomaly),
}

#[derive(Debug, Clone)]
pub struct InterfaceEntry {
    name: String,
    first_seen: u64,
    previous: Option<CounterSample>,
    width: CounterWidth,
    stats: PerKind<RollingStat>,
    last_seen_tick: u64,
    absent_ticks: u32,
}

impl InterfaceEntry {
    pub(super) fn new(
        name: String,
        first_seen: u64,
        width: CounterWidth,
        window: Duration,
    ) -> Self {
        Self {
            name,
            first_seen,
            previous: None,
            width,
            stats: PerKind::from_fn(|_| RollingStat::new(window)),
            last_seen_tick: 0,
            absent_ticks: 0,
        }
    }

    pub(super) fn observe(
        &mut self,
        sample: CounterSample,
        tick: u64,
        limits: &PlausibilityLimits,
    ) -> Observation {
        self.last_seen_tick = tick;
        self.absent_ticks = 0;

        let Some(previous) = self.previous.as_ref() else {
            self.previous = Some(sample);
            return Observation::Baseline;
        };

        match resolve_sample(previous, &sample, self.width, limits) {
            Ok(delta) => {
                for kind in CounterKind::ALL {
                    self.stats.get_mut(kind).update(
                        *delta.deltas.get(kind),
                        delta.elapsed,
                        sample.timestamp,
                    );
                }
                self.previous = Some(sample);
                Observation::Updated(delta)
            }
            // keep the old baseline so the change is credited next tick
            Err(ClockAnomaly::Stalled) => Observation::Skipped(ClockAnomaly::Stalled),
            Err(ClockAnomaly::Backwards) => {
                self.previous = Some(sample);
                Observation::Skipped(ClockAnomaly::Backwards)
            }
        }
    }

    pub(super) fn mark_absent(&mut self) -> u32 {
        self.absent_ticks = self.absent_ticks.saturating_add(1);
        self.absent_ticks
    }

    pub(super) fn reset_stats(&mut self) {
        for kind in CounterKind::ALL {
            self.stats.get_mut(kind).reset();
        }
    }

    pub(super) fn rebaseline(&mut self) {
        self.previous = None;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sighting order; lower was seen first.
    pub fn first_seen(&self) -> u64 {
        self.first_seen
    }

    pub fn previous(&self) -> Option<&CounterSample> {
        self.previous.as_ref()
    }

    pub fn width(&self) -> CounterWidth {
        self.width
    }

    pub fn stat(&self, kind: CounterKind) -> &RollingStat {
        self.stats.get(kind)
    }

    pub fn last_seen_tick(&self) -> u64 {
        self.last_seen_tick
    }

    pub fn absent_ticks(&self) -> u32 {
        self.absent_ticks
    }

    pub fn values(&self) -> PerKind<StatValues> {
        self.stats.map(RollingStat::values)
    }
}
