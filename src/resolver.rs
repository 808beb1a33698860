// Delta/wraparound resolution between two consecutive counter samples.
// Pure functions; the registry decides what to do with the outcome.

use std::time::Duration;

use crate::models::{CounterKind, CounterSample, CounterWidth, Counters};

/// Upper bounds on believable rates. A wrapped delta implying more than this is a reset.
///
/// 32-bit counters get their own, lower bounds: a whole 32-bit wrap fits under the
/// 64-bit ceilings at any sane interval, so those could never flag a reset there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibilityLimits {
    pub max_bytes_per_sec: f64,
    /// Applies to packet and error counters.
    pub max_packets_per_sec: f64,
    pub max_bytes_per_sec_32: f64,
    pub max_packets_per_sec_32: f64,
}

/// 2 Tbit/s.
pub const DEFAULT_MAX_BYTES_PER_SEC: f64 = 250_000_000_000.0;
pub const DEFAULT_MAX_PACKETS_PER_SEC: f64 = 4_000_000_000.0;
/// 10 Gbit/s.
pub const DEFAULT_MAX_BYTES_PER_SEC_32: f64 = 1_250_000_000.0;
/// 10GbE line rate with minimum-size frames, rounded up.
pub const DEFAULT_MAX_PACKETS_PER_SEC_32: f64 = 15_000_000.0;

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            max_bytes_per_sec: DEFAULT_MAX_BYTES_PER_SEC,
            max_packets_per_sec: DEFAULT_MAX_PACKETS_PER_SEC,
            max_bytes_per_sec_32: DEFAULT_MAX_BYTES_PER_SEC_32,
            max_packets_per_sec_32: DEFAULT_MAX_PACKETS_PER_SEC_32,
        }
    }
}

impl PlausibilityLimits {
    pub fn ceiling(&self, kind: CounterKind, width: CounterWidth) -> f64 {
        match (width, kind.is_bytes()) {
            (CounterWidth::Bits32, true) => self.max_bytes_per_sec_32,
            (CounterWidth::Bits32, false) => self.max_packets_per_sec_32,
            (CounterWidth::Bits64, true) => self.max_bytes_per_sec,
            (CounterWidth::Bits64, false) => self.max_packets_per_sec,
        }
    }
}

/// How one counter moved between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Ordinary increase.
    Delta(u64),
    /// Counter rolled over zero once.
    Wrapped(u64),
    /// Implausible wrap: treated as a counter reset, contributes nothing.
    Reset,
}

impl Resolution {
    pub fn delta(self) -> u64 {
        match self {
            Resolution::Delta(d) | Resolution::Wrapped(d) => d,
            Resolution::Reset => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockAnomaly {
    #[error("no time elapsed between samples")]
    Stalled,
    #[error("sample timestamp went backwards")]
    Backwards,
}

/// Resolves one counter. Assumes at most one wrap between `prev` and `curr`.
pub fn resolve_counter(
    prev: u64,
    curr: u64,
    width: CounterWidth,
    elapsed: Duration,
    ceiling_per_sec: f64,
) -> Resolution {
    if curr >= prev {
        return Resolution::Delta(curr - prev);
    }
    let modulus = width.modulus();
    let prev = prev as u128;
    if prev >= modulus {
        // value never fit this width; the counter was replaced
        return Resolution::Reset;
    }
    let wrapped = (modulus - prev) + curr as u128;
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 || wrapped as f64 / secs > ceiling_per_sec {
        return Resolution::Reset;
    }
    match u64::try_from(wrapped) {
        Ok(d) => Resolution::Wrapped(d),
        Err(_) => Resolution::Reset,
    }
}

/// Deltas for all six counters of one interface over one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDelta {
    pub deltas: Counters,
    pub elapsed: Duration,
    pub wraps: u32,
    pub resets: u32,
}

/// Resolves every counter of `curr` against `prev`.
pub fn resolve_sample(
    prev: &CounterSample,
    curr: &CounterSample,
    width: CounterWidth,
    limits: &PlausibilityLimits,
) -> Result<SampleDelta, ClockAnomaly> {
    let elapsed = curr
        .timestamp
        .checked_duration_since(prev.timestamp)
        .ok_or(ClockAnomaly::Backwards)?;
    if elapsed.is_zero() {
        return Err(ClockAnomaly::Stalled);
    }

    let mut wraps = 0;
    let mut resets = 0;
    let deltas = Counters::from_fn(|kind| {
        let resolution = resolve_counter(
            *prev.counters.get(kind),
            *curr.counters.get(kind),
            width,
            elapsed,
            limits.ceiling(kind, width),
        );
        match resolution {
            Resolution::Wrapped(_) => wraps += 1,
            Resolution::Reset => resets += 1,
            Resolution::Delta(_) => {}
        }
        resolution.delta()
    });

    Ok(SampleDelta {
        deltas,
        elapsed,
        wraps,
        resets,
    })
}
