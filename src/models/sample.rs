// Counter samples: what a source adapter hands to the engine each tick.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Width of a cumulative counter, used to pick the wraparound modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterWidth {
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl CounterWidth {
    /// Width of the platform's `unsigned long`, which is what kernel tables report.
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            CounterWidth::Bits64
        } else {
            CounterWidth::Bits32
        }
    }

    /// 2^32 or 2^64.
    pub const fn modulus(self) -> u128 {
        match self {
            CounterWidth::Bits32 => 1u128 << 32,
            CounterWidth::Bits64 => 1u128 << 64,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            CounterWidth::Bits32 => 32,
            CounterWidth::Bits64 => 64,
        }
    }
}

/// The six counters every source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CounterKind {
    RxBytes,
    TxBytes,
    RxPackets,
    TxPackets,
    RxErrors,
    TxErrors,
}

impl CounterKind {
    pub const ALL: [CounterKind; 6] = [
        CounterKind::RxBytes,
        CounterKind::TxBytes,
        CounterKind::RxPackets,
        CounterKind::TxPackets,
        CounterKind::RxErrors,
        CounterKind::TxErrors,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CounterKind::RxBytes => "rx-bytes",
            CounterKind::TxBytes => "tx-bytes",
            CounterKind::RxPackets => "rx-packets",
            CounterKind::TxPackets => "tx-packets",
            CounterKind::RxErrors => "rx-errors",
            CounterKind::TxErrors => "tx-errors",
        }
    }

    pub const fn is_bytes(self) -> bool {
        matches!(self, CounterKind::RxBytes | CounterKind::TxBytes)
    }
}

/// One value per counter kind. Used for raw counters, deltas and statistics alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerKind<T> {
    pub rx_bytes: T,
    pub tx_bytes: T,
    pub rx_packets: T,
    pub tx_packets: T,
    pub rx_errors: T,
    pub tx_errors: T,
}

impl<T> PerKind<T> {
    pub fn from_fn(mut f: impl FnMut(CounterKind) -> T) -> Self {
        Self {
            rx_bytes: f(CounterKind::RxBytes),
            tx_bytes: f(CounterKind::TxBytes),
            rx_packets: f(CounterKind::RxPackets),
            tx_packets: f(CounterKind::TxPackets),
            rx_errors: f(CounterKind::RxErrors),
            tx_errors: f(CounterKind::TxErrors),
        }
    }

    pub fn get(&self, kind: CounterKind) -> &T {
        match kind {
            CounterKind::RxBytes => &self.rx_bytes,
            CounterKind::TxBytes => &self.tx_bytes,
            CounterKind::RxPackets => &self.rx_packets,
            CounterKind::TxPackets => &self.tx_packets,
            CounterKind::RxErrors => &self.rx_errors,
            CounterKind::TxErrors => &self.tx_errors,
        }
    }

    pub fn get_mut(&mut self, kind: CounterKind) -> &mut T {
        match kind {
            CounterKind::RxBytes => &mut self.rx_bytes,
            CounterKind::TxBytes => &mut self.tx_bytes,
            CounterKind::RxPackets => &mut self.rx_packets,
            CounterKind::TxPackets => &mut self.tx_packets,
            CounterKind::RxErrors => &mut self.rx_errors,
            CounterKind::TxErrors => &mut self.tx_errors,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerKind<U> {
        PerKind::from_fn(|kind| f(self.get(kind)))
    }
}

/// Raw cumulative counters for one interface.
pub type Counters = PerKind<u64>;

/// Immutable snapshot of one interface's counters at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    pub interface: String,
    pub counters: Counters,
    pub width: CounterWidth,
    pub timestamp: Instant,
}

impl CounterSample {
    pub fn new(
        interface: impl Into<String>,
        counters: Counters,
        width: CounterWidth,
        timestamp: Instant,
    ) -> Self {
        Self {
            interface: interface.into(),
            counters,
            width,
            timestamp,
        }
    }
}
