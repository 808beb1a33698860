// Read-only view handed to renderers once per tick.

use serde::{Deserialize, Serialize};

use super::PerKind;

/// The four figures kept for one counter kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatValues {
    /// Units per second over the latest interval; `None` before the first delta.
    pub rate: Option<f64>,
    pub max: f64,
    /// Total delta since the statistic was created or reset (baseline excluded).
    pub sum: u64,
    /// Trailing-window average in units per second; `None` while the window is empty.
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSnapshot {
    pub name: String,
    pub stats: PerKind<StatValues>,
}

/// Consistent per-tick view of the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Number of ticks recorded so far (the baseline tick is 1).
    pub tick: u64,
    /// Wall-clock publish time, ms since the Unix epoch.
    pub timestamp_ms: u64,
    /// Name of the source adapter that produced the data.
    pub source: Option<String>,
    /// Set when the latest tick failed; statistics are then the last good ones.
    pub warning: Option<String>,
    pub interfaces: Vec<InterfaceSnapshot>,
    pub total: InterfaceSnapshot,
}

impl Snapshot {
    pub fn interface(&self, name: &str) -> Option<&InterfaceSnapshot> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// True once at least one interface has a rate to show.
    pub fn has_rates(&self) -> bool {
        self.total.stats.rx_bytes.rate.is_some()
            || self.interfaces.iter().any(|i| i.stats.rx_bytes.rate.is_some())
    }
}
