// Domain models: counter samples in, per-tick snapshots out

mod sample;
mod snapshot;

pub use sample::{CounterKind, CounterSample, CounterWidth, Counters, PerKind};
pub use snapshot::{InterfaceSnapshot, Snapshot, StatValues};
