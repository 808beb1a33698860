// Counter sources: one adapter per platform statistics mechanism, chosen at runtime
// from an ordered preference list.

mod netstat;
mod proc_net_dev;
pub mod scripted;
mod sysfs;
mod sysinfo_net;

pub use netstat::{NetstatSource, parse_netstat_table};
pub use proc_net_dev::{ProcNetDevSource, parse_net_dev};
pub use scripted::{ScriptStep, ScriptedSource};
pub use sysfs::SysfsSource;
pub use sysinfo_net::SysinfoSource;

use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::SourcesConfig;
use crate::models::CounterSample;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },
    #[error("{source_name} timed out after {timeout:?}")]
    Timeout {
        source_name: &'static str,
        timeout: Duration,
    },
    #[error("{source_name} returned malformed data: {reason}")]
    Malformed {
        source_name: &'static str,
        reason: String,
    },
}

impl AdapterError {
    pub fn unavailable(source_name: &'static str, reason: impl std::fmt::Display) -> Self {
        AdapterError::Unavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_name: &'static str, reason: impl std::fmt::Display) -> Self {
        AdapterError::Malformed {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            AdapterError::Unavailable { source_name, .. }
            | AdapterError::Timeout { source_name, .. }
            | AdapterError::Malformed { source_name, .. } => source_name,
        }
    }
}

/// A platform counter source.
///
/// `collect` returns every interface the source can currently see, stamped at
/// acquisition time, or fails explicitly. It must never fabricate counters.
pub trait Source: Send {
    fn name(&self) -> &'static str;

    fn collect(&mut self, timeout: Option<Duration>) -> Result<Vec<CounterSample>, AdapterError>;
}

/// Configurable source identifiers, in the order given by `[sources].order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ProcNetDev,
    Sysfs,
    Sysinfo,
    Netstat,
}

impl SourceKind {
    /// Platform preference order used when the config does not name one.
    pub fn default_order() -> Vec<SourceKind> {
        if cfg!(target_os = "linux") {
            vec![
                SourceKind::ProcNetDev,
                SourceKind::Sysfs,
                SourceKind::Sysinfo,
                SourceKind::Netstat,
            ]
        } else {
            vec![SourceKind::Sysinfo, SourceKind::Netstat]
        }
    }

    pub fn build(self, config: &SourcesConfig) -> Box<dyn Source> {
        match self {
            SourceKind::ProcNetDev => {
                Box::new(ProcNetDevSource::new(config.proc_net_dev_path.clone()))
            }
            SourceKind::Sysfs => Box::new(SysfsSource::new(config.sysfs_path.clone())),
            SourceKind::Sysinfo => Box::new(SysinfoSource::new()),
            SourceKind::Netstat => Box::new(NetstatSource::new(
                config.netstat_program.clone(),
                config.netstat_args(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("no statistics source available: {}", describe_failures(.0))]
    Exhausted(Vec<AdapterError>),
    #[error("acquisition exceeded {0:?}")]
    Timeout(Duration),
    #[error("previous acquisition still in flight")]
    InFlight,
    #[error("acquisition task failed: {0}")]
    Task(String),
}

fn describe_failures(failures: &[AdapterError]) -> String {
    if failures.is_empty() {
        return "no sources configured".into();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of one successful acquisition.
#[derive(Debug)]
pub struct Acquisition {
    pub source: &'static str,
    pub samples: Vec<CounterSample>,
    pub at: Instant,
}

/// Builds a fresh set of adapters, in preference order.
pub type SourceFactory = Box<dyn Fn() -> Vec<Box<dyn Source>> + Send>;

/// Name of the adapter a chain is inside `collect` of, readable while the chain is locked.
#[derive(Debug, Clone, Default)]
pub struct BusySource(Arc<Mutex<Option<&'static str>>>);

impl BusySource {
    pub fn current(&self) -> Option<&'static str> {
        self.0.lock().map(|name| *name).unwrap_or(None)
    }

    fn set(&self, name: Option<&'static str>) {
        if let Ok(mut current) = self.0.lock() {
            *current = name;
        }
    }
}

/// Ordered adapters with one active at a time.
pub struct SourceChain {
    sources: Vec<Box<dyn Source>>,
    active: Option<usize>,
    busy: BusySource,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self {
            sources,
            active: None,
            busy: BusySource::default(),
        }
    }

    pub fn from_config(config: &SourcesConfig) -> Self {
        Self::new(Self::build_all(config))
    }

    pub fn build_all(config: &SourcesConfig) -> Vec<Box<dyn Source>> {
        config.order.iter().map(|k| k.build(config)).collect()
    }

    /// A chain over `factory`'s adapters minus the one named `excluded`, or `None`
    /// when nothing else is left.
    pub fn rebuilt_without(factory: &SourceFactory, excluded: &str) -> Option<Self> {
        let sources: Vec<_> = factory()
            .into_iter()
            .filter(|s| s.name() != excluded)
            .collect();
        (!sources.is_empty()).then(|| Self::new(sources))
    }

    pub fn busy(&self) -> BusySource {
        self.busy.clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn active_name(&self) -> Option<&'static str> {
        self.active.map(|i| self.sources[i].name())
    }

    /// Activates the first source, in preference order, that returns samples.
    pub fn probe(&mut self, timeout: Option<Duration>) -> Result<Acquisition, AcquireError> {
        self.activate_first(None, timeout, Vec::new())
    }

    /// Collects from the active source, falling back through the others when it
    /// becomes unavailable. A timeout does not trigger fallback.
    pub fn collect(&mut self, timeout: Option<Duration>) -> Result<Acquisition, AcquireError> {
        let Some(index) = self.active else {
            return self.probe(timeout);
        };
        match self.collect_from(index, timeout) {
            Ok(samples) => Ok(self.acquired(index, samples)),
            Err(e @ AdapterError::Timeout { .. }) => Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    source = self.sources[index].name(),
                    error = %e,
                    "active source failed; falling back"
                );
                self.active = None;
                self.activate_first(Some(index), timeout, vec![e])
            }
        }
    }

    fn activate_first(
        &mut self,
        skip: Option<usize>,
        timeout: Option<Duration>,
        mut failures: Vec<AdapterError>,
    ) -> Result<Acquisition, AcquireError> {
        for index in 0..self.sources.len() {
            if skip == Some(index) {
                continue;
            }
            match self.collect_from(index, timeout) {
                Ok(samples) => {
                    tracing::info!(
                        source = self.sources[index].name(),
                        interfaces = samples.len(),
                        "source activated"
                    );
                    self.active = Some(index);
                    return Ok(self.acquired(index, samples));
                }
                Err(e) => {
                    tracing::debug!(source = self.sources[index].name(), error = %e, "source probe failed");
                    failures.push(e);
                }
            }
        }
        Err(AcquireError::Exhausted(failures))
    }

    fn collect_from(
        &mut self,
        index: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<CounterSample>, AdapterError> {
        self.busy.set(Some(self.sources[index].name()));
        let result = self.sources[index].collect(timeout);
        self.busy.set(None);
        result
    }

    fn acquired(&self, index: usize, samples: Vec<CounterSample>) -> Acquisition {
        Acquisition {
            source: self.sources[index].name(),
            samples,
            at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for SourceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceChain")
            .field("sources", &self.names())
            .field("active", &self.active_name())
            .finish()
    }
}
