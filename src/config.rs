use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::filter::InterfaceFilter;
use crate::models::CounterWidth;
use crate::output::{OutputMode, Statistic, Unit};
use crate::registry::RegistryConfig;
use crate::resolver::{
    DEFAULT_MAX_BYTES_PER_SEC, DEFAULT_MAX_BYTES_PER_SEC_32, DEFAULT_MAX_PACKETS_PER_SEC,
    DEFAULT_MAX_PACKETS_PER_SEC_32, PlausibilityLimits,
};
use crate::sources::{NetstatSource, SourceKind};

const DEFAULT_CONFIG_PATH: &str = "bwmon.toml";
/// Shortest poll period; anything finer rounds towards a zero-length interval.
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampling: SamplingConfig,
    pub sources: SourcesConfig,
    pub interfaces: InterfacesConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Polling interval in seconds; fractions allowed.
    pub interval_secs: f64,
    /// Trailing window for the average statistic.
    pub average_window_ms: u64,
    /// Upper bound on one acquisition; a slower tick is skipped.
    pub adapter_timeout_ms: u64,
    /// How often to log engine stats at INFO level.
    pub stats_log_interval_secs: u64,
    /// Consecutive ticks blocked behind one adapter call before that adapter is dropped.
    pub stuck_after_ticks: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0.5,
            average_window_ms: 30_000,
            adapter_timeout_ms: 1_000,
            stats_log_interval_secs: 60,
            stuck_after_ticks: 3,
        }
    }
}

/// Counter width override: `auto` keeps what each source reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum WidthOverride {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl WidthOverride {
    pub fn forced(self) -> Option<CounterWidth> {
        match self {
            WidthOverride::Auto => None,
            WidthOverride::Bits32 => Some(CounterWidth::Bits32),
            WidthOverride::Bits64 => Some(CounterWidth::Bits64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Preference order; the first source that works is used.
    pub order: Vec<SourceKind>,
    pub proc_net_dev_path: PathBuf,
    pub sysfs_path: PathBuf,
    pub netstat_program: String,
    /// Defaults to `-i` on Linux and `-ibn` elsewhere.
    pub netstat_args: Option<Vec<String>>,
    pub counter_width: WidthOverride,
    /// A wrapped delta implying more than this is treated as a counter reset.
    pub max_bytes_per_sec: f64,
    pub max_packets_per_sec: f64,
    /// Same ceilings for 32-bit counters.
    pub max_bytes_per_sec_32: f64,
    pub max_packets_per_sec_32: f64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order: SourceKind::default_order(),
            proc_net_dev_path: PathBuf::from("/proc/net/dev"),
            sysfs_path: PathBuf::from("/sys/class/net"),
            netstat_program: "netstat".into(),
            netstat_args: None,
            counter_width: WidthOverride::Auto,
            max_bytes_per_sec: DEFAULT_MAX_BYTES_PER_SEC,
            max_packets_per_sec: DEFAULT_MAX_PACKETS_PER_SEC,
            max_bytes_per_sec_32: DEFAULT_MAX_BYTES_PER_SEC_32,
            max_packets_per_sec_32: DEFAULT_MAX_PACKETS_PER_SEC_32,
        }
    }
}

impl SourcesConfig {
    pub fn netstat_args(&self) -> Vec<String> {
        self.netstat_args
            .clone()
            .unwrap_or_else(NetstatSource::default_args)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterfacesConfig {
    /// "eth0,wlan0" shows only those; "%lo" hides those; empty shows all.
    pub filter: InterfaceFilter,
    pub stale_after_ticks: u32,
    pub forget_after_ticks: u32,
    /// Include filtered-out interfaces in the total row.
    pub sum_hidden: bool,
}

impl Default for InterfacesConfig {
    fn default() -> Self {
        Self {
            filter: InterfaceFilter::All,
            stale_after_ticks: 1,
            forget_after_ticks: 10,
            sum_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    pub unit: Unit,
    pub statistic: Statistic,
    /// Scale values to K/M/G.
    pub dynamic_units: bool,
    /// Stop after this many outputs; 0 runs until interrupted.
    pub count: u64,
    pub csv_delimiter: String,
    /// Target file for csv (appended) and html (rewritten); stdout when unset.
    pub file: Option<PathBuf>,
    pub html_refresh_secs: u64,
    /// Emit the full html document around the table.
    pub html_header: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Plain,
            unit: Unit::Bytes,
            statistic: Statistic::Rate,
            dynamic_units: true,
            count: 0,
            csv_delimiter: ";".into(),
            file: None,
            html_refresh_secs: 5,
            html_header: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8686,
            host: "127.0.0.1".into(),
        }
    }
}

impl AppConfig {
    /// Reads the file named by `CONFIG_FILE`, else `bwmon.toml`. A missing default file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
                Self::load_from_str(&s)
            }
            Err(_) => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    let config = AppConfig::default();
                    config.validate()?;
                    Ok(config)
                }
                Err(e) => Err(anyhow::anyhow!("reading config {}: {}", DEFAULT_CONFIG_PATH, e)),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.sampling.interval_secs > 0.0 && self.sampling.interval_secs <= 86_400.0,
            "sampling.interval_secs must be in (0, 86400], got {}",
            self.sampling.interval_secs
        );
        anyhow::ensure!(
            self.sample_interval() >= MIN_SAMPLE_INTERVAL,
            "sampling.interval_secs must be at least {:?}, got {}",
            MIN_SAMPLE_INTERVAL,
            self.sampling.interval_secs
        );
        anyhow::ensure!(
            self.sampling.average_window_ms > 0,
            "sampling.average_window_ms must be > 0, got {}",
            self.sampling.average_window_ms
        );
        anyhow::ensure!(
            self.sampling.adapter_timeout_ms > 0,
            "sampling.adapter_timeout_ms must be > 0, got {}",
            self.sampling.adapter_timeout_ms
        );
        anyhow::ensure!(
            self.sampling.stats_log_interval_secs > 0,
            "sampling.stats_log_interval_secs must be > 0, got {}",
            self.sampling.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.sampling.stuck_after_ticks > 0,
            "sampling.stuck_after_ticks must be > 0, got {}",
            self.sampling.stuck_after_ticks
        );
        anyhow::ensure!(
            !self.sources.order.is_empty(),
            "sources.order must name at least one source"
        );
        anyhow::ensure!(
            self.sources.max_bytes_per_sec > 0.0,
            "sources.max_bytes_per_sec must be > 0, got {}",
            self.sources.max_bytes_per_sec
        );
        anyhow::ensure!(
            self.sources.max_packets_per_sec > 0.0,
            "sources.max_packets_per_sec must be > 0, got {}",
            self.sources.max_packets_per_sec
        );
        anyhow::ensure!(
            self.sources.max_bytes_per_sec_32 > 0.0,
            "sources.max_bytes_per_sec_32 must be > 0, got {}",
            self.sources.max_bytes_per_sec_32
        );
        anyhow::ensure!(
            self.sources.max_packets_per_sec_32 > 0.0,
            "sources.max_packets_per_sec_32 must be > 0, got {}",
            self.sources.max_packets_per_sec_32
        );
        anyhow::ensure!(
            self.interfaces.stale_after_ticks > 0,
            "interfaces.stale_after_ticks must be > 0, got {}",
            self.interfaces.stale_after_ticks
        );
        anyhow::ensure!(
            self.interfaces.forget_after_ticks >= self.interfaces.stale_after_ticks,
            "interfaces.forget_after_ticks ({}) must be >= stale_after_ticks ({})",
            self.interfaces.forget_after_ticks,
            self.interfaces.stale_after_ticks
        );
        anyhow::ensure!(
            !self.output.csv_delimiter.is_empty(),
            "output.csv_delimiter must be non-empty"
        );
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sampling.interval_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.sampling.adapter_timeout_ms)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            window: Duration::from_millis(self.sampling.average_window_ms),
            width_override: self.sources.counter_width.forced(),
            limits: PlausibilityLimits {
                max_bytes_per_sec: self.sources.max_bytes_per_sec,
                max_packets_per_sec: self.sources.max_packets_per_sec,
                max_bytes_per_sec_32: self.sources.max_bytes_per_sec_32,
                max_packets_per_sec_32: self.sources.max_packets_per_sec_32,
            },
            stale_after_ticks: self.interfaces.stale_after_ticks,
            forget_after_ticks: self.interfaces.forget_after_ticks,
            filter: self.interfaces.filter.clone(),
            sum_hidden: self.interfaces.sum_hidden,
        }
    }
}
