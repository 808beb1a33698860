// Per-interface statistics files: /sys/class/net/<iface>/statistics/* (Linux, 64-bit).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{AdapterError, Source};
use crate::models::{CounterSample, CounterWidth, Counters};

const NAME: &str = "sysfs";

pub struct SysfsSource {
    root: PathBuf,
}

impl SysfsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Source for SysfsSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn collect(&mut self, _timeout: Option<Duration>) -> Result<Vec<CounterSample>, AdapterError> {
        let dir = fs::read_dir(&self.root)
            .map_err(|e| AdapterError::unavailable(NAME, format!("{}: {}", self.root.display(), e)))?;

        let mut found = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| AdapterError::unavailable(NAME, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let stats_dir = entry.path().join("statistics");
            // interfaces can vanish between read_dir and the reads below
            match read_counters(&stats_dir) {
                Some(counters) => found.push((name, counters)),
                None => tracing::debug!(interface = %name, "no readable statistics; skipped"),
            }
        }
        let timestamp = Instant::now();

        if found.is_empty() {
            return Err(AdapterError::unavailable(
                NAME,
                format!("no interface statistics under {}", self.root.display()),
            ));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found
            .into_iter()
            .map(|(name, counters)| {
                CounterSample::new(name, counters, CounterWidth::Bits64, timestamp)
            })
            .collect())
    }
}

fn read_counters(stats_dir: &Path) -> Option<Counters> {
    let read = |file: &str| -> Option<u64> {
        fs::read_to_string(stats_dir.join(file))
            .ok()?
            .trim()
            .parse()
            .ok()
    };
    Some(Counters {
        rx_bytes: read("rx_bytes")?,
        tx_bytes: read("tx_bytes")?,
        rx_packets: read("rx_packets")?,
        tx_packets: read("tx_packets")?,
        rx_errors: read("rx_errors")?,
        tx_errors: read("tx_errors")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_iface(root: &Path, name: &str, values: [u64; 6]) {
        let dir = root.join(name).join("statistics");
        fs::create_dir_all(&dir).unwrap();
        let files = [
            "rx_bytes",
            "tx_bytes",
            "rx_packets",
            "tx_packets",
            "rx_errors",
            "tx_errors",
        ];
        for (file, value) in files.iter().zip(values) {
            fs::write(dir.join(file), format!("{value}\n")).unwrap();
        }
    }

    #[test]
    fn reads_statistics_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        write_iface(dir.path(), "eth0", [100, 200, 3, 4, 0, 1]);
        write_iface(dir.path(), "lo", [10, 10, 1, 1, 0, 0]);
        // incomplete interface directory is skipped
        fs::create_dir_all(dir.path().join("broken/statistics")).unwrap();

        let samples = SysfsSource::new(dir.path()).collect(None).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].interface, "eth0");
        assert_eq!(samples[0].counters.tx_bytes, 200);
        assert_eq!(samples[0].counters.tx_errors, 1);
        assert_eq!(samples[0].width, CounterWidth::Bits64);
    }

    #[test]
    fn missing_root_is_unavailable() {
        let err = SysfsSource::new("/nonexistent/class/net")
            .collect(None)
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unavailable { .. }));
    }
}
