// Library-backed counters via sysinfo. The Networks handle is owned by the
// adapter instance, not shared process-wide.

use std::time::{Duration, Instant};

use sysinfo::Networks;

use super::{AdapterError, Source};
use crate::models::{CounterSample, CounterWidth, Counters};

const NAME: &str = "sysinfo";

pub struct SysinfoSource {
    networks: Option<Networks>,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    /// The interface list is loaded on first collect, so building the chain stays cheap.
    pub fn new() -> Self {
        Self { networks: None }
    }
}

impl Source for SysinfoSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn collect(&mut self, _timeout: Option<Duration>) -> Result<Vec<CounterSample>, AdapterError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(AdapterError::unavailable(NAME, "platform not supported by sysinfo"));
        }
        let fresh = self.networks.is_none();
        let networks = self
            .networks
            .get_or_insert_with(Networks::new_with_refreshed_list);
        if !fresh {
            networks.refresh(true);
        }
        let timestamp = Instant::now();

        let mut samples: Vec<CounterSample> = networks
            .list()
            .iter()
            .map(|(name, data)| {
                let counters = Counters {
                    rx_bytes: data.total_received(),
                    tx_bytes: data.total_transmitted(),
                    rx_packets: data.total_packets_received(),
                    tx_packets: data.total_packets_transmitted(),
                    rx_errors: data.total_errors_on_received(),
                    tx_errors: data.total_errors_on_transmitted(),
                };
                CounterSample::new(name.clone(), counters, CounterWidth::Bits64, timestamp)
            })
            .collect();

        if samples.is_empty() {
            return Err(AdapterError::unavailable(NAME, "no network interfaces reported"));
        }
        samples.sort_by(|a, b| a.interface.cmp(&b.interface));
        Ok(samples)
    }
}
