// Kernel interface table: /proc/net/dev (Linux).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::{AdapterError, Source};
use crate::models::{CounterSample, CounterWidth, Counters};

const NAME: &str = "proc_net_dev";

pub struct ProcNetDevSource {
    path: PathBuf,
    width: CounterWidth,
}

impl ProcNetDevSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            // the kernel prints `unsigned long`
            width: CounterWidth::native(),
        }
    }
}

impl Source for ProcNetDevSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn collect(&mut self, _timeout: Option<Duration>) -> Result<Vec<CounterSample>, AdapterError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AdapterError::unavailable(NAME, format!("{}: {}", self.path.display(), e)))?;
        let timestamp = Instant::now();
        let rows = parse_net_dev(&content).map_err(|e| AdapterError::malformed(NAME, e))?;
        Ok(rows
            .into_iter()
            .map(|(name, counters)| CounterSample::new(name, counters, self.width, timestamp))
            .collect())
    }
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
///
/// Rows that do not parse are skipped rather than reported as zero.
pub fn parse_net_dev(content: &str) -> Result<Vec<(String, Counters)>, String> {
    let mut saw_header = false;
    let mut rows = Vec::new();

    for line in content.lines() {
        if line.contains('|') {
            saw_header = true;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        // old kernels print "eth0:123" with no space after the colon
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = rest.split_whitespace().collect();
        if values.len() < 16 {
            tracing::debug!(line, "short /proc/net/dev row skipped");
            continue;
        }

        let field = |idx: usize| values[idx].parse::<u64>().ok();
        let counters = (|| {
            Some(Counters {
                rx_bytes: field(0)?,
                rx_packets: field(1)?,
                rx_errors: field(2)?,
                tx_bytes: field(8)?,
                tx_packets: field(9)?,
                tx_errors: field(10)?,
            })
        })();
        match counters {
            Some(c) => rows.push((name.trim().to_string(), c)),
            None => tracing::debug!(line, "unparsable /proc/net/dev row skipped"),
        }
    }

    if !saw_header {
        return Err("missing table header".into());
    }
    Ok(rows)
}
