// External-process table: `netstat -i` (net-tools) or `netstat -ibn` (BSD/macOS).
// The helper is killed if it outlives the acquisition timeout.

use std::collections::HashSet;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::{AdapterError, Source};
use crate::models::{CounterKind, CounterSample, CounterWidth, Counters};

const NAME: &str = "netstat";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct NetstatSource {
    program: String,
    args: Vec<String>,
    width: CounterWidth,
}

impl NetstatSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            width: CounterWidth::native(),
        }
    }

    pub fn default_args() -> Vec<String> {
        if cfg!(target_os = "linux") {
            vec!["-i".into()]
        } else {
            vec!["-ibn".into()]
        }
    }

    fn run(&self, timeout: Duration) -> Result<String, AdapterError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AdapterError::unavailable(NAME, format!("{}: {}", self.program, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::unavailable(NAME, "no stdout pipe"))?;
        // drain on a thread so a large table cannot block the child on a full pipe
        let reader = std::thread::spawn(move || {
            let mut out = String::new();
            stdout.read_to_string(&mut out).map(|_| out)
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AdapterError::Timeout {
                        source_name: NAME,
                        timeout,
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(AdapterError::unavailable(NAME, e)),
            }
        };

        let out = reader
            .join()
            .map_err(|_| AdapterError::unavailable(NAME, "stdout reader panicked"))?
            .map_err(|e| AdapterError::malformed(NAME, e))?;
        if !status.success() {
            return Err(AdapterError::unavailable(
                NAME,
                format!("{} exited with {}", self.program, status),
            ));
        }
        Ok(out)
    }
}

impl Source for NetstatSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn collect(&mut self, timeout: Option<Duration>) -> Result<Vec<CounterSample>, AdapterError> {
        let out = self.run(timeout.unwrap_or(DEFAULT_TIMEOUT))?;
        let timestamp = Instant::now();
        let rows = parse_netstat_table(&out).map_err(|e| AdapterError::malformed(NAME, e))?;
        Ok(rows
            .into_iter()
            .map(|(name, counters)| CounterSample::new(name, counters, self.width, timestamp))
            .collect())
    }
}

fn column_kind(header: &str) -> Option<CounterKind> {
    match header {
        "RX-OK" | "Ipkts" => Some(CounterKind::RxPackets),
        "RX-ERR" | "Ierrs" => Some(CounterKind::RxErrors),
        "TX-OK" | "Opkts" => Some(CounterKind::TxPackets),
        "TX-ERR" | "Oerrs" => Some(CounterKind::TxErrors),
        "Ibytes" => Some(CounterKind::RxBytes),
        "Obytes" => Some(CounterKind::TxBytes),
        _ => None,
    }
}

/// Parses a netstat interface table, locating columns by header name.
///
/// net-tools:  Iface MTU RX-OK RX-ERR RX-DRP RX-OVR TX-OK TX-ERR TX-DRP TX-OVR Flg
/// BSD:        Name Mtu Network Address Ipkts Ierrs Ibytes Opkts Oerrs Obytes Coll
///
/// BSD rows may omit the Address column, so counter columns are aligned from the
/// right. Only the first row per interface (the link-level row) is kept. Counters
/// the table does not carry (bytes under net-tools) stay zero.
pub fn parse_netstat_table(text: &str) -> Result<Vec<(String, Counters)>, String> {
    let mut lines = text.lines();
    let header: Vec<&str> = lines
        .by_ref()
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .find(|cols| matches!(cols.first(), Some(&"Iface") | Some(&"Name")))
        .ok_or("missing interface table header")?;

    let columns: Vec<(usize, CounterKind)> = header
        .iter()
        .enumerate()
        .filter_map(|(i, h)| column_kind(h).map(|k| (i, k)))
        .collect();
    if !columns
        .iter()
        .any(|(_, k)| matches!(k, CounterKind::RxPackets | CounterKind::RxBytes))
    {
        return Err("no receive counters in table header".into());
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for line in lines {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 2 {
            continue;
        }
        // BSD marks down interfaces with a trailing '*'
        let name = cols[0].trim_end_matches('*');
        if seen.contains(name) {
            continue;
        }
        let shift = cols.len() as isize - header.len() as isize;

        let mut counters = Counters::default();
        let mut ok = true;
        for &(index, kind) in &columns {
            let at = index as isize + shift;
            if at < 1 {
                ok = false;
                break;
            }
            let raw = cols.get(at as usize).copied().unwrap_or("-");
            let value = if raw == "-" { Some(0) } else { raw.parse::<u64>().ok() };
            match value {
                Some(v) => *counters.get_mut(kind) = v,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            seen.insert(name.to_string());
            rows.push((name.to_string(), counters));
        } else {
            tracing::debug!(line, "unparsable netstat row skipped");
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_net_tools_table() {
        let text = "\
Kernel Interface table
Iface      MTU    RX-OK RX-ERR RX-DRP RX-OVR    TX-OK TX-ERR TX-DRP TX-OVR Flg
eth0      1500  1234567      2      0 0        7654321      1      0      0 BMRU
lo       65536     1000      0      0 0           1000      0      0      0 LRU
";
        let rows = parse_netstat_table(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "eth0");
        assert_eq!(rows[0].1.rx_packets, 1_234_567);
        assert_eq!(rows[0].1.rx_errors, 2);
        assert_eq!(rows[0].1.tx_packets, 7_654_321);
        assert_eq!(rows[0].1.tx_errors, 1);
        assert_eq!(rows[0].1.rx_bytes, 0);
    }

    #[test]
    fn parses_bsd_table_with_missing_address_column() {
        let text = "\
Name       Mtu   Network       Address            Ipkts Ierrs     Ibytes    Opkts Oerrs     Obytes  Coll
lo0        16384 <Link#1>                        1234     0     567890     1234     0     567890     0
en0        1500  <Link#4>    a4:83:e7:00:00:01  98765     0  123456789    54321     0   98765432     0
en0        1500  192.168.1     192.168.1.5       98000     -  123000000    54000     -   98000000     -
utun0*     1380  <Link#9>                            0     0          0        0     0          0     0
";
        let rows = parse_netstat_table(text).unwrap();
        let names: Vec<&str> = rows.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["lo0", "en0", "utun0"]);
        assert_eq!(rows[0].1.rx_bytes, 567_890);
        assert_eq!(rows[1].1.rx_packets, 98_765);
        assert_eq!(rows[1].1.rx_bytes, 123_456_789);
        assert_eq!(rows[1].1.tx_bytes, 98_765_432);
    }

    #[test]
    fn rejects_output_without_header() {
        assert!(parse_netstat_table("garbage\nmore garbage\n").is_err());
    }

    #[test]
    fn missing_program_is_unavailable() {
        let mut source = NetstatSource::new("/nonexistent/netstat-binary", vec![]);
        let err = source.collect(Some(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, AdapterError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn hung_helper_times_out() {
        let mut source = NetstatSource::new("sleep", vec!["5".into()]);
        let started = Instant::now();
        let err = source.collect(Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, AdapterError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
