// Renderers for published snapshots: plain text, csv, html. The http mode lives in
// `routes`. Unit and statistic selection is purely presentational.

pub mod csv;
pub mod html;
pub mod plain;

use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::{IsTerminal, Write};
use tokio::sync::watch;

use crate::config::OutputConfig;
use crate::models::{CounterKind, InterfaceSnapshot, Snapshot, StatValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Plain,
    PlainOnce,
    Csv,
    Html,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Bytes,
    Bits,
    Packets,
    Errors,
}

impl Unit {
    /// Counter kinds feeding (rx, tx) for this unit.
    pub fn kinds(self) -> (CounterKind, CounterKind) {
        match self {
            Unit::Bytes | Unit::Bits => (CounterKind::RxBytes, CounterKind::TxBytes),
            Unit::Packets => (CounterKind::RxPackets, CounterKind::TxPackets),
            Unit::Errors => (CounterKind::RxErrors, CounterKind::TxErrors),
        }
    }

    fn factor(self) -> f64 {
        match self {
            Unit::Bits => 8.0,
            _ => 1.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Unit::Bytes => "B",
            Unit::Bits => "b",
            Unit::Packets => "P",
            Unit::Errors => "E",
        }
    }

    fn base(self) -> f64 {
        match self {
            Unit::Bytes => 1024.0,
            _ => 1000.0,
        }
    }

    fn prefixes(self) -> &'static [&'static str; 5] {
        match self {
            Unit::Bytes => &BINARY_PREFIXES,
            _ => &DECIMAL_PREFIXES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Bytes => "bytes",
            Unit::Bits => "bits",
            Unit::Packets => "packets",
            Unit::Errors => "errors",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Rate,
    Max,
    Sum,
    Average,
}

impl Statistic {
    pub fn pick(self, values: &StatValues) -> Option<f64> {
        match self {
            Statistic::Rate => values.rate,
            Statistic::Max => values.rate.map(|_| values.max),
            Statistic::Sum => Some(values.sum as f64),
            Statistic::Average => values.average,
        }
    }

    pub fn is_per_second(self) -> bool {
        !matches!(self, Statistic::Sum)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::Rate => "rate",
            Statistic::Max => "max",
            Statistic::Sum => "sum",
            Statistic::Average => "avg",
        }
    }
}

/// One display row: rx, tx and their sum in the selected unit and statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub rx: Option<f64>,
    pub tx: Option<f64>,
    pub total: Option<f64>,
}

pub fn row(iface: &InterfaceSnapshot, unit: Unit, statistic: Statistic) -> Row {
    let (rx_kind, tx_kind) = unit.kinds();
    let pick = |kind| statistic.pick(iface.stats.get(kind)).map(|v| v * unit.factor());
    let rx = pick(rx_kind);
    let tx = pick(tx_kind);
    let total = match (rx, tx) {
        (Some(r), Some(t)) => Some(r + t),
        _ => None,
    };
    Row {
        name: iface.name.clone(),
        rx,
        tx,
        total,
    }
}

/// Interface rows followed by the total row.
pub fn rows(snapshot: &Snapshot, unit: Unit, statistic: Statistic) -> Vec<Row> {
    snapshot
        .interfaces
        .iter()
        .chain(std::iter::once(&snapshot.total))
        .map(|i| row(i, unit, statistic))
        .collect()
}

const BINARY_PREFIXES: [&str; 5] = ["", "K", "M", "G", "T"];
const DECIMAL_PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];

/// Formats a value as e.g. `12.34 KB/s`; `-` when there is no data yet.
pub fn format_value(value: Option<f64>, unit: Unit, statistic: Statistic, dynamic: bool) -> String {
    let Some(mut v) = value else {
        return "-".into();
    };
    let suffix = if statistic.is_per_second() { "/s" } else { "" };
    let prefixes = unit.prefixes();
    let mut prefix = prefixes[0];
    if dynamic {
        for &p in &prefixes[1..] {
            if v < unit.base() {
                break;
            }
            v /= unit.base();
            prefix = p;
        }
    }
    format!("{:.2} {}{}{}", v, prefix, unit.label(), suffix)
}

/// Destination for csv/html/plain output.
enum Sink {
    Stdout,
    Append(File),
    Rewrite(std::path::PathBuf),
}

impl Sink {
    fn write(&mut self, text: &str) -> std::io::Result<()> {
        match self {
            Sink::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()
            }
            Sink::Append(file) => {
                file.write_all(text.as_bytes())?;
                file.flush()
            }
            Sink::Rewrite(path) => std::fs::write(path, text),
        }
    }
}

fn open_sink(config: &OutputConfig) -> anyhow::Result<Sink> {
    let Some(path) = config.file.as_ref() else {
        return Ok(Sink::Stdout);
    };
    match config.mode {
        OutputMode::Csv => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("opening {}: {}", path.display(), e))?;
            Ok(Sink::Append(file))
        }
        OutputMode::Html => Ok(Sink::Rewrite(path.clone())),
        _ => Ok(Sink::Stdout),
    }
}

/// Renders every published snapshot until `count` outputs were written or the
/// poller stops. Baseline-only snapshots (no rates yet) are not rendered.
pub async fn run(config: OutputConfig, mut rx: watch::Receiver<Snapshot>) -> anyhow::Result<()> {
    anyhow::ensure!(
        config.mode != OutputMode::Http,
        "http output is served by routes, not the stream renderer"
    );
    let mut sink = open_sink(&config)?;
    let clear_screen = config.mode == OutputMode::Plain && std::io::stdout().is_terminal();
    let mut emitted: u64 = 0;

    loop {
        if rx.changed().await.is_err() {
            tracing::debug!("snapshot channel closed; output stopping");
            return Ok(());
        }
        let snapshot = rx.borrow_and_update().clone();
        if !snapshot.has_rates() {
            continue;
        }

        let text = match config.mode {
            OutputMode::Plain if clear_screen => {
                format!("\x1b[2J\x1b[H{}", plain::render(&snapshot, &config))
            }
            OutputMode::Plain | OutputMode::PlainOnce => plain::render(&snapshot, &config),
            OutputMode::Csv => csv::render(&snapshot, &config.csv_delimiter),
            OutputMode::Html => html::render(&snapshot, &config),
            OutputMode::Http => return Ok(()),
        };
        if let Err(e) = sink.write(&text) {
            tracing::warn!(error = %e, operation = "write_output", "output write failed");
        }

        emitted += 1;
        if config.mode == OutputMode::PlainOnce || (config.count > 0 && emitted >= config.count) {
            return Ok(());
        }
    }
}
