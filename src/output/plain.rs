use std::fmt::Write;

use super::{Row, format_value, rows};
use crate::config::OutputConfig;
use crate::models::Snapshot;
use crate::version::banner;

const NAME_WIDTH: usize = 12;
const VALUE_WIDTH: usize = 18;

/// Renders one snapshot as a fixed-width table with the total row last.
pub fn render(snapshot: &Snapshot, config: &OutputConfig) -> String {
    let mut out = String::new();
    let source = snapshot.source.as_deref().unwrap_or("-");
    let _ = writeln!(
        out,
        "{} (source: {source}) unit: {}, statistic: {}",
        banner(),
        config.unit.as_str(),
        config.statistic.as_str()
    );
    if let Some(warning) = &snapshot.warning {
        let _ = writeln!(out, "warning: {warning}");
    }
    let _ = writeln!(
        out,
        "{:>NAME_WIDTH$}  {:>VALUE_WIDTH$} {:>VALUE_WIDTH$} {:>VALUE_WIDTH$}",
        "iface", "Rx", "Tx", "Total"
    );
    let rule = "=".repeat(NAME_WIDTH + 2 + 3 * (VALUE_WIDTH + 1));
    let _ = writeln!(out, "{rule}");

    let mut all = rows(snapshot, config.unit, config.statistic);
    let total = all.pop();
    for row in &all {
        line(&mut out, row, config);
    }
    let _ = writeln!(out, "{}", "-".repeat(rule.len()));
    if let Some(total) = total {
        line(&mut out, &total, config);
    }
    out
}

fn line(out: &mut String, row: &Row, config: &OutputConfig) {
    let fmt = |v| format_value(v, config.unit, config.statistic, config.dynamic_units);
    let _ = writeln!(
        out,
        "{:>NAME_WIDTH$}: {:>VALUE_WIDTH$} {:>VALUE_WIDTH$} {:>VALUE_WIDTH$}",
        row.name,
        fmt(row.rx),
        fmt(row.tx),
        fmt(row.total)
    );
}
