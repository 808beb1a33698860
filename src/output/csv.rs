// One line per interface per tick, total last:
// unix_secs;iface;rx_bytes/s;tx_bytes/s;rx_bytes;tx_bytes;rx_packets/s;tx_packets/s;
// rx_packets;tx_packets;rx_errors/s;tx_errors/s;rx_errors;tx_errors
// Rates are the latest-interval rate; sums are cumulative since startup.

use std::fmt::Write;

use crate::models::{CounterKind, InterfaceSnapshot, Snapshot};

const PAIRS: [(CounterKind, CounterKind); 3] = [
    (CounterKind::RxBytes, CounterKind::TxBytes),
    (CounterKind::RxPackets, CounterKind::TxPackets),
    (CounterKind::RxErrors, CounterKind::TxErrors),
];

pub fn render(snapshot: &Snapshot, delimiter: &str) -> String {
    let secs = snapshot.timestamp_ms / 1000;
    let mut out = String::new();
    for iface in snapshot.interfaces.iter().chain(std::iter::once(&snapshot.total)) {
        let _ = writeln!(out, "{}", line(secs, iface, delimiter));
    }
    out
}

fn line(secs: u64, iface: &InterfaceSnapshot, delimiter: &str) -> String {
    let mut fields = vec![secs.to_string(), iface.name.clone()];
    for (rx, tx) in PAIRS {
        let rx = iface.stats.get(rx);
        let tx = iface.stats.get(tx);
        fields.push(format!("{:.2}", rx.rate.unwrap_or(0.0)));
        fields.push(format!("{:.2}", tx.rate.unwrap_or(0.0)));
        fields.push(rx.sum.to_string());
        fields.push(tx.sum.to_string());
    }
    fields.join(delimiter)
}
