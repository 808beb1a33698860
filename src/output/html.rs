use std::fmt::Write;

use super::{format_value, rows};
use crate::config::OutputConfig;
use crate::models::Snapshot;
use crate::version::banner;

/// Renders one snapshot as an html table, optionally wrapped in a self-refreshing page.
pub fn render(snapshot: &Snapshot, config: &OutputConfig) -> String {
    let fmt = |v| format_value(v, config.unit, config.statistic, config.dynamic_units);
    let mut out = String::new();

    if config.html_header {
        let _ = writeln!(out, "<!DOCTYPE html>");
        let _ = writeln!(out, "<html><head>");
        let _ = writeln!(
            out,
            "<meta http-equiv=\"refresh\" content=\"{}\">",
            config.html_refresh_secs
        );
        let _ = writeln!(out, "<title>{}</title>", banner());
        let _ = writeln!(out, "</head><body>");
    }
    if let Some(warning) = &snapshot.warning {
        let _ = writeln!(out, "<p class=\"bwmon-warning\">{}</p>", escape(warning));
    }
    let _ = writeln!(out, "<table class=\"bwmon\">");
    let _ = writeln!(
        out,
        "<tr><th>Interface</th><th>Rx</th><th>Tx</th><th>Total</th></tr>"
    );
    let all = rows(snapshot, config.unit, config.statistic);
    let last = all.len().saturating_sub(1);
    for (i, row) in all.iter().enumerate() {
        let class = if i == last { " class=\"bwmon-total\"" } else { "" };
        let _ = writeln!(
            out,
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.name),
            fmt(row.rx),
            fmt(row.tx),
            fmt(row.total)
        );
    }
    let _ = writeln!(out, "</table>");
    if config.html_header {
        let _ = writeln!(out, "</body></html>");
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_names() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
