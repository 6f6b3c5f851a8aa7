//! Report rendering
//!
//! Three renderers share one [`RunReport`]:
//!
//! - [`text`]: the throughput table and, unless hidden, the latency table
//! - [`terse`]: one comma-separated line per phase plus a total line, for scripts
//! - [`json`]: the full report plus host details, written to a file
//!
//! The text and terse renderers write to any `io::Write` so the binary can
//! hand them stdout and tests can hand them a `Vec<u8>`.

pub mod json;
pub mod terse;
pub mod text;

use crate::config::Config;
use crate::stats::aggregator::RunReport;
use std::io::{self, Write};

/// Render `report` to `out` in the format `config` asks for
pub fn render<W: Write>(report: &RunReport, config: &Config, out: &mut W) -> io::Result<()> {
    if config.terse {
        return terse::write_terse(report, out);
    }

    text::write_results(report, out)?;
    if config.show_latency {
        text::write_latency(report, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregator::RunTotals;

    fn rendered(config: &Config) -> String {
        let report = RunTotals::new().report(4096, 2);
        let mut out = Vec::new();
        render(&report, config, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_shows_both_tables() {
        let text = rendered(&Config::default());
        assert!(text.contains("results for 2 concurrent io threads"));
        assert!(text.contains("latency results"));
    }

    #[test]
    fn test_hidden_latency() {
        let config = Config { show_latency: false, ..Default::default() };
        let text = rendered(&config);
        assert!(text.contains("results for 2"));
        assert!(!text.contains("latency results"));
    }

    #[test]
    fn test_terse_replaces_tables() {
        let config = Config { terse: true, ..Default::default() };
        let text = rendered(&config);
        assert!(text.starts_with("write:"));
        assert!(!text.contains('|'));
    }
}
