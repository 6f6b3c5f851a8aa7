//! Terse comma-separated output
//!
//! Every phase gets a line whether it ran or not:
//!
//! ```text
//! write:<mb>,<real>,<user>,<sys>,<avg_ms>,<max_ms>,<pct_short>,<pct_long>
//! ```
//!
//! followed by `total:<avg_ms>,<max_ms>,<pct_short>,<pct_long>`. All values
//! carry five decimals.

use crate::stats::aggregator::RunReport;
use crate::stats::LatencySummary;
use std::io::{self, Write};

pub fn write_terse<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    for phase in &report.phases {
        writeln!(
            out,
            "{}:{:.5},{:.5},{:.5},{:.5},{}",
            phase.phase.key(),
            phase.megabytes,
            phase.real_secs,
            phase.user_secs,
            phase.sys_secs,
            latency_fields(&phase.latency),
        )?;
    }
    writeln!(out, "total:{}", latency_fields(&report.total_latency))
}

fn latency_fields(latency: &LatencySummary) -> String {
    format!(
        "{:.5},{:.5},{:.5},{:.5}",
        latency.average_ms(),
        latency.max_ms(),
        latency.pct_over_short,
        latency.pct_over_long
    )
}
