//! Human-readable tables

use crate::stats::aggregator::{PhaseReport, RunReport};
use crate::stats::{LatencySummary, LONG_LATENCY_SECS, SHORT_LATENCY_SECS};
use std::io::{self, Write};

/// Width of the "<phase> <MB>" part of a throughput row
const ITEM_WIDTH: usize = 16;

/// Throughput table, one row per phase that moved data
pub fn write_results<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "iostorm results for {} concurrent io threads:", report.threads)?;
    writeln!(out, ",----------------------------------------------------------------------.")?;
    writeln!(out, "| Item                  | Time     | Rate         | Usr CPU  | Sys CPU |")?;
    writeln!(out, "+-----------------------+----------+--------------+----------+---------+")?;

    for phase in report.phases.iter().filter(|p| p.blocks > 0) {
        write_phase_row(phase, out)?;
    }

    writeln!(out, "`----------------------------------------------------------------------'")?;
    Ok(())
}

fn write_phase_row<W: Write>(phase: &PhaseReport, out: &mut W) -> io::Result<()> {
    let name = phase.phase.to_string();
    let width = ITEM_WIDTH.saturating_sub(name.len());
    writeln!(
        out,
        "| {} {:>width$.0} MBs | {:6.1} s | {:7.3} MB/s | {:5.1} %  | {:5.1} % |",
        name,
        phase.megabytes,
        phase.real_secs,
        phase.rate_mb_per_sec,
        phase.user_pct,
        phase.sys_pct,
        width = width,
    )
}

/// Latency table with a total row across every phase
pub fn write_latency<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "iostorm latency results:")?;
    writeln!(out, ",-------------------------------------------------------------------------.")?;
    writeln!(
        out,
        "| Item         | Average latency | Maximum latency | % >{} sec | % >{} sec |",
        SHORT_LATENCY_SECS, LONG_LATENCY_SECS
    )?;
    writeln!(out, "+--------------+-----------------+-----------------+----------+-----------+")?;

    for phase in report.phases.iter().filter(|p| p.blocks > 0) {
        write_latency_row(&phase.phase.to_string(), &phase.latency, out)?;
    }

    writeln!(out, "|--------------+-----------------+-----------------+----------+-----------|")?;
    write_latency_row("Total", &report.total_latency, out)?;
    writeln!(out, "`--------------+-----------------+-----------------+----------+-----------'")?;
    writeln!(out)?;
    Ok(())
}

fn write_latency_row<W: Write>(item: &str, latency: &LatencySummary, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "| {:<12} | {:12.3} ms | {:12.3} ms | {:8.5} | {:9.5} |",
        item,
        latency.average_ms(),
        latency.max_ms(),
        latency.pct_over_short,
        latency.pct_over_long,
    )
}
