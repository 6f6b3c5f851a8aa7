//! JSON report
//!
//! The JSON report carries everything the tables show (the full
//! [`RunReport`]) plus the run parameters and where and when it ran.

use crate::config::Config;
use crate::error::BenchError;
use crate::stats::aggregator::RunReport;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Run parameters echoed into the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRunConfig {
    pub file_size_mb: u64,
    pub random_ops: u64,
    pub targets: Vec<String>,
    pub raw_drives: bool,
    pub mmap: bool,
    pub sync_writes: bool,
    pub consistency_check: bool,
    pub sequential_writing: bool,
}

impl From<&Config> for JsonRunConfig {
    fn from(config: &Config) -> Self {
        Self {
            file_size_mb: config.file_size_mb,
            random_ops: config.random_ops,
            targets: config.paths.iter().map(|p| p.display().to_string()).collect(),
            raw_drives: config.raw_drives,
            mmap: config.use_mmap,
            sync_writes: config.sync_writes,
            consistency_check: config.consistency_check,
            sequential_writing: config.sequential_writing,
        }
    }
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub cpus: usize,
    /// RFC 3339 local time at which the report was built
    pub timestamp: String,
    pub config: JsonRunConfig,
    #[serde(flatten)]
    pub results: RunReport,
}

impl JsonReport {
    pub fn new(results: RunReport, config: &Config) -> Self {
        let hostname = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().into_owned());

        Self {
            hostname,
            cpus: crate::util::resource::cpu_count(),
            timestamp: chrono::Local::now().to_rfc3339(),
            config: JsonRunConfig::from(config),
            results,
        }
    }
}

/// Write `report` to `path` as pretty-printed JSON
pub fn write_json_report(path: &Path, report: &JsonReport) -> Result<()> {
    write_pretty(path, report).map_err(|source| BenchError::Report {
        path: path.to_path_buf(),
        source,
    })
}

fn write_pretty(path: &Path, report: &JsonReport) -> anyhow::Result<()> {
    let file = File::create(path).context("failed to create report file")?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("failed to serialize report")?;
    writer.flush().context("failed to flush report file")?;
    Ok(())
}
