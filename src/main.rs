//! iostorm CLI entry point

use clap::Parser;
use iostorm::config::cli::Cli;
use iostorm::output::{self, json};
use iostorm::{BenchError, Config, Coordinator};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let config = match cli.build_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            eprintln!("Try 'iostorm --help' for more information.");
            return ExitCode::from(1);
        }
    };

    init_tracing(config.debug_level);
    info!("configuration:\n{}", config);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(exit_code = e.exit_code(), "run failed");
            eprintln!("iostorm: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(config: &Config) -> iostorm::Result<()> {
    let totals = Coordinator::new(config).run()?;
    let report = totals.report(config.block_size, config.threads);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    output::render(&report, config, &mut out)
        .and_then(|_| out.flush())
        .map_err(|e| BenchError::Report {
            path: PathBuf::from("<stdout>"),
            source: e.into(),
        })?;

    if let Some(path) = &config.json_output {
        json::write_json_report(path, &json::JsonReport::new(report, config))?;
        info!(path = %path.display(), "wrote JSON report");
    }
    Ok(())
}

/// Tracing level for a `-D` debug level
fn level_for(debug_level: u8) -> &'static str {
    match debug_level {
        60..=u8::MAX => "trace",
        50..=59 => "debug",
        40..=49 => "info",
        _ => "warn",
    }
}

/// Send diagnostics to stderr; `RUST_LOG` wins over `-D`
fn init_tracing(debug_level: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("iostorm={}", level_for(debug_level))));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
