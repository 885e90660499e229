// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Rolling File CLI
//!
//! Copy stdin into time-rolled files.
//!
//! # Usage
//!
//! ```bash
//! # Daily files under logs/, keep a week
//! my-service | hdds-rolling --dir logs --name service.log --period day --keep 7
//!
//! # Hourly files, drain every expired file on each rotation
//! my-service | hdds-rolling --dir logs --period hour --keep 48 --sweep-all
//!
//! # Settings from a TOML file
//! my-service | hdds-rolling --config rolling.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hdds_rolling::{RollPeriod, RollingConfig, RollingFileWriter, SweepMode};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "hdds-rolling")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy stdin into time-rolled files with retention")]
#[command(long_about = None)]
struct Cli {
    /// TOML configuration file (command-line flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Base file name, e.g. app.log
    #[arg(short, long)]
    name: Option<String>,

    /// Rolling period
    #[arg(short, long, value_enum)]
    period: Option<PeriodArg>,

    /// Number of past periods to keep (negative keeps none)
    #[arg(short, long, allow_negative_numbers = true)]
    keep: Option<i64>,

    /// Remove every expired file on rotation instead of one
    #[arg(long)]
    sweep_all: bool,

    /// Verbose mode (show internal logs)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PeriodArg {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl From<PeriodArg> for RollPeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Year => RollPeriod::Year,
            PeriodArg::Month => RollPeriod::Month,
            PeriodArg::Day => RollPeriod::Day,
            PeriodArg::Hour => RollPeriod::Hour,
            PeriodArg::Minute => RollPeriod::Minute,
            PeriodArg::Second => RollPeriod::Second,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Internal logs go to stderr, stdout stays untouched.
    let filter = if cli.verbose {
        EnvFilter::new("hdds_rolling=debug")
    } else {
        EnvFilter::new("hdds_rolling=info")
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    tracing::info!(
        dir = %config.base_path.display(),
        name = %config.base_file_name,
        period = %config.period,
        keep = config.max_backups,
        sweep = ?config.sweep_mode,
        "Starting HDDS rolling writer"
    );

    let writer = Arc::new(RollingFileWriter::new(config).context("Failed to open rolling writer")?);

    // Setup Ctrl+C handler
    ctrlc_handler(Arc::clone(&writer));

    let copied = copy_lines(io::stdin().lock(), &writer).context("Failed to copy input")?;
    writer.close().context("Failed to close rolling writer")?;

    let stats = writer.stats();
    tracing::info!(
        lines = copied,
        bytes_written = stats.bytes_written,
        rotations = stats.rotations,
        "Rolling writer shutdown complete"
    );

    Ok(())
}

fn build_config(cli: &Cli) -> Result<RollingConfig> {
    let mut config = match cli.config {
        Some(ref path) => RollingConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RollingConfig::default(),
    };

    if let Some(ref dir) = cli.dir {
        config.base_path = dir.clone();
    }
    if let Some(ref name) = cli.name {
        config.base_file_name = name.clone();
    }
    if let Some(period) = cli.period {
        config.period = period.into();
    }
    if let Some(keep) = cli.keep {
        config.max_backups = hdds_rolling::clamp_max_backups(keep);
    }
    if cli.sweep_all {
        config.sweep_mode = SweepMode::All;
    }

    config.validate()?;
    Ok(config)
}

/// Forward input line by line so each line lands whole in one file.
fn copy_lines<R: BufRead>(mut input: R, writer: &RollingFileWriter) -> Result<u64> {
    let mut line = Vec::new();
    let mut count = 0;

    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write(&line)?;
        count += 1;
    }

    Ok(count)
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(writer: Arc<RollingFileWriter>) {
    let _ = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        if let Err(e) = writer.close() {
            tracing::warn!(error = %e, "Failed to close rolling writer");
        }
        std::process::exit(130);
    });
}
