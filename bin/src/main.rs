//! fxmaster CLI - FX tick securities master.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use fxmaster_lib::prelude::*;
use fxmaster_lib::ValidationMode;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "fxmaster")]
#[command(about = "Load, validate, resample and replay FX tick data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file. Defaults to $FXMASTER_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every weekly file under a directory into the tick table
    Load {
        /// Source directory. Defaults to ingest.source_dir
        dir: Option<PathBuf>,

        /// Provider tag written with every tick
        #[arg(short, long)]
        provider: Option<String>,

        /// Delete and reload every bucket without pre-validation
        #[arg(long)]
        overwrite: bool,

        /// Pre-validation mode (fast, full)
        #[arg(long)]
        validation_mode: Option<ValidationMode>,

        /// Largest row difference still accepted
        #[arg(long)]
        tolerance: Option<u64>,
    },

    /// Reconcile source files with the store without loading anything
    Validate {
        /// Source directory. Defaults to ingest.source_dir
        dir: Option<PathBuf>,

        /// Only validate files of this symbol
        #[arg(short, long)]
        symbol: Option<String>,

        /// Provider tag to reconcile against
        #[arg(short, long)]
        provider: Option<String>,

        /// Use cached validation rows when they are current
        #[arg(long)]
        fast: bool,
    },

    /// Resample one series into bars
    Resample {
        /// Currency pair (e.g., EURUSD)
        symbol: String,

        /// Provider tag
        #[arg(short, long)]
        provider: Option<String>,

        /// Bar width (1s, 1min, 5min, 15min, 30min, 1h, 4h, 1d)
        #[arg(short, long)]
        frequency: Option<Frequency>,

        /// Window start (YYYY-MM-DD or RFC 3339). Requires --end
        #[arg(short, long, requires = "end")]
        start: Option<String>,

        /// Window end, exclusive. Requires --start
        #[arg(short, long, requires = "start")]
        end: Option<String>,

        /// Continue from existing bars instead of recomputing the series
        #[arg(long, conflicts_with_all = ["start", "end"])]
        incremental: bool,
    },

    /// Incrementally resample every series in the tick table
    ResampleAll {
        /// Bar width (1s, 1min, 5min, 15min, 30min, 1h, 4h, 1d)
        #[arg(short, long)]
        frequency: Option<Frequency>,
    },

    /// Replay ticks of one or more symbols in time order
    Playback {
        /// Currency pairs to replay
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Provider tag
        #[arg(short, long)]
        provider: Option<String>,

        /// Window start (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        start: String,

        /// Window end, exclusive
        #[arg(short, long)]
        end: String,

        /// Stop after this many events
        #[arg(short, long)]
        limit: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List stored series with row counts and time ranges
    Series {
        /// Table to inspect. Defaults to ingest.tick_table
        #[arg(short, long)]
        table: Option<String>,

        /// Also list the weekly buckets of each series
        #[arg(long)]
        buckets: bool,
    },

    /// Show load runs recorded in the journal
    Runs {
        /// Specific run ID to show
        run_id: Option<String>,

        /// Delete finished runs from the journal
        #[arg(long, conflicts_with = "run_id")]
        clean: bool,
    },

    /// Print the effective settings
    Config,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Returns a flag that is set on Ctrl-C.
fn stop_on_ctrl_c() -> StopFlag {
    let stop = StopFlag::new();
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current step");
            flag.stop();
        }
    });
    stop
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    init_logging(cli.verbose, cli.quiet);
    let mut settings =
        Settings::resolve(cli.config.as_deref()).context("Failed to load settings")?;

    match command {
        Commands::Load {
            dir,
            provider,
            overwrite,
            validation_mode,
            tolerance,
        } => {
            if let Some(provider) = provider {
                settings.ingest.provider = provider;
            }
            if let Some(mode) = validation_mode {
                settings.ingest.validation_mode = mode;
            }
            if let Some(tolerance) = tolerance {
                settings.ingest.tolerance = tolerance;
            }
            commands::load::load(&settings, dir, overwrite, stop_on_ctrl_c(), cli.quiet).await
        }
        Commands::Validate {
            dir,
            symbol,
            provider,
            fast,
        } => {
            if let Some(provider) = provider {
                settings.ingest.provider = provider;
            }
            commands::validate::validate(&settings, dir, symbol.as_deref(), fast).await
        }
        Commands::Resample {
            symbol,
            provider,
            frequency,
            start,
            end,
            incremental,
        } => {
            if let Some(frequency) = frequency {
                settings.resample.frequency = frequency;
            }
            let provider = provider.unwrap_or_else(|| settings.ingest.provider.clone());
            let window = display::parse_window(start.as_deref(), end.as_deref())?;
            commands::resample::resample(
                &settings,
                &SeriesKey::new(symbol, provider),
                window,
                incremental,
                stop_on_ctrl_c(),
            )
            .await
        }
        Commands::ResampleAll { frequency } => {
            if let Some(frequency) = frequency {
                settings.resample.frequency = frequency;
            }
            commands::resample::resample_all(&settings, stop_on_ctrl_c()).await
        }
        Commands::Playback {
            symbols,
            provider,
            start,
            end,
            limit,
            format,
        } => {
            let provider = provider.unwrap_or_else(|| settings.ingest.provider.clone());
            let window = display::parse_window(Some(&start), Some(&end))?
                .context("A playback window needs --start and --end")?;
            commands::playback::playback(
                &settings,
                symbols,
                &provider,
                window,
                limit,
                format,
                stop_on_ctrl_c(),
            )
            .await
        }
        Commands::Series { table, buckets } => {
            let table = table.unwrap_or_else(|| settings.ingest.tick_table.clone());
            commands::series::series(&settings, &table, buckets).await
        }
        Commands::Runs { run_id, clean } => {
            commands::runs::runs(&settings, run_id.as_deref(), clean)
        }
        Commands::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}
