//! signpipe - concurrent signing pipeline CLI
//!
//! Signs items through SingleHash → MultiHash → CombineResults and prints
//! the combined digest.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "signpipe")]
#[command(about = "Concurrent signing pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./signpipe.toml or ~/.config/signpipe/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Slots per inter-stage channel
    #[arg(long, global = true)]
    channel_capacity: Option<usize>,

    /// Milliseconds between stage runner starts
    #[arg(long, global = true)]
    stagger_ms: Option<u64>,

    /// Items each hashing stage signs at once
    #[arg(long, global = true)]
    max_in_flight: Option<usize>,

    /// Simulated latency of the rate-limited hash
    #[arg(long, global = true)]
    hash1_latency_ms: Option<u64>,

    /// Simulated latency of the unrestricted hash
    #[arg(long, global = true)]
    hash2_latency_ms: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            channel_capacity: self.channel_capacity,
            stagger_ms: self.stagger_ms,
            max_in_flight: self.max_in_flight,
            hash1_latency_ms: self.hash1_latency_ms,
            hash2_latency_ms: self.hash2_latency_ms,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Sign items and print the combined digest
    Run(cmd::run::RunArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(signpipe_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, stage lines show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    signpipe_core::init_logging(quiet, cli.debug, multi);

    let loaded = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            log::error!("Configuration error: {e:#}");
            return ExitCode::from(2);
        }
    };
    config.apply(cli.overrides());
    if let Err(e) = config.validate() {
        log::error!("Configuration error: {e:#}");
        return ExitCode::from(2);
    }

    match cli.command {
        Command::Run(args) => match cmd::run::run(args, &config, &progress) {
            Ok(code) => code,
            Err(e) => {
                log::error!("Fatal error: {e:#}");
                ExitCode::from(2)
            }
        },
        Command::Config => {
            print_config(&config);
            ExitCode::SUCCESS
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Channel capacity",
        &config.pipeline.channel_capacity.to_string(),
    ]);
    table.add_row(vec!["Stagger", &format!("{}ms", config.pipeline.stagger_ms)]);
    table.add_row(vec![
        "Max in flight",
        &config.pipeline.max_in_flight.to_string(),
    ]);
    table.add_row(vec![
        "Hash1 latency",
        &format!("{}ms", config.signer.hash1_latency_ms),
    ]);
    table.add_row(vec![
        "Hash2 latency",
        &format!("{}ms", config.signer.hash2_latency_ms),
    ]);
    table.add_row(vec![
        "Overheat penalty",
        &format!("{}ms", config.signer.overheat_penalty_ms),
    ]);

    eprintln!("\n{table}");
}
