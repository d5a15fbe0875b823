//! `signpipe run` - sign items through SingleHash → MultiHash → CombineResults

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use signpipe_core::{
    DataSigner, Pipeline, SharedProgress, SigningContext, bounded_signing_stages,
    is_shutdown_requested, request_shutdown,
};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Items to sign
    #[arg(conflicts_with = "file")]
    pub items: Vec<String>,

    /// Read items from a file, one per non-empty line
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    setup_signal_handler()?;

    let signer = Arc::new(DataSigner::new(config.signer_config()));
    let ctx = SigningContext::new(signer.clone());
    let stages = bounded_signing_stages(&ctx, config.pipeline.max_in_flight);
    let pipeline = Pipeline::new(stages, config.pipeline_config())?
        .with_progress(progress.clone());
    log::debug!("stages: {}", pipeline.stage_names().join(" -> "));

    let report = match args.file {
        Some(path) => pipeline.run_from(|| read_items(&path))?,
        None => pipeline.run(args.items)?,
    };
    // TTY mode logs at warn, the stage lines stand in for info output
    if progress.is_tty() {
        progress.println(report.summary());
    }

    if signer.overheats() > 0 {
        log::warn!("{} overlapping hash1 calls", signer.overheats());
    }
    if is_shutdown_requested() {
        log::warn!("Shutdown requested, result covers only the items fed so far");
        return Ok(ExitCode::from(130));
    }

    let digest = report
        .digest()
        .context("pipeline did not produce a single combined result")?;
    println!("{digest}");
    Ok(ExitCode::SUCCESS)
}

/// One item per non-empty line, surrounding whitespace trimmed
fn read_items(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read items from {}", path.display()))?;
    let items: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    log::info!("Read {} items from {}", items.len(), path.display());
    Ok(items)
}

fn setup_signal_handler() -> Result<()> {
    // First signal: stop feeding new items
    // Second signal: force exit
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: an atomic swap and process::exit are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if request_shutdown() {
                    std::process::exit(130);
                }
            })
        }
        .context("Failed to register signal handler")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_items_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        std::fs::write(&path, "0\n\n 1 \n2\n").unwrap();
        assert_eq!(read_items(&path).unwrap(), vec!["0", "1", "2"]);
    }

    #[test]
    fn read_items_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_items(&dir.path().join("absent.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.txt"));
    }
}
