// ============================================================
// CLI
// ============================================================
// Parses arguments with clap and routes to the application use
// cases. No pipeline logic lives here.
//
//   inspect  load a split once and summarise it
//   batches  run a split through the DataLoader

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BatchesArgs, Commands, InspectArgs};

use crate::application::{batches_use_case::BatchesUseCase, inspect_use_case::InspectUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "moment-loader",
    version,
    about = "Load, label and batch video moment retrieval datasets."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Inspect(args) => run_inspect(args),
            Commands::Batches(args) => run_batches(args),
        }
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let cfg = args.dataset.load_config()?;
    let report = InspectUseCase::new(cfg, args.dataset.split.into()).execute()?;

    println!(
        "loaded {}  failed {}  mean video length {:.1}  mean windows {:.2}",
        report.loaded, report.failed, report.mean_video_len, report.mean_windows
    );
    Ok(())
}

fn run_batches(args: BatchesArgs) -> Result<()> {
    let mut cfg = args.dataset.load_config()?;
    if let Some(batch_size) = args.batch_size {
        cfg.batch_size = batch_size;
        cfg.validate()?;
    }
    tracing::info!("Batching with batch size {}", cfg.batch_size);

    let report = BatchesUseCase::new(cfg, args.dataset.split.into(), args.limit).execute()?;
    println!(
        "{} batches  {} examples  {} with targets",
        report.batches, report.examples, report.labelled_batches
    );
    Ok(())
}
