// ============================================================
// CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `inspect` and `batches`, and the
// flags they share. Flags that name a field of the config file
// override it for the selected split.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::application::config::{PipelineConfig, Split};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every example of a split and report counts and lengths
    Inspect(InspectArgs),

    /// Run a split through the DataLoader and log batch shapes
    Batches(BatchesArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitArg {
    #[default]
    Train,
    Eval,
}

impl From<SplitArg> for Split {
    fn from(s: SplitArg) -> Self {
        match s {
            SplitArg::Train => Split::Train,
            SplitArg::Eval => Split::Eval,
        }
    }
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// Pipeline config file (JSON)
    #[arg(long)]
    pub config: PathBuf,

    /// Which split of the config to use
    #[arg(long, value_enum, default_value_t = SplitArg::Train)]
    pub split: SplitArg,

    /// Replace the split's annotation file
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Replace the split's domain (TVSum / YouTube Highlights)
    #[arg(long)]
    pub domain: Option<String>,
}

impl DatasetArgs {
    /// Load the config file and apply the overrides to the chosen split.
    pub fn load_config(&self) -> Result<PipelineConfig> {
        let mut cfg = PipelineConfig::load(&self.config)?;
        let split = cfg.split_mut(self.split.into())?;
        if let Some(path) = &self.data_path {
            split.data_path = path.clone();
        }
        if let Some(domain) = &self.domain {
            split.domain = Some(domain.clone());
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct BatchesArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Stop after this many batches
    #[arg(long)]
    pub limit: Option<usize>,

    /// Override the config's batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
}
