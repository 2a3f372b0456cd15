//! `sluice init`: Write a default configuration file.

use clap::Args;
use std::path::Path;

use sluice_core::{AssetConfig, BreakerConfig};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(path: &Path, args: &InitArgs) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!("configuration file already exists at {}", path.display());
    }

    let config = BreakerConfig {
        assets: vec![AssetConfig {
            id: "USDC".into(),
            min_retained_bps: 7_000,
            begin_threshold: 1_000_000,
            settlement: "delayed".into(),
        }],
        ..Default::default()
    };
    config.save(path)?;

    println!("Wrote default Sluice configuration to {}", path.display());
    println!("Edit the [[assets]] entries to match your pool.");
    println!("Run 'sluice simulate <scenario.json>' to replay a scenario.");
    Ok(())
}
