//! `sluice inspect`: Replay a scenario and print one asset's ledger window.

use clap::Args;
use std::path::PathBuf;

use sluice_core::{AssetId, BreakerConfig, Clock};

use crate::scenario::{Scenario, Simulation};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Scenario file (JSON).
    pub scenario: PathBuf,

    /// Asset whose ledger to print.
    #[arg(short, long)]
    pub asset: String,
}

pub fn run(config: &BreakerConfig, args: &InspectArgs) -> anyhow::Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let mut sim = Simulation::new(config, scenario.start)?;
    for (index, step) in scenario.steps.iter().enumerate() {
        if let Err(e) = sim.apply(step) {
            tracing::warn!(index, step = step.name(), error = %e, "scenario step failed");
        }
    }

    let asset = AssetId::new(args.asset.clone());
    let Some(snapshot) = sim.breaker.ledger_snapshot(&asset) else {
        anyhow::bail!("asset {} is not registered", asset);
    };

    println!("Ledger for {} at {}", asset, sim.clock.now());
    println!("  Status:          {}", snapshot.status);
    println!("  Retained floor:  {} bps", snapshot.min_retained_bps);
    println!("  Begin threshold: {}", snapshot.begin_threshold);
    println!("  Overridden:      {}", snapshot.overridden);
    println!("  Total all time:  {}", snapshot.total_all_time);
    println!("  Total in window: {}", snapshot.total_in_window);
    println!();

    let mut cursor = snapshot.head;
    if cursor.is_none() {
        println!("  (window empty)");
    } else {
        println!("  {:<14} {:>24} {:<14}", "TICK", "AMOUNT", "NEXT");
    }
    while let Some(tick) = cursor {
        let Some(node) = sim.breaker.ledger_node(&asset, tick) else {
            break;
        };
        let next = node
            .next_tick
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        println!("  {:<14} {:>24} {:<14}", tick.to_string(), node.amount, next);
        cursor = node.next_tick;
    }
    Ok(())
}
