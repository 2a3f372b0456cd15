//! `sluice simulate`: Replay a JSON scenario and print what happened.

use clap::Args;
use std::path::PathBuf;

use sluice_core::BreakerConfig;

use crate::scenario::{Scenario, Simulation};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (JSON).
    pub scenario: PathBuf,

    /// Stop at the first failing step.
    #[arg(long)]
    pub fail_fast: bool,
}

pub fn run(config: &BreakerConfig, args: &SimulateArgs) -> anyhow::Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let mut sim = Simulation::new(config, scenario.start)?;
    tracing::info!(
        steps = scenario.steps.len(),
        start = scenario.start,
        "replaying scenario"
    );

    for (index, step) in scenario.steps.iter().enumerate() {
        match sim.apply(step) {
            Ok(summary) => println!("[{index:>3}] {:<20} {summary}", step.name()),
            Err(e) if args.fail_fast => {
                anyhow::bail!("step {index} ({}) failed: {e}", step.name());
            }
            Err(e) => println!("[{index:>3}] {:<20} error: {e}", step.name()),
        }
        for event in sim.breaker.drain_events() {
            println!("      event {}", serde_json::to_string(&event)?);
        }
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&sim.report())?);
    Ok(())
}
