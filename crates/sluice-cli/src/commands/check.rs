//! `sluice check`: Validate a configuration file.

use std::path::Path;

use sluice_core::BreakerConfig;

pub fn run(path: &Path, config: &BreakerConfig) -> anyhow::Result<()> {
    config.validate()?;

    println!("Configuration OK: {}", path.display());
    println!(
        "  Window:     {}s (ticks of {}s)",
        config.window.period_secs, config.window.tick_length_secs
    );
    println!("  Cooldown:   {}s", config.window.cooldown_secs);
    println!("  Delay:      {}s", config.settlement.delay_secs);
    for asset in &config.assets {
        println!(
            "  Asset:      {} ({} bps retained, active above {}, {} settlement)",
            asset.id, asset.min_retained_bps, asset.begin_threshold, asset.settlement
        );
    }
    Ok(())
}
