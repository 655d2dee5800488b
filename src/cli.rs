//! Command-line interface for spellcast
//!
//! Runs a headless skirmish from a JSON scenario file.

use clap::Parser;
use std::path::PathBuf;

use crate::headless::HeadlessScenarioConfig;

/// Headless spell-casting skirmish runner
#[derive(Parser, Debug)]
#[command(name = "spellcast")]
#[command(about = "Run a headless spell-casting skirmish from a JSON scenario")]
#[command(version)]
pub struct Args {
    /// Scenario JSON file
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub scenario: PathBuf,

    /// Output path for match log (overrides the scenario's)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum match duration in seconds (overrides the scenario's)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Spell definitions RON file (overrides the scenario's)
    #[arg(long, value_name = "SPELLS_FILE")]
    pub spells: Option<PathBuf>,

    /// Random seed (overrides the scenario's)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    /// Load the scenario and apply command-line overrides
    pub fn load_scenario(&self) -> Result<HeadlessScenarioConfig, String> {
        let mut config = HeadlessScenarioConfig::load_from_file(&self.scenario)?;

        if let Some(output) = &self.output {
            config.output_path = Some(output.to_string_lossy().to_string());
        }
        if let Some(max_duration) = self.max_duration {
            config.max_duration_secs = max_duration;
        }
        if let Some(spells) = &self.spells {
            config.spells_path = Some(spells.to_string_lossy().to_string());
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}
