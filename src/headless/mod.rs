//! Headless mode for automated testing
//!
//! Runs spell skirmishes without any graphical output. A scenario places
//! actors from several factions, each optionally armed with one spell, and
//! the match runs until one faction is left standing or time runs out.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --scenario scenarios/skirmish.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "name": "Skirmish",
//!   "actors": [
//!     { "name": "Blue Pyromancer", "faction": 1, "position": [-8.0, 0.0, 0.0], "spell": "Firebolt" },
//!     { "name": "Red Warlock", "faction": 2, "position": [8.0, 0.0, 0.0], "spell": "Corruption" }
//!   ],
//!   "max_duration_secs": 60,
//!   "random_seed": 42
//! }
//! ```

pub mod config;
pub mod rng;
pub mod runner;

pub use config::{ActorConfig, ActorSpec, HeadlessScenarioConfig, PrefabConfig};
pub use rng::GameRng;
pub use runner::{build_headless_app, run_headless_match, CombatantResult, HeadlessMatchState, MatchResult};
