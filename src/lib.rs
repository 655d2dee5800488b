//! spellcast - real-time spell-casting core
//!
//! Target selection, cast windups with a facing gate, and the five spell
//! effect kinds (line projectile, target and area over-time effects, chain,
//! summon), built as Bevy ECS passes. A headless runner drives scenarios for
//! testing.
//!
//! This library exposes the core modules for testing and reuse.

pub mod cli;
pub mod combat;
pub mod headless;
pub mod spells;

// Re-export commonly used types
pub use combat::log::{CombatLog, CombatLogEventType};
pub use combat::CombatPlugin;
pub use headless::HeadlessScenarioConfig;
pub use spells::{SpellConfig, SpellKind, SpellsPlugin};
