//! Spell-casting core
//!
//! Decides what casters target, runs each caster's windup → release →
//! cooldown cycle, and resolves the five effect kinds: line projectile,
//! target over-time effect, area over-time effect, chain and summon.
//!
//! ## Module Structure
//!
//! - `components`: actor and per-caster spell records
//! - `spell_config`: data-driven spell definitions (RON)
//! - `registry`: visual-effect and prefab name ↔ id table
//! - `world`: per-pass actor and collider snapshots
//! - `targeting`: target and area-point selection
//! - `planning`, `casting`, `chain`, `projectiles`, `status_effects`: the passes
//! - `systems`: phase ordering and the stable systems API

use bevy::prelude::*;

pub mod casting;
pub mod chain;
pub mod components;
pub mod constants;
pub mod events;
pub mod planning;
pub mod projectiles;
pub mod registry;
pub mod spell_config;
pub mod status_effects;
pub mod systems;
pub mod targeting;
pub mod utils;
pub mod world;

pub use components::*;
pub use events::*;
pub use registry::{EffectRegistry, PrefabId, VfxId};
pub use spell_config::{
    AcquireMode, EffectPolarity, SpellConfig, SpellConfigPlugin, SpellDefinitions, SpellKind,
};

use crate::combat::events::{DamageEvent, FloatingNumberEvent};

/// Plugin adding the spell passes and the events they exchange.
///
/// Spell definitions are not loaded here; add `SpellConfigPlugin` for that,
/// or insert an `EffectRegistry` directly.
pub struct SpellsPlugin;

impl Plugin for SpellsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SpellProjectileSpawnRequest>()
            .add_event::<SummonRequest>()
            .add_event::<VfxCommand>()
            .add_event::<SpellCastEvent>()
            .add_event::<DamageEvent>()
            .add_event::<FloatingNumberEvent>()
            .init_resource::<EffectRegistry>();

        systems::configure_spell_system_ordering(app);
        systems::add_core_spell_systems(app, || true);
    }
}
