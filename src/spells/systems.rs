//! Spell Systems API
//!
//! This module provides a stable API for the spell passes. Hosts (the
//! headless runner, tests, a future graphical client) should import from
//! here rather than from the internal modules.
//!
//! ## System Phases
//!
//! Spell passes run in six ordered phases each frame:
//!
//! 1. **Planning** - Answer decision requests with cast requests
//! 2. **Casting** - Windups, facing gate, release, effect resolution
//! 3. **Chains** - Fire due chain hops and pick the next target
//! 4. **Projectiles** - Arm spawn requests, sweep projectiles
//! 5. **StatusEffects** - Tick target and area effects, visual cleanup
//! 6. **MovementLock** - Mirror windups into the movement lock
//!
//! Each phase sees the records the previous phase inserted or removed.
//!
//! ## Usage
//!
//! ```ignore
//! use spellcast::spells::systems;
//!
//! systems::configure_spell_system_ordering(&mut app);
//! systems::add_core_spell_systems(&mut app, || true);
//! ```

use bevy::prelude::*;

// === Phase 1: Planning ===
pub use super::planning::plan_spell_casts;

// === Phase 2: Casting ===
pub use super::casting::process_spell_windups;

// === Phase 3: Chains ===
pub use super::chain::advance_chain_runners;

// === Phase 4: Projectiles ===
pub use super::projectiles::{spawn_spell_projectiles, sweep_spell_projectiles};

// === Phase 5: Status Effects ===
pub use super::status_effects::{cleanup_orphan_effect_visuals, tick_area_effects, tick_target_effects};

// === Phase 6: Movement Lock ===
pub use super::casting::mirror_casting_movement_lock;

/// System set labels for spell pass ordering.
///
/// Use these to order custom systems (AI, locomotion, death handling)
/// relative to the spell passes.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpellSystemPhase {
    Planning,
    Casting,
    Chains,
    Projectiles,
    StatusEffects,
    MovementLock,
}

/// Configures the ordering between spell system phases.
///
/// Call this once during app setup before adding spell systems.
pub fn configure_spell_system_ordering(app: &mut App) {
    app.configure_sets(
        Update,
        (
            SpellSystemPhase::Planning,
            SpellSystemPhase::Casting,
            SpellSystemPhase::Chains,
            SpellSystemPhase::Projectiles,
            SpellSystemPhase::StatusEffects,
            SpellSystemPhase::MovementLock,
        )
            .chain(),
    );
}

/// Adds the spell passes to the app.
///
/// # Arguments
/// * `app` - The Bevy App to add systems to
/// * `run_condition` - A run condition gating every pass (`|| true` to always run)
pub fn add_core_spell_systems<M>(app: &mut App, run_condition: impl Condition<M> + Clone)
where
    M: 'static,
{
    app.add_systems(
        Update,
        plan_spell_casts
            .in_set(SpellSystemPhase::Planning)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        process_spell_windups
            .in_set(SpellSystemPhase::Casting)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        advance_chain_runners
            .in_set(SpellSystemPhase::Chains)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        (spawn_spell_projectiles, sweep_spell_projectiles)
            .chain()
            .in_set(SpellSystemPhase::Projectiles)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        (tick_target_effects, tick_area_effects, cleanup_orphan_effect_visuals)
            .chain()
            .in_set(SpellSystemPhase::StatusEffects)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        mirror_casting_movement_lock
            .in_set(SpellSystemPhase::MovementLock)
            .run_if(run_condition),
    );
}
