//! Spell Events
//!
//! One-shot requests produced by the spell passes for the projectile spawner
//! and for collaborators outside the core (summon spawner, visual effects).

use bevy::prelude::*;

use super::components::{Faction, LayerMask};
use super::registry::{PrefabId, VfxId};
use super::spell_config::SpellKind;

/// Request to arm a new projectile. Consumed by `spawn_spell_projectiles`.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct SpellProjectileSpawnRequest {
    pub attacker: Entity,
    pub origin: Vec3,
    /// Travel direction (normalized again when armed)
    pub direction: Vec3,
    pub speed: f32,
    /// Signed: positive damages, negative heals
    pub damage: f32,
    pub max_distance: f32,
    pub radius: f32,
    pub layer_mask: LayerMask,
    pub pierce: bool,
    /// Hit anything already overlapping the origin before the first move
    pub check_spawn_overlap: bool,
    pub spell_name: String,
}

/// Request for an external spawner to create summoned actors.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct SummonRequest {
    pub summoner: Entity,
    pub prefab: PrefabId,
    pub position: Vec3,
    pub count: u32,
    pub faction: Faction,
}

/// Commands for the visual-effect service.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub enum VfxCommand {
    /// Start a persistent effect under `key`
    Begin {
        vfx: VfxId,
        key: u64,
        position: Vec3,
        follow: Option<Entity>,
    },
    /// Reposition the effect bound under `key`
    Move {
        vfx: VfxId,
        key: u64,
        position: Vec3,
        follow: Option<Entity>,
    },
    /// Stop the effect bound under `key`
    End { key: u64 },
}

/// Fired once per released spell.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct SpellCastEvent {
    pub caster: Entity,
    pub spell_name: String,
    pub kind: SpellKind,
    pub aim_point: Vec3,
    pub target: Option<Entity>,
}
