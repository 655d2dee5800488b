//! Targeting Strategies
//!
//! Pure functions that choose what a caster should aim at. They read only
//! the caster's snapshot, its config, and a [`SpatialSearch`], so they can be
//! tested without a running app.

use bevy::prelude::*;

use super::components::Faction;
use super::spell_config::{AcquireMode, SpellConfig};
use super::world::{ActorSnapshot, SpatialSearch};

/// Nearest living enemy within `range`. Ties go to the first found.
pub fn closest_enemy<'a>(
    caster: &ActorSnapshot,
    faction: Faction,
    range: f32,
    search: &'a impl SpatialSearch,
) -> Option<&'a ActorSnapshot> {
    let mut best: Option<(&ActorSnapshot, f32)> = None;
    for candidate in search.search(caster.position, range, faction.hostile_mask()) {
        if candidate.entity == caster.entity {
            continue;
        }
        let distance_sq = candidate.position.distance_squared(caster.position);
        // Strict comparison keeps the first of equally distant candidates
        if best.map_or(true, |(_, d)| distance_sq < d) {
            best = Some((candidate, distance_sq));
        }
    }
    best.map(|(actor, _)| actor)
}

/// Ally (caster included) with the lowest health fraction within `range`.
/// Allies without a health record are not candidates.
pub fn lowest_health_ally<'a>(
    caster: &ActorSnapshot,
    faction: Faction,
    range: f32,
    search: &'a impl SpatialSearch,
) -> Option<&'a ActorSnapshot> {
    let mut best: Option<(&ActorSnapshot, f32)> = None;
    for candidate in search.search(caster.position, range, faction.mask()) {
        let Some(health) = candidate.health else {
            continue;
        };
        let fraction = health.fraction();
        if best.map_or(true, |(_, f)| fraction < f) {
            best = Some((candidate, fraction));
        }
    }
    best.map(|(actor, _)| actor)
}

/// Densest enemy cluster: every enemy in range is tried as a cluster centre
/// and scored by how many enemies sit within `area_radius` of it.
///
/// Returns the winning centre and its member count.
pub fn densest_enemy_cluster(
    caster: &ActorSnapshot,
    faction: Faction,
    range: f32,
    area_radius: f32,
    search: &impl SpatialSearch,
) -> Option<(Vec3, usize)> {
    let enemies = search.search(caster.position, range, faction.hostile_mask());
    let radius_sq = area_radius.max(0.0) * area_radius.max(0.0);

    let mut best: Option<(Vec3, usize)> = None;
    for centre in enemies.iter() {
        let members = enemies
            .iter()
            .filter(|other| other.position.distance_squared(centre.position) <= radius_sq)
            .count();
        if best.map_or(true, |(_, count)| members > count) {
            best = Some((centre.position, members));
        }
    }
    best
}

/// Pick a single target actor for the caster's spell.
///
/// `DensestEnemyCluster` is an area mode; single-target spells configured
/// with it fall back to the closest enemy.
pub fn select_single_target(
    caster: &ActorSnapshot,
    faction: Faction,
    config: &SpellConfig,
    range: f32,
    search: &impl SpatialSearch,
) -> Option<Entity> {
    let target = match config.acquire {
        AcquireMode::ClosestEnemy | AcquireMode::DensestEnemyCluster => {
            closest_enemy(caster, faction, range, search)
        }
        AcquireMode::LowestHealthAlly => lowest_health_ally(caster, faction, range, search),
    };
    target.map(|actor| actor.entity)
}

/// Pick a ground point for the caster's area spell.
///
/// A cluster needs at least two enemies; otherwise the closest enemy's
/// position is used. When nothing hostile is in range, supportive spells
/// fall back to the caster's own position and offensive spells do not cast.
pub fn select_area_point(
    caster: &ActorSnapshot,
    faction: Faction,
    config: &SpellConfig,
    range: f32,
    area_radius: f32,
    search: &impl SpatialSearch,
) -> Option<Vec3> {
    let self_fallback = config.is_positive().then_some(caster.position);

    match config.acquire {
        AcquireMode::ClosestEnemy => closest_enemy(caster, faction, range, search)
            .map(|actor| actor.position)
            .or(self_fallback),
        AcquireMode::LowestHealthAlly => lowest_health_ally(caster, faction, range, search)
            .map(|actor| actor.position)
            .or(self_fallback),
        AcquireMode::DensestEnemyCluster => {
            match densest_enemy_cluster(caster, faction, range, area_radius, search) {
                Some((centre, members)) if members >= 2 => Some(centre),
                _ => closest_enemy(caster, faction, range, search)
                    .map(|actor| actor.position)
                    .or(self_fallback),
            }
        }
    }
}
