//! Chain-Hop Scheduler
//!
//! Advances in-flight chain spells one hop at a time. Each hop fires a
//! non-piercing projectile from the previous landing point to the current
//! target, then greedily picks the nearest actor around that target as the
//! next one. Only the immediately previous target is excluded, so a chain
//! may bounce A → B → A when nothing else is in reach.

use bevy::prelude::*;

use super::components::{Faction, SpellChainRunner};
use super::constants::{CHAIN_HOP_DISTANCE_MARGIN, MIN_DISTANCE, MIN_SPEED};
use super::events::SpellProjectileSpawnRequest;
use super::spell_config::{signed_amount, SpellConfig};
use super::utils::normalize_or_forward;
use super::world::{ActorData, ActorIndex, SpatialSearch};

/// Nearest actor within `radius` of `around`, of the factions the chain's
/// polarity affects, excluding the caster and the previous target.
pub fn next_chain_target(
    search: &impl SpatialSearch,
    around: Vec3,
    radius: f32,
    faction: Faction,
    positive: bool,
    caster: Entity,
    previous: Entity,
) -> Option<Entity> {
    let mut best: Option<(Entity, f32)> = None;
    for candidate in search.search(around, radius, faction.affected_by(positive)) {
        if candidate.entity == caster || candidate.entity == previous {
            continue;
        }
        let distance_sq = candidate.position.distance_squared(around);
        if best.map_or(true, |(_, d)| distance_sq < d) {
            best = Some((candidate.entity, distance_sq));
        }
    }
    best.map(|(entity, _)| entity)
}

/// Fire due chain hops and pick each chain's next target.
pub fn advance_chain_runners(
    time: Res<Time>,
    mut commands: Commands,
    actors: Query<ActorData>,
    mut runners: Query<(Entity, &mut SpellChainRunner, Option<&SpellConfig>)>,
    mut projectile_requests: EventWriter<SpellProjectileSpawnRequest>,
) {
    if runners.is_empty() {
        return;
    }

    let now = time.elapsed_secs();
    let index = ActorIndex::build(actors.iter());

    for (caster, mut runner, config) in runners.iter_mut() {
        let target = runner
            .current_target
            .and_then(|entity| index.get(entity))
            .filter(|actor| actor.is_alive());

        let Some(target) = target else {
            commands.entity(caster).remove::<SpellChainRunner>();
            continue;
        };
        if runner.remaining == 0 {
            commands.entity(caster).remove::<SpellChainRunner>();
            continue;
        }

        if now < runner.next_time {
            continue;
        }

        let to = target.position + Vec3::Y * runner.height_offset;
        let from = runner.from_pos.unwrap_or_else(|| {
            let offset = config.map_or(Vec3::ZERO, SpellConfig::muzzle_offset);
            index.get(caster).map_or(to, |c| c.muzzle(offset))
        });

        let delta = to - from;
        let distance = delta.length();
        let speed = runner.projectile_speed.max(MIN_SPEED);

        projectile_requests.send(SpellProjectileSpawnRequest {
            attacker: caster,
            origin: from,
            direction: normalize_or_forward(delta),
            speed,
            damage: signed_amount(runner.amount, runner.positive),
            max_distance: (distance + CHAIN_HOP_DISTANCE_MARGIN).max(MIN_DISTANCE),
            radius: 0.0,
            layer_mask: runner.layer_mask,
            pierce: false,
            check_spawn_overlap: false,
            spell_name: runner.spell_name.clone(),
        });

        debug!(
            "{} hop {:?} -> {:?} ({} left)",
            runner.spell_name,
            runner.previous_target,
            target.entity,
            runner.remaining - 1
        );

        runner.remaining -= 1;
        runner.previous_target = Some(target.entity);
        runner.from_pos = Some(to);
        runner.current_target = next_chain_target(
            &index,
            target.position,
            runner.radius,
            runner.caster_faction,
            runner.positive,
            caster,
            target.entity,
        );
        runner.next_time = now + distance / speed + runner.jump_delay.max(0.0);

        if runner.remaining == 0 || runner.current_target.is_none() {
            commands.entity(caster).remove::<SpellChainRunner>();
        }
    }
}
