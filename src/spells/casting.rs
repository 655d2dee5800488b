//! Cast State Machine
//!
//! Drives each caster through Idle → Windup → Release:
//!
//! - A pending `CastRequest` is accepted when the caster is idle and off
//!   cooldown, and turned into an active `SpellWindup`.
//! - Once the release time is reached the facing gate may hold the release
//!   back in short retries, pushing a `ForcedFacing` toward the aim point.
//! - On release the effect-kind resolver fires the spell and the cooldown
//!   starts.
//!
//! The movement-lock mirror lives here as well since it only reflects the
//! windup state.

use bevy::prelude::*;

use super::components::{
    AttackLock, CastAim, CastRequest, DoTArea, DotOnTarget, Faction, ForcedFacing, MovementLock,
    SpellChainRunner, SpellCooldown, SpellStats, SpellWindup,
};
use super::constants::{FACING_RETRY_DELAY, POST_CAST_ATTACK_LOCK};
use super::events::{SpellCastEvent, SpellProjectileSpawnRequest, SummonRequest};
use super::registry::EffectRegistry;
use super::spell_config::{SpellConfig, SpellKind};
use super::utils::{flatten, normalize_or_forward, signed_horizontal_angle_deg};
use super::world::{ActorData, ActorIndex, ActorSnapshot};

// ============================================================================
// Effect-Kind Resolver
// ============================================================================

/// Everything the resolver needs to know about a spell at the moment it fires.
#[derive(Debug, Clone, Copy)]
pub struct SpellRelease<'a> {
    pub caster: &'a ActorSnapshot,
    pub faction: Faction,
    pub config: &'a SpellConfig,
    pub stats: SpellStats,
    /// Resolved aim point (target position, area point, or caster fallback)
    pub aim_point: Vec3,
    /// Live aim target, `None` for area aims or when the target is gone
    pub aim_target: Option<Entity>,
    pub now: f32,
}

/// What a released spell produces.
#[derive(Debug, Clone, PartialEq)]
pub enum SpellEffect {
    Projectile(SpellProjectileSpawnRequest),
    TargetOverTime(DotOnTarget),
    AreaOverTime(DoTArea),
    Chain(SpellChainRunner),
    Summon(SummonRequest),
}

/// Turn a released spell into its effect.
///
/// Returns `None` when the spell has nothing to fire: a target-bound spell
/// whose target is gone, or a summon without a known prefab.
pub fn resolve_spell_effect(release: &SpellRelease, registry: &EffectRegistry) -> Option<SpellEffect> {
    let config = release.config;
    let caster = release.caster;
    let positive = config.is_positive();
    let layer_mask = release.faction.layers_for(positive);
    let muzzle = caster.muzzle(config.muzzle_offset());

    match config.kind {
        SpellKind::ProjectileLine => {
            let direction = normalize_or_forward(flatten(release.aim_point - muzzle));
            Some(SpellEffect::Projectile(SpellProjectileSpawnRequest {
                attacker: caster.entity,
                origin: muzzle,
                direction,
                speed: config.projectile.speed,
                damage: config.signed_amount(),
                max_distance: config.projectile.max_distance,
                radius: config.projectile.radius,
                layer_mask,
                pierce: config.projectile.pierce,
                check_spawn_overlap: true,
                spell_name: config.name.clone(),
            }))
        }
        SpellKind::EffectOverTimeTarget => {
            let target = release.aim_target?;
            Some(SpellEffect::TargetOverTime(DotOnTarget {
                target,
                amount_per_tick: config.amount,
                interval: config.tick_interval(),
                remaining: config.over_time.duration,
                next_tick: release.now,
                started_at: release.now,
                positive,
                vfx: registry.resolve_vfx(config.over_time.vfx.as_deref()),
                spell_name: config.name.clone(),
            }))
        }
        SpellKind::EffectOverTimeArea => Some(SpellEffect::AreaOverTime(DoTArea {
            position: release.aim_point,
            radius: config.area.radius * release.stats.area_multiplier,
            amount_per_tick: config.amount,
            interval: config.tick_interval(),
            remaining: config.over_time.duration,
            next_tick: release.now,
            started_at: release.now,
            positive,
            layer_mask,
            vfx: registry.resolve_vfx(config.area.vfx.as_deref()),
            vfx_y_offset: config.area.vfx_y_offset,
            spell_name: config.name.clone(),
        })),
        SpellKind::Chain => {
            let target = release.aim_target?;
            Some(SpellEffect::Chain(SpellChainRunner {
                remaining: config.chain.max_targets.max(1),
                radius: config.chain.radius,
                jump_delay: config.chain.jump_delay,
                projectile_speed: config.chain.projectile_speed,
                amount: config.amount,
                positive,
                current_target: Some(target),
                previous_target: None,
                from_pos: Some(muzzle),
                next_time: release.now,
                caster_faction: release.faction,
                layer_mask,
                height_offset: config.chain.height_offset,
                spell_name: config.name.clone(),
            }))
        }
        SpellKind::Summon => {
            let name = config.summon.prefab.as_deref()?;
            let Some(prefab) = registry.prefab_id(name) else {
                warn!("{}: unknown summon prefab '{}'", config.name, name);
                return None;
            };
            Some(SpellEffect::Summon(SummonRequest {
                summoner: caster.entity,
                prefab,
                position: release.aim_point,
                count: config.summon.count.max(1),
                faction: release.faction,
            }))
        }
    }
}

/// Resolve the windup's aim into a world point and a live target.
///
/// A target that no longer exists falls back to the caster's own position.
pub fn resolve_aim(aim: Option<CastAim>, caster: &ActorSnapshot, index: &ActorIndex) -> (Vec3, Option<Entity>) {
    match aim {
        Some(CastAim::SingleTarget(target)) => match index.get(target) {
            Some(actor) => (actor.position, Some(actor.entity)),
            None => (caster.position, None),
        },
        Some(CastAim::AreaOfEffect(point)) => (point, None),
        None => (caster.position, None),
    }
}

/// True when the facing gate should hold the release back this tick.
pub fn needs_facing(config: &SpellConfig, caster: &ActorSnapshot, aim_point: Vec3, now: f32, deadline: f32) -> bool {
    if !config.require_facing || now >= deadline {
        return false;
    }
    let Some(angle) = signed_horizontal_angle_deg(caster.forward(), aim_point - caster.position) else {
        // Aim point on top of the caster: nothing to turn toward
        return false;
    };
    angle.abs() > config.face_tolerance()
}

// ============================================================================
// Windup-and-Fire Pass
// ============================================================================

/// Accept cast requests, run windups, and release spells.
#[allow(clippy::too_many_arguments)]
pub fn process_spell_windups(
    time: Res<Time>,
    mut commands: Commands,
    registry: Res<EffectRegistry>,
    actors: Query<ActorData>,
    mut casters: Query<(
        Entity,
        &SpellConfig,
        &Faction,
        Option<&SpellStats>,
        &mut CastRequest,
        &mut SpellWindup,
        &mut SpellCooldown,
    )>,
    mut projectile_requests: EventWriter<SpellProjectileSpawnRequest>,
    mut summon_requests: EventWriter<SummonRequest>,
    mut cast_events: EventWriter<SpellCastEvent>,
) {
    let now = time.elapsed_secs();
    let index = ActorIndex::build(actors.iter());

    for (entity, config, faction, stats, mut cast_request, mut windup, mut cooldown) in casters.iter_mut() {
        let request = cast_request.pending.take();

        let Some(caster) = index.get(entity) else {
            continue;
        };

        if !caster.is_alive() {
            // Dead casters drop whatever they were doing
            if windup.active {
                windup.active = false;
                windup.aim = None;
            }
            continue;
        }

        // Idle → Windup
        if let Some(aim) = request {
            if !windup.active && cooldown.is_ready(now) {
                let release_time = now + config.cast_time.max(0.0);
                *windup = SpellWindup {
                    active: true,
                    release_time,
                    facing_deadline: release_time + config.facing_grace.max(0.0),
                    aim: Some(aim),
                };
                debug!("{:?} begins casting {} ({:.2}s)", entity, config.name, config.cast_time);
            }
        }

        if !windup.active || now < windup.release_time {
            continue;
        }

        // Windup → Release, unless the facing gate holds it back
        let (aim_point, aim_target) = resolve_aim(windup.aim, caster, &index);
        if needs_facing(config, caster, aim_point, now, windup.facing_deadline) {
            commands.entity(entity).insert(ForcedFacing { point: aim_point });
            windup.release_time = now + FACING_RETRY_DELAY;
            continue;
        }

        let release = SpellRelease {
            caster,
            faction: *faction,
            config,
            stats: stats.copied().unwrap_or_default(),
            aim_point,
            aim_target,
            now,
        };

        match resolve_spell_effect(&release, &registry) {
            Some(SpellEffect::Projectile(request)) => {
                projectile_requests.send(request);
            }
            Some(SpellEffect::TargetOverTime(dot)) => {
                commands.entity(entity).insert(dot);
            }
            Some(SpellEffect::AreaOverTime(area)) => {
                commands.entity(entity).insert(area);
            }
            Some(SpellEffect::Chain(runner)) => {
                commands.entity(entity).insert(runner);
            }
            Some(SpellEffect::Summon(request)) => {
                summon_requests.send(request);
            }
            None => {
                debug!("{:?} released {} with nothing to fire", entity, config.name);
            }
        }

        cooldown.next_time = now + config.cooldown.max(0.0);
        windup.active = false;
        windup.aim = None;

        commands
            .entity(entity)
            .remove::<ForcedFacing>()
            .insert(AttackLock {
                until: now + POST_CAST_ATTACK_LOCK,
            });

        cast_events.send(SpellCastEvent {
            caster: entity,
            spell_name: config.name.clone(),
            kind: config.kind,
            aim_point,
            target: aim_target,
        });
    }
}

// ============================================================================
// Movement-Lock Mirror
// ============================================================================

/// Mirror "is winding up" into the casting bit of the movement lock.
pub fn mirror_casting_movement_lock(mut casters: Query<(&SpellWindup, &mut MovementLock)>) {
    for (windup, mut lock) in casters.iter_mut() {
        if lock.has(MovementLock::CASTING) != windup.active {
            lock.set(MovementLock::CASTING, windup.active);
        }
    }
}
