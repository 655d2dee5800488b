//! Status-Effect Tick Pass
//!
//! Ticks damage/heal-over-time records on their own interval, independent of
//! planning and casting:
//!
//! - `DotOnTarget` applies to one target actor and keeps one persistent
//!   visual bound to it.
//! - `DoTArea` applies to every health-capable actor inside a sphere and
//!   keeps one persistent visual at the area's centre.
//!
//! Visual bindings are only created, moved and ended here. A record that
//! ends takes its binding down in the same pass, and a final sweep ends any
//! binding whose record was removed from outside.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::combat::events::{DamageDelivery, DamageEvent, FloatingNumberEvent};
use crate::combat::{deliver_health_change, HealthChange, FLOATING_NUMBER_HEIGHT};

use super::components::{ActiveAreaVfx, ActiveTargetVfx, DoTArea, DotOnTarget, Health};
use super::constants::{EXPIRY_EPSILON, MIN_TICK_INTERVAL};
use super::events::VfxCommand;
use super::registry::VfxId;
use super::spell_config::signed_amount;
use super::utils::{binding_key, target_binding_key};
use super::world::{ColliderData, CollisionWorld};

/// What the visual service should do for a binding this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingUpdate {
    /// Nothing bound and nothing wanted
    None,
    /// Create a new binding
    Begin { key: u64, vfx: VfxId },
    /// Keep the binding, just follow the owner
    Move { key: u64, vfx: VfxId },
    /// Replace a stale binding with a new one
    Rebind { old_key: u64, key: u64, vfx: VfxId },
    /// Drop a binding nobody wants anymore
    End { old_key: u64 },
}

/// Decide how an existing binding (`current`) relates to the wanted one.
pub fn plan_binding(current: Option<(u64, VfxId)>, wanted: Option<(u64, VfxId)>) -> BindingUpdate {
    match (current, wanted) {
        (None, None) => BindingUpdate::None,
        (None, Some((key, vfx))) => BindingUpdate::Begin { key, vfx },
        (Some((old_key, _)), None) => BindingUpdate::End { old_key },
        (Some((old_key, old_vfx)), Some((key, vfx))) => {
            if old_key == key && old_vfx == vfx {
                BindingUpdate::Move { key, vfx }
            } else {
                BindingUpdate::Rebind { old_key, key, vfx }
            }
        }
    }
}

/// Send the visual commands for a binding update. Returns the binding that
/// remains active afterwards, if any.
fn send_binding_update(
    update: BindingUpdate,
    position: Vec3,
    follow: Option<Entity>,
    vfx_commands: &mut EventWriter<VfxCommand>,
) -> Option<(u64, VfxId)> {
    match update {
        BindingUpdate::None => None,
        BindingUpdate::Begin { key, vfx } => {
            vfx_commands.send(VfxCommand::Begin {
                vfx,
                key,
                position,
                follow,
            });
            Some((key, vfx))
        }
        BindingUpdate::Move { key, vfx } => {
            vfx_commands.send(VfxCommand::Move {
                vfx,
                key,
                position,
                follow,
            });
            Some((key, vfx))
        }
        BindingUpdate::Rebind { old_key, key, vfx } => {
            vfx_commands.send(VfxCommand::End { key: old_key });
            vfx_commands.send(VfxCommand::Begin {
                vfx,
                key,
                position,
                follow,
            });
            Some((key, vfx))
        }
        BindingUpdate::End { old_key } => {
            vfx_commands.send(VfxCommand::End { key: old_key });
            None
        }
    }
}

// ============================================================================
// Target Effects
// ============================================================================

/// Tick every `DotOnTarget` and keep its visual bound to the target.
#[allow(clippy::too_many_arguments)]
pub fn tick_target_effects(
    time: Res<Time>,
    mut commands: Commands,
    mut owners: Query<(Entity, &mut DotOnTarget, Option<&ActiveTargetVfx>)>,
    transforms: Query<&Transform>,
    mut healths: Query<&mut Health>,
    mut vfx_commands: EventWriter<VfxCommand>,
    mut damage_events: EventWriter<DamageEvent>,
    mut floating_numbers: EventWriter<FloatingNumberEvent>,
) {
    let now = time.elapsed_secs();
    let dt = time.delta_secs();

    for (owner, mut dot, binding) in owners.iter_mut() {
        let current = binding.map(|b| (b.key, b.vfx));

        let target_alive = healths.get(dot.target).map_or(true, |h| h.is_alive());
        let target_position = transforms
            .get(dot.target)
            .ok()
            .filter(|_| target_alive)
            .map(|t| t.translation);

        // Stale or dead target: the effect ends early
        let Some(target_position) = target_position else {
            send_binding_update(plan_binding(current, None), Vec3::ZERO, None, &mut vfx_commands);
            commands
                .entity(owner)
                .remove::<DotOnTarget>()
                .remove::<ActiveTargetVfx>();
            continue;
        };

        // The creating tick's frame time elapsed before the cast
        if now > dot.started_at {
            dot.remaining -= dt;
        }
        if dot.remaining <= EXPIRY_EPSILON {
            send_binding_update(plan_binding(current, None), target_position, None, &mut vfx_commands);
            commands
                .entity(owner)
                .remove::<DotOnTarget>()
                .remove::<ActiveTargetVfx>();
            debug!("{} on {:?} expired", dot.spell_name, dot.target);
            continue;
        }

        let wanted = dot.vfx.map(|vfx| (target_binding_key(owner, dot.target, vfx), vfx));
        let update = plan_binding(current, wanted);
        let bound = send_binding_update(update, target_position, Some(dot.target), &mut vfx_commands);
        match (bound, update) {
            (Some((key, vfx)), BindingUpdate::Begin { .. } | BindingUpdate::Rebind { .. }) => {
                commands.entity(owner).insert(ActiveTargetVfx {
                    key,
                    vfx,
                    target: dot.target,
                });
            }
            (None, BindingUpdate::End { .. }) => {
                commands.entity(owner).remove::<ActiveTargetVfx>();
            }
            _ => {}
        }

        if dot.next_tick > now {
            continue;
        }
        dot.next_tick += dot.interval.max(MIN_TICK_INTERVAL);

        let Ok(mut health) = healths.get_mut(dot.target) else {
            continue;
        };
        deliver_health_change(
            HealthChange {
                source: owner,
                target: dot.target,
                amount: signed_amount(dot.amount_per_tick, dot.positive),
                direction: Vec3::ZERO,
                position: target_position + Vec3::Y * FLOATING_NUMBER_HEIGHT,
                spell_name: &dot.spell_name,
                delivery: DamageDelivery::Periodic,
            },
            &mut health,
            now,
            &mut damage_events,
            &mut floating_numbers,
        );
    }
}

// ============================================================================
// Area Effects
// ============================================================================

/// Tick every `DoTArea` against the hurtboxes inside its sphere.
#[allow(clippy::too_many_arguments)]
pub fn tick_area_effects(
    time: Res<Time>,
    mut commands: Commands,
    mut owners: Query<(Entity, &mut DoTArea, Option<&ActiveAreaVfx>)>,
    colliders: Query<ColliderData>,
    mut healths: Query<&mut Health>,
    mut vfx_commands: EventWriter<VfxCommand>,
    mut damage_events: EventWriter<DamageEvent>,
    mut floating_numbers: EventWriter<FloatingNumberEvent>,
) {
    if owners.is_empty() {
        return;
    }

    let now = time.elapsed_secs();
    let dt = time.delta_secs();
    let world = CollisionWorld::build(colliders.iter());

    for (owner, mut area, binding) in owners.iter_mut() {
        let current = binding.map(|b| (b.key, b.vfx));
        let vfx_position = area.position + Vec3::Y * area.vfx_y_offset;

        if now > area.started_at {
            area.remaining -= dt;
        }
        if area.remaining <= EXPIRY_EPSILON {
            send_binding_update(plan_binding(current, None), vfx_position, None, &mut vfx_commands);
            commands
                .entity(owner)
                .remove::<DoTArea>()
                .remove::<ActiveAreaVfx>();
            debug!("{} area at {} expired", area.spell_name, area.position);
            continue;
        }

        let wanted = area.vfx.map(|vfx| (binding_key(owner, vfx), vfx));
        let update = plan_binding(current, wanted);
        let bound = send_binding_update(update, vfx_position, None, &mut vfx_commands);
        match (bound, update) {
            (Some((key, vfx)), BindingUpdate::Begin { .. } | BindingUpdate::Rebind { .. }) => {
                commands.entity(owner).insert(ActiveAreaVfx { key, vfx });
            }
            (None, BindingUpdate::End { .. }) => {
                commands.entity(owner).remove::<ActiveAreaVfx>();
            }
            _ => {}
        }

        if area.next_tick > now {
            continue;
        }
        area.next_tick += area.interval.max(MIN_TICK_INTERVAL);

        let amount = signed_amount(area.amount_per_tick, area.positive);
        let mut affected: SmallVec<[Entity; 8]> = SmallVec::new();
        for hit in world.overlap_sphere(area.position, area.radius, area.layer_mask) {
            if affected.contains(&hit.root) {
                continue;
            }
            let Ok(mut health) = healths.get_mut(hit.root) else {
                continue;
            };
            if !health.is_alive() {
                continue;
            }
            affected.push(hit.root);

            deliver_health_change(
                HealthChange {
                    source: owner,
                    target: hit.root,
                    amount,
                    direction: Vec3::ZERO,
                    position: hit.point + Vec3::Y * FLOATING_NUMBER_HEIGHT,
                    spell_name: &area.spell_name,
                    delivery: DamageDelivery::Periodic,
                },
                &mut health,
                now,
                &mut damage_events,
                &mut floating_numbers,
            );
        }
    }
}

// ============================================================================
// Orphan Cleanup
// ============================================================================

/// End visual bindings whose owning record is gone.
pub fn cleanup_orphan_effect_visuals(
    mut commands: Commands,
    target_orphans: Query<(Entity, &ActiveTargetVfx), Without<DotOnTarget>>,
    area_orphans: Query<(Entity, &ActiveAreaVfx), Without<DoTArea>>,
    mut vfx_commands: EventWriter<VfxCommand>,
) {
    for (owner, binding) in target_orphans.iter() {
        vfx_commands.send(VfxCommand::End { key: binding.key });
        commands.entity(owner).remove::<ActiveTargetVfx>();
    }
    for (owner, binding) in area_orphans.iter() {
        vfx_commands.send(VfxCommand::End { key: binding.key });
        commands.entity(owner).remove::<ActiveAreaVfx>();
    }
}
