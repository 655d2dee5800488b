//! Projectile Sweep Simulation
//!
//! Spawn requests are armed into `Projectile` entities, which then move in a
//! straight line every tick. Each tick's travel is swept against hurtboxes
//! (a ray for radius 0, a thick sweep otherwise) so fast projectiles cannot
//! tunnel through targets between frames.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::combat::events::{DamageDelivery, DamageEvent, FloatingNumberEvent};
use crate::combat::{deliver_health_change, HealthChange};

use super::components::{Health, LayerMask, Projectile};
use super::constants::{DEFAULT_FORWARD, MIN_DISTANCE, MIN_SPEED};
use super::events::SpellProjectileSpawnRequest;
use super::utils::normalize_or_forward;
use super::world::{ColliderData, CollisionWorld, SweepHit};

impl Projectile {
    /// Arm a spawn request: normalize the direction and clamp speed and
    /// travel distance away from zero.
    pub fn arm(request: &SpellProjectileSpawnRequest) -> Self {
        Self {
            attacker: request.attacker,
            direction: normalize_or_forward(request.direction),
            speed: request.speed.max(MIN_SPEED),
            damage: request.damage,
            remaining_distance: request.max_distance.max(MIN_DISTANCE),
            layer_mask: request.layer_mask,
            radius: request.radius.max(0.0),
            pierce: request.pierce,
            last_position: request.origin,
            check_spawn_overlap: request.check_spawn_overlap,
            already_hit: SmallVec::new(),
            spell_name: request.spell_name.clone(),
        }
    }
}

/// Spawn a projectile entity for every spawn request sent this tick.
pub fn spawn_spell_projectiles(mut commands: Commands, mut requests: EventReader<SpellProjectileSpawnRequest>) {
    for request in requests.read() {
        let projectile = Projectile::arm(request);
        let rotation = Quat::from_rotation_arc(DEFAULT_FORWARD, projectile.direction);
        commands.spawn((
            Name::new(format!("{} projectile", request.spell_name)),
            Transform::from_translation(request.origin).with_rotation(rotation),
            projectile,
        ));
    }
}

/// Everything a projectile touches during one tick, nearest first.
///
/// On the first tick a spawn overlap check adds colliders already touching
/// the origin at distance 0. If the masked sweep finds nothing, it is retried
/// once against every layer.
pub fn collect_projectile_hits(projectile: &Projectile, step: f32, world: &CollisionWorld) -> SmallVec<[SweepHit; 8]> {
    let mut hits: SmallVec<[SweepHit; 8]> = SmallVec::new();
    if projectile.check_spawn_overlap {
        hits.extend(world.overlap_sphere(projectile.last_position, projectile.radius, projectile.layer_mask));
    }

    let mut swept = world.sweep(
        projectile.last_position,
        projectile.direction,
        step,
        projectile.radius,
        projectile.layer_mask,
    );
    if swept.is_empty() && !projectile.layer_mask.is_all() {
        swept = world.sweep(
            projectile.last_position,
            projectile.direction,
            step,
            projectile.radius,
            LayerMask::ALL,
        );
    }
    hits.extend(swept);

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Move every projectile one step and resolve what it hits.
pub fn sweep_spell_projectiles(
    time: Res<Time>,
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Projectile, &mut Transform)>,
    colliders: Query<ColliderData, Without<Projectile>>,
    mut healths: Query<&mut Health>,
    mut damage_events: EventWriter<DamageEvent>,
    mut floating_numbers: EventWriter<FloatingNumberEvent>,
) {
    if projectiles.is_empty() {
        return;
    }

    let now = time.elapsed_secs();
    let dt = time.delta_secs();
    let world = CollisionWorld::build(colliders.iter());

    for (entity, mut projectile, mut transform) in projectiles.iter_mut() {
        if projectile.remaining_distance <= 0.0 {
            commands.entity(entity).despawn();
            continue;
        }

        let step = (projectile.speed * dt).min(projectile.remaining_distance);
        let hits = collect_projectile_hits(&projectile, step, &world);
        projectile.check_spawn_overlap = false;

        let mut stopped = false;
        for hit in hits {
            if hit.root == projectile.attacker || projectile.already_hit.contains(&hit.root) {
                continue;
            }
            let Ok(mut health) = healths.get_mut(hit.root) else {
                continue;
            };
            if !health.is_alive() {
                continue;
            }

            deliver_health_change(
                HealthChange {
                    source: projectile.attacker,
                    target: hit.root,
                    amount: projectile.damage,
                    direction: projectile.direction,
                    position: hit.point,
                    spell_name: &projectile.spell_name,
                    delivery: DamageDelivery::Direct,
                },
                &mut health,
                now,
                &mut damage_events,
                &mut floating_numbers,
            );
            projectile.already_hit.push(hit.root);

            if !projectile.pierce {
                transform.translation = hit.point;
                commands.entity(entity).despawn();
                stopped = true;
                break;
            }
        }

        if stopped {
            continue;
        }

        let advanced = projectile.last_position + projectile.direction * step;
        projectile.last_position = advanced;
        projectile.remaining_distance -= step;
        transform.translation = advanced;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::components::Hurtbox;

    fn request(direction: Vec3, speed: f32, max_distance: f32) -> SpellProjectileSpawnRequest {
        SpellProjectileSpawnRequest {
            attacker: Entity::from_raw(0),
            origin: Vec3::ZERO,
            direction,
            speed,
            damage: 10.0,
            max_distance,
            radius: 0.0,
            layer_mask: LayerMask(0b10),
            pierce: true,
            check_spawn_overlap: false,
            spell_name: "Test Bolt".to_string(),
        }
    }

    fn world(colliders: &[(u32, f32, u32)]) -> CollisionWorld {
        let transforms: Vec<Transform> = colliders
            .iter()
            .map(|(_, x, _)| Transform::from_xyz(*x, 0.0, 0.0))
            .collect();
        let hurtboxes: Vec<Hurtbox> = colliders
            .iter()
            .map(|(_, _, layer)| Hurtbox {
                radius: 0.5,
                center_height: 0.0,
                layer: *layer,
            })
            .collect();
        CollisionWorld::build(
            colliders
                .iter()
                .enumerate()
                .map(|(i, (index, _, _))| (Entity::from_raw(*index), &transforms[i], &hurtboxes[i], None)),
        )
    }

    #[test]
    fn test_arm_clamps_and_normalizes() {
        let projectile = Projectile::arm(&request(Vec3::ZERO, 0.0, -3.0));
        assert_eq!(projectile.direction, DEFAULT_FORWARD);
        assert_eq!(projectile.speed, MIN_SPEED);
        assert_eq!(projectile.remaining_distance, MIN_DISTANCE);

        let projectile = Projectile::arm(&request(Vec3::new(3.0, 0.0, 4.0), 20.0, 30.0));
        assert!((projectile.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(projectile.last_position, Vec3::ZERO);
    }

    #[test]
    fn test_hits_are_sorted_by_distance() {
        let world = world(&[(3, 8.0, 0b10), (1, 4.0, 0b10), (2, 6.0, 0b10)]);
        let projectile = Projectile::arm(&request(Vec3::X, 20.0, 30.0));
        let hits = collect_projectile_hits(&projectile, 10.0, &world);
        let order: Vec<u32> = hits.iter().map(|h| h.collider.index()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_masked_miss_retries_against_all_layers() {
        let world = world(&[(1, 4.0, 0b01)]);
        let projectile = Projectile::arm(&request(Vec3::X, 20.0, 30.0));
        let hits = collect_projectile_hits(&projectile, 10.0, &world);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_spawn_overlap_reports_contained_origin() {
        let world = world(&[(1, 0.2, 0b10)]);
        let mut projectile = Projectile::arm(&request(Vec3::X, 20.0, 30.0));
        assert!(collect_projectile_hits(&projectile, 1.0, &world).is_empty());

        projectile.check_spawn_overlap = true;
        let hits = collect_projectile_hits(&projectile, 1.0, &world);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 0.0);
    }
}
