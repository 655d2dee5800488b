//! Per-Pass World Snapshots
//!
//! Every pass that needs to look at other actors builds a snapshot at pass
//! start and reads only from it while scanning:
//!
//! - [`ActorIndex`]: positions, orientation, faction and health of every
//!   actor, with capability lookups (has faction? has health?) resolved once
//!   into optional fields. Implements [`SpatialSearch`].
//! - [`CollisionWorld`]: hurtbox spheres for swept projectile queries and
//!   area overlap tests.
//!
//! Both are brute force. They stand in for the engine's spatial index and
//! physics queries, and keep the same contracts.

use bevy::prelude::*;
use smallvec::SmallVec;
use std::collections::HashMap;

use super::components::{Faction, FactionMask, Health, Hurtbox, HurtboxOf, LayerMask};
use super::constants::DEFAULT_FORWARD;

/// Query data needed to build an [`ActorIndex`].
pub type ActorData = (
    Entity,
    &'static Transform,
    Option<&'static Faction>,
    Option<&'static Health>,
);

/// Query data needed to build a [`CollisionWorld`].
pub type ColliderData = (
    Entity,
    &'static Transform,
    &'static Hurtbox,
    Option<&'static HurtboxOf>,
);

// ============================================================================
// Actors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthSnapshot {
    pub current: f32,
    pub max: f32,
}

impl HealthSnapshot {
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

/// Read-only view of one actor, captured at pass start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorSnapshot {
    pub entity: Entity,
    pub position: Vec3,
    pub rotation: Quat,
    pub faction: Option<Faction>,
    pub health: Option<HealthSnapshot>,
}

impl ActorSnapshot {
    pub fn forward(&self) -> Vec3 {
        self.rotation * DEFAULT_FORWARD
    }

    /// Actors without a health record count as alive
    pub fn is_alive(&self) -> bool {
        self.health.map_or(true, |h| h.current > 0.0)
    }

    /// World-space muzzle position for a caster-relative offset
    pub fn muzzle(&self, offset: Vec3) -> Vec3 {
        self.position + self.rotation * offset
    }
}

/// "Find actors of these factions within radius R of point P."
pub trait SpatialSearch {
    /// Living actors whose faction is in `factions` and whose origin lies
    /// within `radius` of `center`, in stable entity order.
    fn search(&self, center: Vec3, radius: f32, factions: FactionMask) -> SmallVec<[&ActorSnapshot; 16]>;
}

/// Snapshot of every actor, sorted by entity index for deterministic
/// iteration order (first found = lowest index).
#[derive(Debug, Default)]
pub struct ActorIndex {
    actors: Vec<ActorSnapshot>,
    lookup: HashMap<Entity, usize>,
}

impl ActorIndex {
    pub fn build<'a, I>(actors: I) -> Self
    where
        I: IntoIterator<Item = (Entity, &'a Transform, Option<&'a Faction>, Option<&'a Health>)>,
    {
        let mut snapshots: Vec<ActorSnapshot> = actors
            .into_iter()
            .map(|(entity, transform, faction, health)| ActorSnapshot {
                entity,
                position: transform.translation,
                rotation: transform.rotation,
                faction: faction.copied(),
                health: health.map(|h| HealthSnapshot {
                    current: h.current,
                    max: h.max,
                }),
            })
            .collect();
        snapshots.sort_by_key(|a| a.entity.index());

        let lookup = snapshots
            .iter()
            .enumerate()
            .map(|(i, a)| (a.entity, i))
            .collect();

        Self {
            actors: snapshots,
            lookup,
        }
    }

    /// Look up a live handle. Stale handles (despawned, or slot reused with a
    /// new generation) return `None`.
    pub fn get(&self, entity: Entity) -> Option<&ActorSnapshot> {
        self.lookup.get(&entity).map(|&i| &self.actors[i])
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.actors.iter()
    }
}

impl SpatialSearch for ActorIndex {
    fn search(&self, center: Vec3, radius: f32, factions: FactionMask) -> SmallVec<[&ActorSnapshot; 16]> {
        let radius_sq = radius.max(0.0) * radius.max(0.0);
        self.actors
            .iter()
            .filter(|a| a.is_alive())
            .filter(|a| a.faction.is_some_and(|f| factions.contains(f)))
            .filter(|a| a.position.distance_squared(center) <= radius_sq)
            .collect()
    }
}

// ============================================================================
// Colliders
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderSnapshot {
    pub entity: Entity,
    /// Actor that owns this collider
    pub root: Entity,
    pub center: Vec3,
    pub radius: f32,
    pub layer: u32,
}

/// One collider touched by a sweep or overlap query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub collider: Entity,
    pub root: Entity,
    /// Travel distance along the sweep at first contact (0.0 for overlaps)
    pub distance: f32,
    /// Contact point on the collider's surface
    pub point: Vec3,
}

/// Snapshot of every hurtbox for swept collision queries.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    colliders: Vec<ColliderSnapshot>,
}

impl CollisionWorld {
    pub fn build<'a, I>(colliders: I) -> Self
    where
        I: IntoIterator<Item = (Entity, &'a Transform, &'a Hurtbox, Option<&'a HurtboxOf>)>,
    {
        let mut colliders: Vec<ColliderSnapshot> = colliders
            .into_iter()
            .filter(|(_, _, hurtbox, _)| hurtbox.radius.is_finite() && hurtbox.radius >= 0.0)
            .map(|(entity, transform, hurtbox, owner)| ColliderSnapshot {
                entity,
                root: owner.map_or(entity, |o| o.0),
                center: transform.translation + Vec3::Y * hurtbox.center_height,
                radius: hurtbox.radius,
                layer: hurtbox.layer,
            })
            .collect();
        colliders.sort_by_key(|c| c.entity.index());
        Self { colliders }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Sweep a sphere of `radius` (0.0 = ray) from `origin` along the unit
    /// `direction` for `max_distance`. Results are unordered.
    ///
    /// Colliders that already contain the origin are not reported, the same
    /// way engine ray and sphere casts behave; use [`Self::overlap_sphere`]
    /// for those.
    pub fn sweep(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        radius: f32,
        mask: LayerMask,
    ) -> SmallVec<[SweepHit; 8]> {
        let mut hits = SmallVec::new();
        for collider in self.colliders.iter().filter(|c| mask.matches(c.layer)) {
            let combined = collider.radius + radius.max(0.0);
            let m = origin - collider.center;
            let c = m.length_squared() - combined * combined;
            if c <= 0.0 {
                continue;
            }
            let b = m.dot(direction);
            if b > 0.0 {
                // Origin outside and moving away
                continue;
            }
            let discriminant = b * b - c;
            if discriminant < 0.0 {
                continue;
            }
            let t = -b - discriminant.sqrt();
            if t < 0.0 || t > max_distance {
                continue;
            }
            let sweep_center = origin + direction * t;
            let point = if combined > 0.0 {
                collider.center + (sweep_center - collider.center) * (collider.radius / combined)
            } else {
                sweep_center
            };
            hits.push(SweepHit {
                collider: collider.entity,
                root: collider.root,
                distance: t,
                point,
            });
        }
        hits
    }

    /// Colliders intersecting the sphere at `center`, in stable order.
    pub fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> SmallVec<[SweepHit; 8]> {
        self.colliders
            .iter()
            .filter(|c| mask.matches(c.layer))
            .filter(|c| {
                let reach = c.radius + radius.max(0.0);
                c.center.distance_squared(center) <= reach * reach
            })
            .map(|c| {
                let offset = center - c.center;
                let point = if offset.length() > c.radius {
                    c.center + offset.normalize() * c.radius
                } else {
                    center
                };
                SweepHit {
                    collider: c.entity,
                    root: c.root,
                    distance: 0.0,
                    point,
                }
            })
            .collect()
    }
}
