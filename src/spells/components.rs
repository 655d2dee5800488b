//! Component Definitions for the Spell Core
//!
//! Records attached to actors. Actor-level records (faction, health, hurtbox)
//! describe who an actor is; spell records (requests, windup, cooldown, chain
//! runner, over-time effects) carry a caster's in-flight spell state.
//!
//! Structural changes to these records always go through `Commands`, so a
//! pass never invalidates the query it is iterating.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::constants::HURTBOX_CENTER_HEIGHT;
use super::registry::VfxId;

// ============================================================================
// Factions & Layers
// ============================================================================

/// Team an actor fights for. Ids 0..32 map onto one collision layer bit each.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Faction(pub u8);

impl Faction {
    /// Collision layer bit owned by this faction's hurtboxes
    pub fn layer(self) -> u32 {
        1u32 << (self.0 % 32)
    }

    /// Search mask containing only this faction
    pub fn mask(self) -> FactionMask {
        FactionMask(self.layer())
    }

    /// Search mask containing every other faction
    pub fn hostile_mask(self) -> FactionMask {
        FactionMask(!self.layer())
    }

    /// Layer mask for supportive effects (own faction only)
    pub fn friendly_layers(self) -> LayerMask {
        LayerMask(self.layer())
    }

    /// Layer mask for offensive effects (every other faction)
    pub fn hostile_layers(self) -> LayerMask {
        LayerMask(!self.layer())
    }

    /// Factions an effect of the given polarity should touch
    pub fn affected_by(self, positive: bool) -> FactionMask {
        if positive {
            self.mask()
        } else {
            self.hostile_mask()
        }
    }

    /// Layers an effect of the given polarity should touch
    pub fn layers_for(self, positive: bool) -> LayerMask {
        if positive {
            self.friendly_layers()
        } else {
            self.hostile_layers()
        }
    }
}

/// Set of acceptable factions for a spatial search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FactionMask(pub u32);

impl FactionMask {
    pub const ALL: FactionMask = FactionMask(u32::MAX);

    pub fn contains(self, faction: Faction) -> bool {
        self.0 & faction.layer() != 0
    }
}

/// Collision layer filter. Zero means "match everything".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(0);

    pub fn is_all(self) -> bool {
        self.0 == 0
    }

    pub fn matches(self, layer: u32) -> bool {
        self.is_all() || self.0 & layer != 0
    }
}

// ============================================================================
// Actor Records
// ============================================================================

/// Health-capable record. Positive damage hurts, negative damage heals.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Damage is ignored until this simulation time
    pub invulnerable_until: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            invulnerable_until: f32::NEG_INFINITY,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Current health as a fraction of max (0.0 when max is not positive)
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    /// Apply signed damage and return the signed change actually applied
    /// (positive = damage dealt, negative = healing done).
    ///
    /// Dead actors take neither damage nor healing. A positive
    /// `invulnerability_window` makes the actor ignore further damage for
    /// that long after a hit lands.
    pub fn apply_damage(&mut self, amount: f32, now: f32, invulnerability_window: f32) -> f32 {
        if !self.is_alive() {
            return 0.0;
        }
        if amount > 0.0 {
            if now < self.invulnerable_until {
                return 0.0;
            }
            let dealt = amount.min(self.current);
            self.current -= dealt;
            if invulnerability_window > 0.0 {
                self.invulnerable_until = now + invulnerability_window;
            }
            dealt
        } else if amount < 0.0 {
            let healed = (-amount).min(self.max - self.current).max(0.0);
            self.current += healed;
            -healed
        } else {
            0.0
        }
    }
}

/// Runtime stat multipliers applied on top of a caster's `SpellConfig`.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct SpellStats {
    pub range_multiplier: f32,
    pub area_multiplier: f32,
}

impl Default for SpellStats {
    fn default() -> Self {
        Self {
            range_multiplier: 1.0,
            area_multiplier: 1.0,
        }
    }
}

/// Sphere collider that projectiles and area effects can hit.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Hurtbox {
    pub radius: f32,
    /// Height of the sphere's centre above the entity's origin
    pub center_height: f32,
    /// Collision layer bits this collider belongs to
    pub layer: u32,
}

impl Hurtbox {
    pub fn for_faction(faction: Faction, radius: f32) -> Self {
        Self {
            radius,
            center_height: HURTBOX_CENTER_HEIGHT,
            layer: faction.layer(),
        }
    }
}

/// Links a child hurtbox to the actor that owns it. Without this link a
/// hurtbox's owner is the entity it sits on.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HurtboxOf(pub Entity);

/// Bit flags consumed by locomotion. A non-zero value pins the actor in place.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementLock(pub u8);

impl MovementLock {
    pub const CASTING: u8 = 1 << 0;

    pub fn is_locked(&self) -> bool {
        self.0 != 0
    }

    pub fn has(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// Suppresses the actor's ordinary attack until the given simulation time.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct AttackLock {
    pub until: f32,
}

impl AttackLock {
    pub fn is_active(&self, now: f32) -> bool {
        now < self.until
    }
}

/// Orientation override for the locomotion controller: turn toward `point`.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct ForcedFacing {
    pub point: Vec3,
}

// ============================================================================
// Spell Records
// ============================================================================

/// Set by an external planner/AI to ask for a new cast decision.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpellDecisionRequest {
    pub pending: bool,
}

/// Where a cast is aimed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CastAim {
    SingleTarget(Entity),
    AreaOfEffect(Vec3),
}

impl CastAim {
    pub fn target(&self) -> Option<Entity> {
        match self {
            CastAim::SingleTarget(entity) => Some(*entity),
            CastAim::AreaOfEffect(_) => None,
        }
    }
}

/// Output of the planner, consumed by the windup pass. `None` = no value.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct CastRequest {
    pub pending: Option<CastAim>,
}

/// In-flight cast. Only one windup can be active per caster.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct SpellWindup {
    pub active: bool,
    /// Simulation time at which the spell tries to release
    pub release_time: f32,
    /// After this time the facing gate no longer holds the release back
    pub facing_deadline: f32,
    pub aim: Option<CastAim>,
}

/// Casting is forbidden while `now < next_time`.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct SpellCooldown {
    pub next_time: f32,
}

impl SpellCooldown {
    pub fn is_ready(&self, now: f32) -> bool {
        now >= self.next_time
    }
}

/// State of an in-flight chain spell, advanced one hop at a time.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct SpellChainRunner {
    /// Hops left to fire, including the one aimed at `current_target`
    pub remaining: u32,
    pub radius: f32,
    pub jump_delay: f32,
    pub projectile_speed: f32,
    pub amount: f32,
    pub positive: bool,
    pub current_target: Option<Entity>,
    pub previous_target: Option<Entity>,
    /// Landing point of the previous hop; `None` before the first hop
    pub from_pos: Option<Vec3>,
    pub next_time: f32,
    pub caster_faction: Faction,
    pub layer_mask: LayerMask,
    pub height_offset: f32,
    pub spell_name: String,
}

/// Damage/heal-over-time attached to the caster, ticking on `target`.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct DotOnTarget {
    pub target: Entity,
    pub amount_per_tick: f32,
    pub interval: f32,
    /// Seconds of effect left
    pub remaining: f32,
    pub next_tick: f32,
    /// Simulation time the record was created; no time is consumed on that tick
    pub started_at: f32,
    pub positive: bool,
    pub vfx: Option<VfxId>,
    pub spell_name: String,
}

/// Damage/heal-over-time attached to the caster, ticking on a sphere.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct DoTArea {
    pub position: Vec3,
    pub radius: f32,
    pub amount_per_tick: f32,
    pub interval: f32,
    pub remaining: f32,
    pub next_tick: f32,
    pub started_at: f32,
    pub positive: bool,
    pub layer_mask: LayerMask,
    pub vfx: Option<VfxId>,
    pub vfx_y_offset: f32,
    pub spell_name: String,
}

/// Persistent visual bound to the caster's `DotOnTarget`.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveTargetVfx {
    pub key: u64,
    pub vfx: VfxId,
    pub target: Entity,
}

/// Persistent visual bound to the caster's `DoTArea`.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveAreaVfx {
    pub key: u64,
    pub vfx: VfxId,
}

// ============================================================================
// Projectiles
// ============================================================================

/// Runtime state of a spawned spell projectile.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Projectile {
    pub attacker: Entity,
    /// Unit travel direction
    pub direction: Vec3,
    pub speed: f32,
    /// Signed: positive damages, negative heals
    pub damage: f32,
    pub remaining_distance: f32,
    pub layer_mask: LayerMask,
    /// 0.0 = ray, > 0.0 = thick sweep
    pub radius: f32,
    pub pierce: bool,
    pub last_position: Vec3,
    /// Overlap check at the spawn point still pending
    pub check_spawn_overlap: bool,
    /// Roots already affected during this flight
    pub already_hit: SmallVec<[Entity; 4]>,
    pub spell_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_and_heal_are_clamped() {
        let mut health = Health::new(100.0);
        assert_eq!(health.apply_damage(30.0, 0.0, 0.0), 30.0);
        assert_eq!(health.apply_damage(-50.0, 0.0, 0.0), -30.0);
        assert_eq!(health.current, 100.0);
        assert_eq!(health.apply_damage(250.0, 0.0, 0.0), 100.0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_dead_actors_cannot_be_healed() {
        let mut health = Health::new(10.0);
        health.apply_damage(10.0, 0.0, 0.0);
        assert_eq!(health.apply_damage(-5.0, 0.0, 0.0), 0.0);
        assert_eq!(health.current, 0.0);
    }

    #[test]
    fn test_invulnerability_window_blocks_damage_only() {
        let mut health = Health::new(100.0);
        health.apply_damage(10.0, 1.0, 0.5);
        assert_eq!(health.apply_damage(10.0, 1.2, 0.0), 0.0);
        assert_eq!(health.apply_damage(-5.0, 1.2, 0.0), -5.0);
        assert_eq!(health.apply_damage(10.0, 1.5, 0.0), 10.0);
    }

    #[test]
    fn test_faction_masks() {
        let blue = Faction(1);
        let red = Faction(2);
        assert!(blue.mask().contains(blue));
        assert!(!blue.mask().contains(red));
        assert!(blue.hostile_mask().contains(red));
        assert!(!blue.hostile_mask().contains(blue));
        assert!(blue.hostile_layers().matches(red.layer()));
        assert!(!blue.friendly_layers().matches(red.layer()));
    }

    #[test]
    fn test_zero_layer_mask_matches_everything() {
        assert!(LayerMask::ALL.matches(0b1010));
        assert!(LayerMask(0b0010).matches(0b1010));
        assert!(!LayerMask(0b0100).matches(0b1010));
    }

    #[test]
    fn test_movement_lock_bits() {
        let mut lock = MovementLock::default();
        lock.set(MovementLock::CASTING, true);
        assert!(lock.has(MovementLock::CASTING));
        lock.set(MovementLock::CASTING, false);
        assert!(!lock.is_locked());
    }
}
