//! Combat events
//!
//! Health changes and the floating numbers that present them.

use bevy::prelude::*;

/// How a health change was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageDelivery {
    /// Projectile or chain hop impact
    Direct,
    /// Damage/heal-over-time tick
    Periodic,
}

/// Event fired whenever a spell changes an actor's health
#[derive(Event, Debug, Clone, PartialEq)]
pub struct DamageEvent {
    /// Entity whose spell caused the change
    pub source: Entity,
    /// Entity whose health changed
    pub target: Entity,
    /// Signed amount actually applied (positive = damage, negative = healing)
    pub amount: f32,
    /// Direction the effect travelled in, zero for area/periodic effects
    pub direction: Vec3,
    pub spell_name: String,
    pub delivery: DamageDelivery,
    /// Whether this change took the target to zero health
    pub killing_blow: bool,
}

impl DamageEvent {
    pub fn is_heal(&self) -> bool {
        self.amount < 0.0
    }
}

/// Kinds of floating number the presentation layer knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatingNumberKind {
    Damage,
    Heal,
    Dot,
    Hot,
}

impl FloatingNumberKind {
    /// Pick the kind for a signed health change
    pub fn for_change(amount: f32, periodic: bool) -> Self {
        match (amount < 0.0, periodic) {
            (false, false) => FloatingNumberKind::Damage,
            (true, false) => FloatingNumberKind::Heal,
            (false, true) => FloatingNumberKind::Dot,
            (true, true) => FloatingNumberKind::Hot,
        }
    }
}

/// Request to show a floating damage/heal number
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct FloatingNumberEvent {
    pub kind: FloatingNumberKind,
    /// Entity the number should follow, if any
    pub follow: Option<Entity>,
    pub position: Vec3,
    /// Magnitude shown (always non-negative)
    pub amount: f32,
}
