//! Spell Constants
//!
//! Centralized location for the timing floors, clamps and offsets used by the
//! spell passes. Keeping them here makes balance tuning a one-file change.

use bevy::math::Vec3;

// ============================================================================
// Timing
// ============================================================================

/// Shortest allowed interval between two damage/heal-over-time ticks.
pub const MIN_TICK_INTERVAL: f32 = 0.05;

/// Remaining effect duration at or below this counts as expired. Absorbs the
/// rounding left over from summing frame deltas.
pub const EXPIRY_EPSILON: f32 = 1e-4;

/// Delay before re-checking facing when a release is deferred for alignment.
pub const FACING_RETRY_DELAY: f32 = 0.033;

/// Facing tolerance never drops below one degree, so a perfectly-tuned
/// config cannot stall a release on float noise.
pub const MIN_FACE_TOLERANCE_DEG: f32 = 1.0;

/// How long ordinary attacks stay suppressed after a spell fires.
pub const POST_CAST_ATTACK_LOCK: f32 = 0.35;

// ============================================================================
// Clamps
// ============================================================================

/// Lower bound for projectile and chain travel speeds (units/second).
pub const MIN_SPEED: f32 = 0.01;

/// Lower bound for projectile travel distances (units).
pub const MIN_DISTANCE: f32 = 0.01;

/// Squared length under which a direction is treated as degenerate.
pub const DEGENERATE_LENGTH_SQUARED: f32 = 1e-8;

// ============================================================================
// Geometry
// ============================================================================

/// Canonical forward vector used when a direction collapses to zero.
/// Matches Bevy's `Transform::forward()` convention.
pub const DEFAULT_FORWARD: Vec3 = Vec3::NEG_Z;

/// Default height above an actor's origin that chain hops aim at.
pub const CHAIN_HEIGHT_OFFSET: f32 = 1.0;

/// Extra travel granted to chain hop projectiles beyond the measured hop
/// length, so the sweep reaches the target's hurtbox surface.
pub const CHAIN_HOP_DISTANCE_MARGIN: f32 = 0.5;

/// Default radius of an actor's hurtbox sphere.
pub const DEFAULT_HURTBOX_RADIUS: f32 = 0.5;

/// Default height of an actor's hurtbox centre above its origin (chest
/// height, lined up with chain hops and typical muzzle offsets).
pub const HURTBOX_CENTER_HEIGHT: f32 = 1.0;
