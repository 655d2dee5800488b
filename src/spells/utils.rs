//! Shared Utility Functions
//!
//! Small geometry and keying helpers used by several spell passes.

use bevy::prelude::*;

use super::constants::{DEFAULT_FORWARD, DEGENERATE_LENGTH_SQUARED};
use super::registry::VfxId;

/// Project a vector onto the horizontal (XZ) plane.
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Normalize `v`, or return `DEFAULT_FORWARD` if it is degenerate.
pub fn normalize_or_forward(v: Vec3) -> Vec3 {
    if v.length_squared() <= DEGENERATE_LENGTH_SQUARED {
        DEFAULT_FORWARD
    } else {
        v.normalize()
    }
}

/// Signed angle in degrees from `from` to `to`, both flattened to the
/// horizontal plane. Positive turns counter-clockwise seen from above.
///
/// Returns `None` if either flattened vector is degenerate.
pub fn signed_horizontal_angle_deg(from: Vec3, to: Vec3) -> Option<f32> {
    let a = flatten(from);
    let b = flatten(to);
    if a.length_squared() <= DEGENERATE_LENGTH_SQUARED || b.length_squared() <= DEGENERATE_LENGTH_SQUARED {
        return None;
    }
    let a = a.normalize();
    let b = b.normalize();
    let cross_y = a.z * b.x - a.x * b.z;
    Some(cross_y.atan2(a.dot(b)).to_degrees())
}

/// Stable key for a persistent visual binding owned by `(owner, vfx)`.
///
/// The key only depends on the owner's handle bits and the effect id, so it
/// survives across passes and frames.
pub fn binding_key(owner: Entity, vfx: VfxId) -> u64 {
    let mut key = owner.to_bits() ^ 0xcbf2_9ce4_8422_2325;
    key = key.wrapping_mul(0x0000_0100_0000_01b3);
    key ^= u64::from(vfx.0).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    key.rotate_left(31)
}

/// Stable key for a visual that `owner` keeps on `target`.
///
/// Two owners putting the same effect on the same target get separate
/// bindings; a new target or effect gives the owner a new key.
pub fn target_binding_key(owner: Entity, target: Entity, vfx: VfxId) -> u64 {
    let key = binding_key(owner, vfx) ^ target.to_bits().wrapping_mul(0xff51_afd7_ed55_8ccd);
    key.rotate_left(17)
}
