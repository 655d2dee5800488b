//! Integration tests for planning and the cast state machine
//!
//! These tests verify that:
//! - Casters never start a new windup while winding up or cooling down
//! - Decision and cast requests are always consumed
//! - The facing gate defers release until aligned or out of grace time
//! - Dead casters and vanished targets are handled without stalling

mod common;

use bevy::prelude::*;
use common::*;

use spellcast::headless::runner::turn_toward;
use spellcast::spells::components::{
    AttackLock, CastAim, CastRequest, ForcedFacing, Health, MovementLock, SpellDecisionRequest, SpellWindup,
};
use spellcast::spells::events::SpellCastEvent;
use spellcast::spells::spell_config::ProjectileParams;
use spellcast::spells::systems::SpellSystemPhase;
use spellcast::spells::{SpellConfig, SpellKind};

fn bolt(cast_time: f32, cooldown: f32) -> SpellConfig {
    SpellConfig {
        name: "Test Bolt".to_string(),
        kind: SpellKind::ProjectileLine,
        range: 20.0,
        cast_time,
        cooldown,
        amount: 10.0,
        muzzle_offset: [0.0, 1.0, 0.0],
        projectile: ProjectileParams {
            speed: 20.0,
            radius: 0.0,
            max_distance: 30.0,
            pierce: false,
        },
        ..default()
    }
}

// =============================================================================
// Cast Gating
// =============================================================================

#[test]
fn test_windup_and_cooldown_gate_new_casts() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(1.0, 2.0));
    spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 10_000.0);
    always_request(&mut app, caster);

    run_for(&mut app, 5.0);

    let casts: Vec<f32> = captured::<SpellCastEvent>(&app).0.iter().map(|(t, _)| *t).collect();
    assert_eq!(casts.len(), 2, "windup 1s + cooldown 2s allows two releases in 5s");
    assert!(
        casts[1] - casts[0] >= 2.98,
        "releases must be at least cast time + cooldown apart, got {:.3}",
        casts[1] - casts[0]
    );
}

#[test]
fn test_windup_sets_movement_lock_and_release_clears_it() {
    let mut app = test_app();
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(1.0, 5.0));
    spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    request_decision(&mut app, caster);

    run_for(&mut app, 0.5);
    assert!(app.world().get::<SpellWindup>(caster).unwrap().active);
    assert!(app.world().get::<MovementLock>(caster).unwrap().has(MovementLock::CASTING));

    run_for(&mut app, 0.6);
    assert!(!app.world().get::<SpellWindup>(caster).unwrap().active);
    assert!(!app.world().get::<MovementLock>(caster).unwrap().is_locked());

    let lock = *app.world().get::<AttackLock>(caster).expect("release should lock attacks");
    assert!(lock.is_active(now(&app)));

    run_for(&mut app, 0.5);
    assert!(!lock.is_active(now(&app)), "the post-cast lock is brief");
}

#[test]
fn test_instant_cast_fires_on_the_accepting_tick() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(0.0, 5.0));
    let target = spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    request_decision(&mut app, caster);

    app.update();

    let casts = captured::<SpellCastEvent>(&app);
    assert_eq!(casts.len(), 1);
    let cast = casts.events().next().unwrap();
    assert_eq!(cast.target, Some(target));
    assert_eq!(cast.kind, SpellKind::ProjectileLine);
}

// =============================================================================
// Request Consumption
// =============================================================================

#[test]
fn test_requests_are_consumed_while_cooling_down() {
    let mut app = test_app();
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(0.0, 10.0));
    let target = spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);

    request_decision(&mut app, caster);
    app.update();

    // Cooling down now; both kinds of request must still be cleared
    request_decision(&mut app, caster);
    app.world_mut().get_mut::<CastRequest>(caster).unwrap().pending = Some(CastAim::SingleTarget(target));
    app.update();

    assert!(!app.world().get::<SpellDecisionRequest>(caster).unwrap().pending);
    assert!(app.world().get::<CastRequest>(caster).unwrap().pending.is_none());
    assert!(!app.world().get::<SpellWindup>(caster).unwrap().active);
}

#[test]
fn test_request_without_targets_is_cleared() {
    let mut app = test_app();
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(0.5, 1.0));

    request_decision(&mut app, caster);
    app.update();

    assert!(!app.world().get::<SpellDecisionRequest>(caster).unwrap().pending);
    assert!(app.world().get::<CastRequest>(caster).unwrap().pending.is_none());
    assert!(!app.world().get::<SpellWindup>(caster).unwrap().active);
}

#[test]
fn test_cast_request_during_windup_is_dropped() {
    let mut app = test_app();
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(1.0, 1.0));
    let first = spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    let second = spawn_actor(&mut app, "Red Decoy", RED, Vec3::new(0.0, 0.0, 12.0), 1000.0);

    request_decision(&mut app, caster);
    app.update();

    app.world_mut().get_mut::<CastRequest>(caster).unwrap().pending = Some(CastAim::SingleTarget(second));
    app.update();

    let windup = app.world().get::<SpellWindup>(caster).unwrap();
    assert!(windup.active);
    assert_eq!(windup.aim, Some(CastAim::SingleTarget(first)));
    assert!(app.world().get::<CastRequest>(caster).unwrap().pending.is_none());
}

// =============================================================================
// Cancellation and Fallbacks
// =============================================================================

#[test]
fn test_dead_caster_drops_its_windup() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, bolt(1.0, 1.0));
    spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    request_decision(&mut app, caster);
    run_for(&mut app, 0.3);

    app.world_mut().get_mut::<Health>(caster).unwrap().current = 0.0;
    run_for(&mut app, 1.5);

    assert!(!app.world().get::<SpellWindup>(caster).unwrap().active);
    assert_eq!(captured::<SpellCastEvent>(&app).len(), 0);
}

#[test]
fn test_vanished_target_falls_back_to_caster_position() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);

    let caster_position = Vec3::new(2.0, 0.0, 3.0);
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, caster_position, Vec3::X * 10.0, bolt(0.5, 5.0));
    let target = spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 3.0), 1000.0);
    request_decision(&mut app, caster);
    run_for(&mut app, 0.2);

    app.world_mut().despawn(target);
    run_for(&mut app, 0.5);

    let casts = captured::<SpellCastEvent>(&app);
    assert_eq!(casts.len(), 1, "the cast still releases");
    let cast = casts.events().next().unwrap();
    assert_eq!(cast.target, None);
    assert_eq!(cast.aim_point, caster_position);
}

// =============================================================================
// Facing Gate
// =============================================================================

fn facing_bolt(grace: f32) -> SpellConfig {
    SpellConfig {
        require_facing: true,
        face_tolerance_deg: 15.0,
        facing_grace: grace,
        ..bolt(0.5, 10.0)
    }
}

fn turn_toward_forced_facing(time: Res<Time>, mut actors: Query<(&mut Transform, &ForcedFacing)>) {
    let step = 360.0 * time.delta_secs();
    for (mut transform, facing) in actors.iter_mut() {
        turn_toward(&mut transform, facing.point, step);
    }
}

#[test]
fn test_misaligned_caster_fires_once_at_facing_deadline() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);

    // Facing -Z while the target sits on +X: 90 degrees off
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), facing_bolt(0.3));
    let target = spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    request_decision(&mut app, caster);
    app.update();
    let accepted_at = now(&app);

    run_for(&mut app, 0.6);
    let facing = app
        .world()
        .get::<ForcedFacing>(caster)
        .expect("a forced facing is issued while the gate holds");
    assert_eq!(facing.point, Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(captured::<SpellCastEvent>(&app).len(), 0);

    run_for(&mut app, 1.0);

    let casts = &captured::<SpellCastEvent>(&app).0;
    assert_eq!(casts.len(), 1, "the spell fires exactly once");
    let fired_after = casts[0].0 - accepted_at;
    assert!(
        (0.79..0.9).contains(&fired_after),
        "expected release at cast time + grace, got {:.3}",
        fired_after
    );
    assert_eq!(casts[0].1.target, Some(target));
    assert!(app.world().get::<ForcedFacing>(caster).is_none());
}

#[test]
fn test_turning_caster_fires_once_aligned() {
    let mut app = test_app();
    app.add_systems(Update, turn_toward_forced_facing.after(SpellSystemPhase::Casting));
    capture_events::<SpellCastEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), facing_bolt(2.0));
    spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    request_decision(&mut app, caster);
    app.update();
    let accepted_at = now(&app);

    run_for(&mut app, 2.0);

    let casts = &captured::<SpellCastEvent>(&app).0;
    assert_eq!(casts.len(), 1);
    let fired_after = casts[0].0 - accepted_at;
    assert!(fired_after >= 0.49, "never before the windup ends");
    assert!(fired_after < 1.0, "alignment releases well before the deadline, got {:.3}", fired_after);
    assert!(app.world().get::<ForcedFacing>(caster).is_none());
}

#[test]
fn test_aligned_caster_ignores_facing_gate() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, facing_bolt(5.0));
    spawn_actor(&mut app, "Red Dummy", RED, Vec3::new(10.0, 0.0, 0.0), 1000.0);
    request_decision(&mut app, caster);
    app.update();
    let accepted_at = now(&app);

    run_for(&mut app, 1.0);

    let casts = &captured::<SpellCastEvent>(&app).0;
    assert_eq!(casts.len(), 1);
    assert!(casts[0].0 - accepted_at < 0.55);
    assert!(app.world().get::<ForcedFacing>(caster).is_none());
}
