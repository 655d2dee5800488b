//! Integration tests for line projectiles
//!
//! These tests verify that:
//! - A non-piercing projectile applies once and despawns on impact
//! - A piercing projectile applies to every actor on its path, nearest first
//! - Projectiles never hit their own caster
//! - Positive spells heal instead of damaging

mod common;

use bevy::prelude::*;
use common::*;

use spellcast::combat::events::{DamageDelivery, DamageEvent};
use spellcast::spells::components::{Health, Projectile};
use spellcast::spells::events::SpellCastEvent;
use spellcast::spells::spell_config::{AcquireMode, EffectPolarity, ProjectileParams};
use spellcast::spells::{SpellConfig, SpellKind};

fn line_spell(speed: f32, pierce: bool) -> SpellConfig {
    SpellConfig {
        name: "Test Bolt".to_string(),
        kind: SpellKind::ProjectileLine,
        range: 20.0,
        cooldown: 10.0,
        amount: 10.0,
        muzzle_offset: [0.0, 1.0, 0.0],
        projectile: ProjectileParams {
            speed,
            radius: 0.0,
            max_distance: 30.0,
            pierce,
        },
        ..default()
    }
}

fn projectile_count(app: &mut App) -> usize {
    let mut projectiles = app.world_mut().query::<&Projectile>();
    projectiles.iter(app.world()).count()
}

#[test]
fn test_bolt_hits_once_and_despawns() {
    let mut app = test_app();
    capture_events::<SpellCastEvent>(&mut app);
    capture_events::<DamageEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, line_spell(20.0, false));
    let enemy = spawn_actor(&mut app, "Red Knight", RED, Vec3::new(5.0, 0.0, 0.0), 100.0);
    request_decision(&mut app, caster);

    app.update();
    assert_eq!(projectile_count(&mut app), 1, "the bolt is in flight");

    run_for(&mut app, 1.0);

    let hits = &captured::<DamageEvent>(&app).0;
    assert_eq!(hits.len(), 1);
    let (hit_time, hit) = &hits[0];
    assert_eq!(hit.target, enemy);
    assert_eq!(hit.source, caster);
    assert_eq!(hit.amount, 10.0);
    assert_eq!(hit.delivery, DamageDelivery::Direct);
    assert_eq!(health_of(&app, enemy), 90.0);

    // Surface of the enemy's hurtbox is 4.5 units out at 20 units/sec
    let cast_time = captured::<SpellCastEvent>(&app).0[0].0;
    let travel = hit_time - cast_time;
    assert!((0.2..0.26).contains(&travel), "hit after {:.3}s", travel);

    assert_eq!(projectile_count(&mut app), 0, "the bolt despawns on impact");
}

#[test]
fn test_default_muzzle_fires_at_hurtbox_height() {
    let mut app = test_app();
    capture_events::<DamageEvent>(&mut app);

    let spell = SpellConfig {
        name: "Plain Bolt".to_string(),
        kind: SpellKind::ProjectileLine,
        amount: 10.0,
        cooldown: 10.0,
        projectile: ProjectileParams {
            speed: 20.0,
            radius: 0.0,
            max_distance: 30.0,
            pierce: false,
        },
        ..default()
    };
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, spell);
    let enemy = spawn_actor(&mut app, "Red Knight", RED, Vec3::new(5.0, 0.0, 0.0), 100.0);
    request_decision(&mut app, caster);

    run_for(&mut app, 2.0);

    assert_eq!(captured::<DamageEvent>(&app).len(), 1);
    assert_eq!(health_of(&app, enemy), 90.0);
}

#[test]
fn test_piercing_bolt_hits_in_distance_order() {
    let mut app = test_app();
    capture_events::<DamageEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, line_spell(600.0, true));
    let near = spawn_actor(&mut app, "Red Knight", RED, Vec3::new(3.0, 0.0, 0.0), 100.0);
    let far = spawn_actor(&mut app, "Red Archer", RED, Vec3::new(6.0, 0.0, 0.0), 100.0);
    request_decision(&mut app, caster);

    app.update();

    let hits = &captured::<DamageEvent>(&app).0;
    assert_eq!(hits.len(), 2, "a 10 unit step reaches both");
    assert_eq!(hits[0].1.target, near);
    assert_eq!(hits[1].1.target, far);
    assert_eq!(hits[0].0, hits[1].0, "both land in the same tick");

    // Keeps flying; nothing is hit twice
    run_for(&mut app, 0.5);
    assert_eq!(captured::<DamageEvent>(&app).len(), 2);
    assert_eq!(health_of(&app, near), 90.0);
    assert_eq!(health_of(&app, far), 90.0);
}

#[test]
fn test_non_piercing_bolt_stops_at_first_actor() {
    let mut app = test_app();
    capture_events::<DamageEvent>(&mut app);

    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, line_spell(600.0, false));
    let near = spawn_actor(&mut app, "Red Knight", RED, Vec3::new(3.0, 0.0, 0.0), 100.0);
    let far = spawn_actor(&mut app, "Red Archer", RED, Vec3::new(6.0, 0.0, 0.0), 100.0);
    request_decision(&mut app, caster);

    run_for(&mut app, 0.5);

    assert_eq!(captured::<DamageEvent>(&app).len(), 1);
    assert_eq!(health_of(&app, near), 90.0);
    assert_eq!(health_of(&app, far), 100.0);
    assert_eq!(projectile_count(&mut app), 0);
}

#[test]
fn test_bolt_never_hits_its_caster() {
    let mut app = test_app();
    capture_events::<DamageEvent>(&mut app);

    // The muzzle sits at the centre of the caster's own hurtbox
    let mut spell = line_spell(20.0, true);
    spell.muzzle_offset = [0.0, 1.0, 0.0];
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, spell);
    let enemy = spawn_actor(&mut app, "Red Knight", RED, Vec3::new(8.0, 0.0, 0.0), 100.0);
    request_decision(&mut app, caster);

    run_for(&mut app, 1.0);

    assert_eq!(health_of(&app, caster), 100.0);
    assert!(captured::<DamageEvent>(&app).events().all(|e| e.target != caster));
    assert_eq!(health_of(&app, enemy), 90.0);
}

#[test]
fn test_positive_bolt_heals_an_ally() {
    let mut app = test_app();
    capture_events::<DamageEvent>(&mut app);

    let spell = SpellConfig {
        name: "Mending Bolt".to_string(),
        acquire: AcquireMode::LowestHealthAlly,
        effect: EffectPolarity::Positive,
        ..line_spell(30.0, false)
    };
    let caster = spawn_caster(&mut app, "Blue Priest", BLUE, Vec3::ZERO, Vec3::X, spell);
    let ally = spawn_actor(&mut app, "Blue Knight", BLUE, Vec3::new(5.0, 0.0, 0.0), 100.0);
    app.world_mut().get_mut::<Health>(ally).unwrap().current = 50.0;
    request_decision(&mut app, caster);

    run_for(&mut app, 1.0);

    assert_eq!(health_of(&app, ally), 60.0);
    let heal = captured::<DamageEvent>(&app).events().next().cloned().expect("a heal lands");
    assert!(heal.is_heal());
    assert_eq!(heal.amount, -10.0);
}

#[test]
fn test_bolt_expires_after_max_distance() {
    let mut app = test_app();
    let mut spell = line_spell(30.0, false);
    spell.projectile.max_distance = 3.0;
    let caster = spawn_caster(&mut app, "Blue Mage", BLUE, Vec3::ZERO, Vec3::X, spell);
    let enemy = spawn_actor(&mut app, "Red Knight", RED, Vec3::new(10.0, 0.0, 0.0), 100.0);
    request_decision(&mut app, caster);

    run_for(&mut app, 1.0);

    assert_eq!(health_of(&app, enemy), 100.0);
    assert_eq!(projectile_count(&mut app), 0);
}
