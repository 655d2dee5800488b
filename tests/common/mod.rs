//! Shared harness for spell integration tests
//!
//! Builds a minimal app with the spell and combat plugins, stepping time in
//! fixed increments, plus helpers to spawn actors and capture events.

#![allow(dead_code)]

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use spellcast::combat::CombatPlugin;
use spellcast::headless::config::yaw_toward;
use spellcast::spells::components::{Faction, Health, Hurtbox, SpellDecisionRequest, SpellStats};
use spellcast::spells::constants::DEFAULT_HURTBOX_RADIUS;
use spellcast::spells::{EffectRegistry, SpellConfig, SpellsPlugin};

pub const BLUE: Faction = Faction(1);
pub const RED: Faction = Faction(2);

/// Ticks per second used by `test_app`
pub const TEST_TICK_RATE: f64 = 60.0;

/// Events of one type seen so far, with the simulation time they were read at
#[derive(Resource)]
pub struct Captured<E: Event>(pub Vec<(f32, E)>);

impl<E: Event> Captured<E> {
    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.0.iter().map(|(_, event)| event)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn capture<E: Event + Clone>(time: Res<Time>, mut reader: EventReader<E>, mut captured: ResMut<Captured<E>>) {
    let now = time.elapsed_secs();
    captured.0.extend(reader.read().map(|event| (now, event.clone())));
}

/// Casters carrying this ask for a decision every tick
#[derive(Component)]
pub struct AlwaysRequest;

fn request_every_tick(mut casters: Query<&mut SpellDecisionRequest, With<AlwaysRequest>>) {
    for mut decision in casters.iter_mut() {
        decision.pending = true;
    }
}

/// App with the spell and combat plugins, stepped at `ticks_per_second`
pub fn test_app_with_rate(ticks_per_second: f64) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / ticks_per_second,
        )))
        .add_plugins((SpellsPlugin, CombatPlugin))
        .add_systems(PreUpdate, request_every_tick);
    // Slow rates step whole seconds; don't let the virtual clock clamp them
    app.world_mut()
        .resource_mut::<Time<Virtual>>()
        .set_max_delta(Duration::from_secs(10));

    // The first update only starts the clock
    app.update();
    app
}

pub fn test_app() -> App {
    test_app_with_rate(TEST_TICK_RATE)
}

/// Record every `E` sent from now on in `Captured<E>`
pub fn capture_events<E: Event + Clone>(app: &mut App) {
    app.insert_resource(Captured::<E>(Vec::new()))
        .add_systems(Last, capture::<E>);
}

pub fn captured<E: Event + Clone>(app: &App) -> &Captured<E> {
    app.world().resource::<Captured<E>>()
}

pub fn register_vfx(app: &mut App, name: &str) {
    app.world_mut().resource_mut::<EffectRegistry>().register_vfx(name);
}

pub fn register_prefab(app: &mut App, name: &str) {
    app.world_mut().resource_mut::<EffectRegistry>().register_prefab(name);
}

/// Step the app for roughly `seconds` of simulation time
pub fn run_for(app: &mut App, seconds: f32) {
    let ticks = (seconds as f64 * TEST_TICK_RATE).round() as usize;
    run_ticks(app, ticks);
}

pub fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}

pub fn now(app: &App) -> f32 {
    app.world().resource::<Time>().elapsed_secs()
}

/// Spawn a non-casting actor standing at `position`
pub fn spawn_actor(app: &mut App, name: &str, faction: Faction, position: Vec3, health: f32) -> Entity {
    app.world_mut()
        .spawn((
            Name::new(name.to_string()),
            Transform::from_translation(position),
            faction,
            Health::new(health),
            Hurtbox::for_faction(faction, DEFAULT_HURTBOX_RADIUS),
            SpellStats::default(),
        ))
        .id()
}

/// Spawn a caster at `position` facing `facing`
pub fn spawn_caster(
    app: &mut App,
    name: &str,
    faction: Faction,
    position: Vec3,
    facing: Vec3,
    spell: SpellConfig,
) -> Entity {
    let caster = spawn_actor(app, name, faction, position, 100.0);
    app.world_mut()
        .entity_mut(caster)
        .insert((spell, Transform::from_translation(position).with_rotation(yaw_toward(position, facing))));
    caster
}

/// Ask `caster` for one cast decision on the next tick
pub fn request_decision(app: &mut App, caster: Entity) {
    if let Some(mut decision) = app.world_mut().get_mut::<SpellDecisionRequest>(caster) {
        decision.pending = true;
    }
}

pub fn always_request(app: &mut App, caster: Entity) {
    app.world_mut().entity_mut(caster).insert(AlwaysRequest);
}

pub fn health_of(app: &App, entity: Entity) -> f32 {
    app.world().get::<Health>(entity).map_or(0.0, |h| h.current)
}
