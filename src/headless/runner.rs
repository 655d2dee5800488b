//! Headless match execution
//!
//! Runs spell skirmishes without any graphical output, suitable for automated
//! testing. The runner supplies the collaborators the spell core leaves to its
//! host: a decision requester, locomotion that honours movement locks and
//! forced facing, a summon spawner, a death sweeper and a visual-effect
//! bookkeeper.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::combat::log::{CombatLog, CombatantMetadata, MatchMetadata};
use crate::combat::{log_match_event, record_combat_events, CombatPlugin};
use crate::spells::components::{
    ActiveAreaVfx, ActiveTargetVfx, Faction, ForcedFacing, Health, Hurtbox, MovementLock, SpellCooldown,
    SpellDecisionRequest, SpellStats, SpellWindup,
};
use crate::spells::constants::DEFAULT_FORWARD;
use crate::spells::events::{SummonRequest, VfxCommand};
use crate::spells::registry::EffectRegistry;
use crate::spells::spell_config::{load_spell_definitions, SpellConfig, SpellDefinitions, SPELLS_CONFIG_PATH};
use crate::spells::systems::SpellSystemPhase;
use crate::spells::utils::{flatten, signed_horizontal_angle_deg};
use crate::spells::SpellsPlugin;

use super::config::{resolve_spell, yaw_toward, ActorSpec, HeadlessScenarioConfig};
use super::rng::GameRng;

/// Simulation ticks per second
pub const HEADLESS_TICK_RATE: f64 = 60.0;

/// Walking speed of headless actors (units/sec)
pub const MOVE_SPEED: f32 = 4.0;

/// Turning speed of headless actors (degrees/sec)
pub const TURN_RATE_DEG: f32 = 540.0;

/// Fraction of spell range actors close to before they stop walking
pub const ENGAGE_RANGE_FRACTION: f32 = 0.8;

/// Engage distance for actors without a spell
pub const MELEE_ENGAGE_RANGE: f32 = 1.5;

/// Distance from the summon point at which summoned actors appear
pub const SUMMON_RING_RADIUS: f32 = 1.5;

/// Extra frames allowed past the time limit before the runner gives up
const SETTLE_FRAMES: u64 = 120;

// ============================================================================
// Results
// ============================================================================

/// Result of a completed headless match
///
/// This struct provides programmatic access to match results for testing and analysis.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The winning faction, or None for a draw
    pub winner: Option<u8>,
    /// Total match duration in seconds
    pub match_time: f32,
    /// Every actor that took part, summons included, in spawn order
    pub combatants: Vec<CombatantResult>,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
    /// Visual-effect bindings still open when the match ended
    pub open_vfx_bindings: usize,
    /// Where the combat log was written, if it was saved
    pub log_path: Option<String>,
}

impl MatchResult {
    pub fn combatant(&self, name: &str) -> Option<&CombatantResult> {
        self.combatants.iter().find(|c| c.name == name)
    }
}

/// Statistics for a single combatant after the match
#[derive(Debug, Clone)]
pub struct CombatantResult {
    pub name: String,
    pub faction: u8,
    /// Spell name, empty for actors that never cast
    pub spell: String,
    pub summoned: bool,
    pub max_health: f32,
    /// Health remaining at match end (0 if dead)
    pub final_health: f32,
    pub survived: bool,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub final_position: Vec3,
}

impl From<&CombatantResult> for CombatantMetadata {
    fn from(result: &CombatantResult) -> Self {
        CombatantMetadata {
            name: result.name.clone(),
            faction: result.faction,
            spell: result.spell.clone(),
            max_health: result.max_health,
            final_health: result.final_health,
            damage_dealt: result.damage_dealt,
            damage_taken: result.damage_taken,
            healing_done: result.healing_done,
            final_position: (
                result.final_position.x,
                result.final_position.y,
                result.final_position.z,
            ),
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Resource to track headless match state
#[derive(Resource)]
pub struct HeadlessMatchState {
    pub scenario_name: String,
    /// Maximum match duration before declaring a draw
    pub max_duration: f32,
    /// Elapsed match time
    pub elapsed_time: f32,
    /// Custom output path for match log
    pub output_path: Option<String>,
    /// Whether the match has completed
    pub match_complete: bool,
    /// Random seed for deterministic simulation (if provided)
    pub random_seed: Option<u64>,
    /// Match result (populated when match completes)
    pub result: Option<MatchResult>,
}

/// Template for actors created by a summon spell
#[derive(Debug, Clone)]
pub struct SummonTemplate {
    pub health: f32,
    pub hurtbox_radius: f32,
    pub spell: Option<SpellConfig>,
}

/// A scenario resolved against the spell definitions
#[derive(Resource, Debug, Clone)]
pub struct HeadlessScenario {
    pub actors: Vec<ActorSpec>,
    pub summons: HashMap<String, SummonTemplate>,
    pub spawn_jitter: f32,
}

impl HeadlessScenario {
    pub fn resolve(config: &HeadlessScenarioConfig, definitions: &SpellDefinitions) -> Result<Self, String> {
        let actors = config.to_actor_specs(definitions)?;

        // Every prefab a loaded spell can summon gets a template
        let mut prefab_names: HashSet<String> = config.prefabs.keys().cloned().collect();
        prefab_names.extend(definitions.iter().filter_map(|spell| spell.summon.prefab.clone()));

        let mut summons = HashMap::new();
        for name in prefab_names.into_iter().filter(|name| !name.is_empty()) {
            let prefab = config.prefab(&name);
            let spell = resolve_spell(definitions, prefab.spell.as_deref())
                .map_err(|e| format!("prefab '{}': {}", name, e))?;
            summons.insert(
                name,
                SummonTemplate {
                    health: prefab.health,
                    hurtbox_radius: prefab.hurtbox_radius,
                    spell,
                },
            );
        }

        Ok(Self {
            actors,
            summons,
            spawn_jitter: config.spawn_jitter,
        })
    }
}

/// One participant, remembered after it is despawned
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub entity: Entity,
    pub name: String,
    pub faction: u8,
    pub spell: String,
    pub summoned: bool,
    pub max_health: f32,
    pub last_position: Vec3,
    pub despawned: bool,
}

/// Everyone who took part in the match, in spawn order
#[derive(Resource, Debug, Default)]
pub struct HeadlessRoster {
    pub entries: Vec<RosterEntry>,
}

impl HeadlessRoster {
    fn mark_despawned(&mut self, entity: Entity, position: Vec3) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.entity == entity) {
            entry.last_position = position;
            entry.despawned = true;
        }
    }
}

/// Visual-effect bindings begun and not yet ended
#[derive(Resource, Debug, Default)]
pub struct HeadlessVfxTracker {
    pub active: HashSet<u64>,
    pub begun: u32,
    pub ended: u32,
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin for headless match execution
pub struct HeadlessPlugin {
    pub config: HeadlessScenarioConfig,
    pub scenario: HeadlessScenario,
    pub definitions: SpellDefinitions,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(EffectRegistry::from_definitions(&self.definitions))
            .insert_resource(self.definitions.clone())
            .insert_resource(self.scenario.clone())
            .insert_resource(GameRng::from_optional_seed(self.config.random_seed))
            .insert_resource(HeadlessMatchState {
                scenario_name: self.config.name.clone(),
                max_duration: self.config.max_duration_secs,
                elapsed_time: 0.0,
                output_path: self.config.output_path.clone(),
                match_complete: false,
                random_seed: self.config.random_seed,
                result: None,
            })
            .init_resource::<HeadlessRoster>()
            .init_resource::<HeadlessVfxTracker>()
            .init_resource::<CombatLog>();

        app.add_systems(Startup, headless_setup_match)
            .add_systems(
                Update,
                headless_request_decisions
                    .before(SpellSystemPhase::Planning)
                    .run_if(match_in_progress),
            )
            .add_systems(
                Update,
                (headless_spawn_summons, headless_drive_actors)
                    .chain()
                    .after(SpellSystemPhase::MovementLock)
                    .run_if(match_in_progress),
            )
            .add_systems(
                Update,
                (
                    headless_despawn_dead,
                    headless_track_vfx,
                    headless_track_time,
                    headless_check_match_end,
                )
                    .chain()
                    .after(SpellSystemPhase::MovementLock)
                    .after(record_combat_events)
                    .run_if(match_in_progress),
            );
    }
}

fn match_in_progress(headless_state: Res<HeadlessMatchState>) -> bool {
    !headless_state.match_complete
}

// ============================================================================
// Setup
// ============================================================================

/// Spawn one actor with its health, collider and (optionally) spell
pub fn spawn_actor(commands: &mut Commands, spec: &ActorSpec) -> Entity {
    let mut actor = commands.spawn((
        Name::new(spec.name.clone()),
        spec.transform,
        spec.faction,
        Health::new(spec.health),
        Hurtbox::for_faction(spec.faction, spec.hurtbox_radius),
        SpellStats::default(),
    ));
    if let Some(spell) = &spec.spell {
        actor.insert(spell.clone());
    }
    actor.id()
}

fn register(roster: &mut HeadlessRoster, combat_log: &mut CombatLog, entity: Entity, spec: &ActorSpec, summoned: bool) {
    combat_log.register_combatant(spec.name.clone());
    roster.entries.push(RosterEntry {
        entity,
        name: spec.name.clone(),
        faction: spec.faction.0,
        spell: spec.spell.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
        summoned,
        max_health: spec.health,
        last_position: spec.transform.translation,
        despawned: false,
    });
}

/// Setup system for headless match
fn headless_setup_match(
    mut commands: Commands,
    scenario: Res<HeadlessScenario>,
    headless_state: Res<HeadlessMatchState>,
    mut rng: ResMut<GameRng>,
    mut roster: ResMut<HeadlessRoster>,
    mut combat_log: ResMut<CombatLog>,
) {
    combat_log.clear();
    log_match_event(
        &mut combat_log,
        format!("Match started (headless mode): {}", headless_state.scenario_name),
    );

    for spec in &scenario.actors {
        let mut spec = spec.clone();
        spec.transform.translation += rng.planar_offset(scenario.spawn_jitter);
        let entity = spawn_actor(&mut commands, &spec);
        register(&mut roster, &mut combat_log, entity, &spec, false);
    }

    let factions: HashSet<u8> = scenario.actors.iter().map(|a| a.faction.0).collect();
    info!(
        "Headless match setup complete: {} actors across {} factions",
        scenario.actors.len(),
        factions.len()
    );
}

// ============================================================================
// Host Collaborators
// ============================================================================

/// Ask every idle, ready caster for a new cast decision each tick
fn headless_request_decisions(
    time: Res<Time>,
    mut casters: Query<(&mut SpellDecisionRequest, &SpellWindup, &SpellCooldown, &Health)>,
) {
    let now = time.elapsed_secs();
    for (mut decision, windup, cooldown, health) in casters.iter_mut() {
        if health.is_alive() && !windup.active && cooldown.is_ready(now) {
            decision.pending = true;
        }
    }
}

/// Turn `transform` toward `point` by at most `max_step_deg`.
/// Returns true once facing it.
pub fn turn_toward(transform: &mut Transform, point: Vec3, max_step_deg: f32) -> bool {
    let forward = transform.rotation * DEFAULT_FORWARD;
    let Some(angle) = signed_horizontal_angle_deg(forward, point - transform.translation) else {
        return true;
    };
    let step = angle.clamp(-max_step_deg, max_step_deg);
    transform.rotation = Quat::from_rotation_y(step.to_radians()) * transform.rotation;
    step == angle
}

/// Minimal locomotion: honour forced facing, stay put while movement is
/// locked, otherwise walk toward the closest enemy until in range.
fn headless_drive_actors(
    time: Res<Time>,
    mut actors: Query<(
        Entity,
        &mut Transform,
        &Faction,
        &Health,
        Option<&SpellConfig>,
        Option<&SpellStats>,
        Option<&MovementLock>,
        Option<&ForcedFacing>,
    )>,
) {
    let dt = time.delta_secs();
    let snapshot: Vec<(Entity, Vec3, Faction)> = actors
        .iter()
        .filter(|(.., health, _, _, _, _)| health.is_alive())
        .map(|(entity, transform, faction, ..)| (entity, transform.translation, *faction))
        .collect();

    for (entity, mut transform, faction, health, spell, stats, lock, facing) in actors.iter_mut() {
        if !health.is_alive() {
            continue;
        }

        if let Some(facing) = facing {
            turn_toward(&mut transform, facing.point, TURN_RATE_DEG * dt);
            continue;
        }

        let position = transform.translation;
        let hostile = faction.hostile_mask();
        let closest = snapshot
            .iter()
            .filter(|(other, _, other_faction)| *other != entity && hostile.contains(*other_faction))
            .map(|(_, other_position, _)| *other_position)
            .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)));
        let Some(enemy) = closest else {
            continue;
        };

        turn_toward(&mut transform, enemy, TURN_RATE_DEG * dt);

        if lock.is_some_and(MovementLock::is_locked) {
            continue;
        }

        let engage = match spell {
            Some(spell) => {
                let multiplier = stats.map_or(1.0, |s| s.range_multiplier);
                spell.range * multiplier * ENGAGE_RANGE_FRACTION
            }
            None => MELEE_ENGAGE_RANGE,
        };
        let to_enemy = flatten(enemy - position);
        let distance = to_enemy.length();
        if distance > engage {
            let step = (MOVE_SPEED * dt).min(distance - engage);
            transform.translation += to_enemy / distance * step;
        }
    }
}

/// Spawn summoned actors around the requested point
#[allow(clippy::too_many_arguments)]
fn headless_spawn_summons(
    mut commands: Commands,
    mut summon_requests: EventReader<SummonRequest>,
    registry: Res<EffectRegistry>,
    scenario: Res<HeadlessScenario>,
    names: Query<&Name>,
    mut rng: ResMut<GameRng>,
    mut roster: ResMut<HeadlessRoster>,
    mut combat_log: ResMut<CombatLog>,
) {
    for request in summon_requests.read() {
        let Some(prefab) = registry.prefab_name(request.prefab) else {
            warn!("Summon request for unregistered prefab {:?}", request.prefab);
            continue;
        };
        let Some(template) = scenario.summons.get(prefab) else {
            warn!("No summon template for prefab '{}'", prefab);
            continue;
        };

        let summoner = names
            .get(request.summoner)
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|_| format!("{}", request.summoner));

        let count = request.count.max(1);
        let start_angle = rng.random_range(0.0, std::f32::consts::TAU);
        for i in 0..count {
            let angle = start_angle + std::f32::consts::TAU * i as f32 / count as f32;
            let position = request.position + Vec3::new(angle.cos(), 0.0, angle.sin()) * SUMMON_RING_RADIUS;
            let spec = ActorSpec {
                name: format!("{}'s {} #{}", summoner, prefab, roster.entries.len() + 1),
                faction: request.faction,
                transform: Transform::from_translation(position)
                    .with_rotation(yaw_toward(request.position, position)),
                health: template.health,
                hurtbox_radius: template.hurtbox_radius,
                spell: template.spell.clone(),
            };
            let entity = spawn_actor(&mut commands, &spec);
            register(&mut roster, &mut combat_log, entity, &spec, true);
            debug!("Spawned summon {}", spec.name);
        }
    }
}

/// Remove dead actors. Their persistent visuals are ended first since the
/// spell records that own them go with the entity.
fn headless_despawn_dead(
    mut commands: Commands,
    actors: Query<(
        Entity,
        &Health,
        &Transform,
        Option<&Name>,
        Option<&ActiveTargetVfx>,
        Option<&ActiveAreaVfx>,
    )>,
    mut roster: ResMut<HeadlessRoster>,
    mut vfx_commands: EventWriter<VfxCommand>,
) {
    for (entity, health, transform, name, target_vfx, area_vfx) in actors.iter() {
        if health.is_alive() {
            continue;
        }
        if let Some(binding) = target_vfx {
            vfx_commands.send(VfxCommand::End { key: binding.key });
        }
        if let Some(binding) = area_vfx {
            vfx_commands.send(VfxCommand::End { key: binding.key });
        }
        roster.mark_despawned(entity, transform.translation);
        commands.entity(entity).despawn();
        info!("{} removed from the match", name.map_or("actor", |n| n.as_str()));
    }
}

/// Keep a ledger of open visual-effect bindings
fn headless_track_vfx(mut vfx_commands: EventReader<VfxCommand>, mut tracker: ResMut<HeadlessVfxTracker>) {
    for command in vfx_commands.read() {
        match command {
            VfxCommand::Begin { key, .. } => {
                tracker.active.insert(*key);
                tracker.begun += 1;
            }
            VfxCommand::Move { key, .. } => {
                if !tracker.active.contains(key) {
                    warn!("Visual effect moved before it began (key {:#x})", key);
                }
            }
            VfxCommand::End { key } => {
                if tracker.active.remove(key) {
                    tracker.ended += 1;
                }
            }
        }
    }
}

// ============================================================================
// Match Flow
// ============================================================================

/// Track elapsed match time (used for timeout detection)
fn headless_track_time(time: Res<Time>, mut headless_state: ResMut<HeadlessMatchState>) {
    headless_state.elapsed_time += time.delta_secs();
}

/// Check if the match has ended (one faction left standing, or timeout)
fn headless_check_match_end(
    actors: Query<(&Faction, &Health)>,
    positions: Query<(&Health, &Transform)>,
    roster: Res<HeadlessRoster>,
    vfx_tracker: Res<HeadlessVfxTracker>,
    mut combat_log: ResMut<CombatLog>,
    mut headless_state: ResMut<HeadlessMatchState>,
) {
    let alive: HashSet<u8> = actors
        .iter()
        .filter(|(_, health)| health.is_alive())
        .map(|(faction, _)| faction.0)
        .collect();

    let winner = match alive.len() {
        0 => {
            info!("Match ended in a DRAW (every faction eliminated)!");
            None
        }
        1 => {
            let faction = alive.iter().copied().next();
            if let Some(faction) = faction {
                info!("Match ended! Faction {} wins!", faction);
            }
            faction
        }
        _ if headless_state.elapsed_time >= headless_state.max_duration => {
            info!(
                "Match timed out after {:.1}s - declaring DRAW",
                headless_state.elapsed_time
            );
            None
        }
        _ => return,
    };

    let message = match winner {
        Some(faction) => format!("Match ended: faction {} wins", faction),
        None => "Match ended in a draw".to_string(),
    };
    log_match_event(&mut combat_log, message);

    let mut result = build_match_result(&positions, &roster, &combat_log, winner, &headless_state);
    result.open_vfx_bindings = vfx_tracker.active.len();
    result.log_path = save_headless_match_log(&combat_log, &result, &headless_state);

    headless_state.result = Some(result);
    headless_state.match_complete = true;
}

/// Build the MatchResult from the roster and the combat log
fn build_match_result(
    positions: &Query<(&Health, &Transform)>,
    roster: &HeadlessRoster,
    combat_log: &CombatLog,
    winner: Option<u8>,
    headless_state: &HeadlessMatchState,
) -> MatchResult {
    let combatants = roster
        .entries
        .iter()
        .map(|entry| {
            let (final_health, final_position) = match positions.get(entry.entity) {
                Ok((health, transform)) if !entry.despawned => (health.current.max(0.0), transform.translation),
                _ => (0.0, entry.last_position),
            };
            CombatantResult {
                name: entry.name.clone(),
                faction: entry.faction,
                spell: entry.spell.clone(),
                summoned: entry.summoned,
                max_health: entry.max_health,
                final_health,
                survived: final_health > 0.0,
                damage_dealt: combat_log.total_damage_dealt(&entry.name),
                damage_taken: combat_log.total_damage_taken(&entry.name),
                healing_done: combat_log.total_healing_done(&entry.name),
                final_position,
            }
        })
        .collect();

    MatchResult {
        winner,
        match_time: headless_state.elapsed_time,
        combatants,
        random_seed: headless_state.random_seed,
        open_vfx_bindings: 0,
        log_path: None,
    }
}

/// Save the combat log to a file, returning where it went
fn save_headless_match_log(
    combat_log: &CombatLog,
    result: &MatchResult,
    headless_state: &HeadlessMatchState,
) -> Option<String> {
    let match_metadata = MatchMetadata {
        scenario_name: headless_state.scenario_name.clone(),
        winner: result.winner,
        duration: result.match_time,
        random_seed: result.random_seed,
        combatants: result.combatants.iter().map(CombatantMetadata::from).collect(),
    };

    match combat_log.save_to_file(&match_metadata, headless_state.output_path.as_deref()) {
        Ok(filename) => {
            info!("Match complete. Log saved to: {}", filename);
            Some(filename)
        }
        Err(e) => {
            error!("Failed to save combat log: {}", e);
            None
        }
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Build the headless app for a scenario without running it
pub fn build_headless_app(config: HeadlessScenarioConfig) -> Result<App, String> {
    config.validate()?;

    let spells_path = config.spells_path.as_deref().unwrap_or(SPELLS_CONFIG_PATH);
    let definitions = load_spell_definitions(spells_path)?;
    let scenario = HeadlessScenario::resolve(&config, &definitions)?;

    let mut app = App::new();
    app
        // Minimal plugins - no window, no rendering
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(TransformPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / HEADLESS_TICK_RATE,
        )))
        .add_plugins((SpellsPlugin, CombatPlugin))
        .add_plugins(HeadlessPlugin {
            config,
            scenario,
            definitions,
        });

    Ok(app)
}

/// Run a headless match with the given configuration
pub fn run_headless_match(config: HeadlessScenarioConfig) -> Result<MatchResult, String> {
    info!(
        "Starting headless match '{}': {} actors, max duration {:.0}s",
        config.name,
        config.actors.len(),
        config.max_duration_secs
    );

    let max_frames = (config.max_duration_secs as f64 * HEADLESS_TICK_RATE).ceil() as u64 + SETTLE_FRAMES;
    let mut app = build_headless_app(config)?;
    app.finish();
    app.cleanup();

    for _ in 0..max_frames {
        app.update();
        if app.world().resource::<HeadlessMatchState>().match_complete {
            break;
        }
    }

    app.world_mut()
        .resource_mut::<HeadlessMatchState>()
        .result
        .take()
        .ok_or_else(|| "Match did not finish within its time limit".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_toward_is_rate_limited() {
        let mut transform = Transform::default();
        // Facing -Z; target on +X is 90 degrees away
        let done = turn_toward(&mut transform, Vec3::new(5.0, 0.0, 0.0), 30.0);
        assert!(!done);
        let forward = transform.rotation * DEFAULT_FORWARD;
        let remaining = signed_horizontal_angle_deg(forward, Vec3::X).unwrap();
        assert!((remaining.abs() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_turn_toward_finishes_within_step() {
        let mut transform = Transform::default();
        assert!(turn_toward(&mut transform, Vec3::new(5.0, 0.0, 0.0), 180.0));
        let forward = transform.rotation * DEFAULT_FORWARD;
        assert!((forward - Vec3::X).length() < 1e-4);
    }
}
