//! Combat system
//!
//! Health changes caused by spells, and the combat log that records them:
//! - Applying signed spell amounts to health and announcing the result
//! - Turning damage, cast and summon events into combat log entries

use bevy::prelude::*;

pub mod events;
pub mod log;

use events::*;
use log::{CombatLog, CombatLogEventType};

use crate::spells::components::Health;
use crate::spells::events::{SpellCastEvent, SummonRequest};
use crate::spells::registry::EffectRegistry;
use crate::spells::systems::SpellSystemPhase;

/// Height above an actor's origin where floating numbers appear
pub const FLOATING_NUMBER_HEIGHT: f32 = 2.0;

/// Plugin for combat logging. Expects the spell plugin to be present.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DamageEvent>()
            .add_event::<FloatingNumberEvent>()
            .init_resource::<CombatLog>()
            .add_systems(
                Update,
                record_combat_events.after(SpellSystemPhase::StatusEffects),
            );
    }
}

/// One spell-driven health change, before it is applied.
#[derive(Debug, Clone, Copy)]
pub struct HealthChange<'a> {
    pub source: Entity,
    pub target: Entity,
    /// Signed: positive damages, negative heals
    pub amount: f32,
    pub direction: Vec3,
    /// Where the floating number should appear
    pub position: Vec3,
    pub spell_name: &'a str,
    pub delivery: DamageDelivery,
}

/// Apply a health change and announce it with a floating number and a
/// `DamageEvent`. Returns the signed amount actually applied; changes that
/// did nothing (dead target, full health, invulnerable) are not announced.
pub fn deliver_health_change(
    change: HealthChange,
    health: &mut Health,
    now: f32,
    damage_events: &mut EventWriter<DamageEvent>,
    floating_numbers: &mut EventWriter<FloatingNumberEvent>,
) -> f32 {
    let applied = health.apply_damage(change.amount, now, 0.0);
    if applied == 0.0 {
        return 0.0;
    }

    let periodic = change.delivery == DamageDelivery::Periodic;
    floating_numbers.send(FloatingNumberEvent {
        kind: FloatingNumberKind::for_change(applied, periodic),
        follow: Some(change.target),
        position: change.position,
        amount: applied.abs(),
    });
    damage_events.send(DamageEvent {
        source: change.source,
        target: change.target,
        amount: applied,
        direction: change.direction,
        spell_name: change.spell_name.to_string(),
        delivery: change.delivery,
        killing_blow: applied > 0.0 && !health.is_alive(),
    });
    applied
}

/// Display id for an entity: its `Name` if it has one
pub fn combatant_id(entity: Entity, names: &Query<&Name>) -> String {
    names
        .get(entity)
        .map(|name| name.as_str().to_string())
        .unwrap_or_else(|_| format!("{}", entity))
}

/// Record this tick's damage, cast and summon events in the combat log.
pub fn record_combat_events(
    time: Res<Time>,
    mut combat_log: ResMut<CombatLog>,
    registry: Option<Res<EffectRegistry>>,
    names: Query<&Name>,
    mut damage_events: EventReader<DamageEvent>,
    mut cast_events: EventReader<SpellCastEvent>,
    mut summon_requests: EventReader<SummonRequest>,
) {
    combat_log.match_time = time.elapsed_secs();

    for event in cast_events.read() {
        let caster = combatant_id(event.caster, &names);
        let target = event.target.map(|t| combatant_id(t, &names));
        let message = match &target {
            Some(target) => format!("{} casts {} on {}", caster, event.spell_name, target),
            None => format!("{} casts {}", caster, event.spell_name),
        };
        combat_log.log_spell_cast(caster, event.spell_name.clone(), target, message);
    }

    for event in damage_events.read() {
        let source = combatant_id(event.source, &names);
        let target = combatant_id(event.target, &names);
        let periodic = event.delivery == DamageDelivery::Periodic;
        let amount = event.amount.abs();

        if event.is_heal() {
            let message = format!("{}'s {} heals {} for {:.0}", source, event.spell_name, target, amount);
            combat_log.log_healing(source, target, event.spell_name.clone(), amount, periodic, message);
            continue;
        }

        let message = format!("{}'s {} hits {} for {:.0} damage", source, event.spell_name, target, amount);
        combat_log.log_damage(
            source.clone(),
            target.clone(),
            event.spell_name.clone(),
            amount,
            periodic,
            event.killing_blow,
            message,
        );

        if event.killing_blow {
            let message = format!("{} has been slain by {}", target, source);
            combat_log.log_death(target, Some(source), message);
        }
    }

    for request in summon_requests.read() {
        let summoner = combatant_id(request.summoner, &names);
        let prefab = registry
            .as_ref()
            .and_then(|r| r.prefab_name(request.prefab))
            .unwrap_or("unknown")
            .to_string();
        let message = format!("{} summons {} x{}", summoner, prefab, request.count);
        combat_log.log_summon(summoner, prefab, request.count, message);
    }
}

/// Log a match-level event (start, end) at the current match time
pub fn log_match_event(combat_log: &mut CombatLog, message: impl Into<String>) {
    combat_log.log(CombatLogEventType::MatchEvent, message.into());
}
