//! Planning Pass
//!
//! Turns a pending `SpellDecisionRequest` into a `CastRequest` by running the
//! caster's targeting strategy. The decision request is always consumed.

use bevy::prelude::*;

use super::components::{CastAim, CastRequest, Faction, SpellCooldown, SpellDecisionRequest, SpellStats, SpellWindup};
use super::spell_config::{SpellConfig, SpellKind};
use super::targeting::{select_area_point, select_single_target};
use super::world::{ActorData, ActorIndex, ActorSnapshot, SpatialSearch};

/// Resolve the aim a caster would cast with right now, if any.
pub fn plan_cast(
    caster: &ActorSnapshot,
    faction: Faction,
    config: &SpellConfig,
    stats: SpellStats,
    search: &impl SpatialSearch,
) -> Option<CastAim> {
    let range = config.range * stats.range_multiplier;
    match config.kind {
        SpellKind::ProjectileLine | SpellKind::Chain | SpellKind::EffectOverTimeTarget => {
            select_single_target(caster, faction, config, range, search).map(CastAim::SingleTarget)
        }
        SpellKind::EffectOverTimeArea => {
            let area_radius = config.area.radius * stats.area_multiplier;
            select_area_point(caster, faction, config, range, area_radius, search).map(CastAim::AreaOfEffect)
        }
        SpellKind::Summon => Some(CastAim::AreaOfEffect(caster.position)),
    }
}

/// Planning pass: answer every pending decision request.
///
/// Casters that are winding up or cooling down have their request dropped.
pub fn plan_spell_casts(
    time: Res<Time>,
    actors: Query<ActorData>,
    mut casters: Query<(
        Entity,
        &SpellConfig,
        &Faction,
        Option<&SpellStats>,
        &SpellWindup,
        &SpellCooldown,
        &mut SpellDecisionRequest,
        &mut CastRequest,
    )>,
) {
    if !casters.iter().any(|(.., decision, _)| decision.pending) {
        return;
    }

    let now = time.elapsed_secs();
    let index = ActorIndex::build(actors.iter());

    for (entity, config, faction, stats, windup, cooldown, mut decision, mut cast_request) in casters.iter_mut() {
        if !decision.pending {
            continue;
        }
        decision.pending = false;

        if windup.active || !cooldown.is_ready(now) {
            continue;
        }

        let Some(caster) = index.get(entity) else {
            continue;
        };
        if !caster.is_alive() {
            continue;
        }

        let stats = stats.copied().unwrap_or_default();
        cast_request.pending = plan_cast(caster, *faction, config, stats, &index);

        if let Some(aim) = cast_request.pending {
            debug!("{:?} plans {} at {:?}", entity, config.name, aim);
        }
    }
}
