//! Combat logging
//!
//! Records every health change, spell cast, summon and death for post-match
//! analysis. Entries carry a human-readable message plus structured data so
//! totals can be computed without parsing text.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display identifier of a combatant (its `Name`, or its entity id)
pub type CombatantId = String;

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatLogEntry {
    /// Timestamp in match time (seconds since match start)
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
    /// Machine-readable payload, absent for free-form entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StructuredEventData>,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatLogEventType {
    /// Damage dealt
    Damage,
    /// Healing done
    Healing,
    /// Spell released
    SpellCast,
    /// Summon requested
    Summon,
    /// Combatant died
    Death,
    /// Match event (start, end, etc.)
    MatchEvent,
}

/// Structured payload attached to log entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructuredEventData {
    HealthChange {
        source: CombatantId,
        target: CombatantId,
        spell: String,
        /// Magnitude of the change (always non-negative)
        amount: f32,
        periodic: bool,
        is_killing_blow: bool,
    },
    SpellCast {
        caster: CombatantId,
        spell: String,
        target: Option<CombatantId>,
    },
    Summon {
        summoner: CombatantId,
        prefab: String,
        count: u32,
    },
    Death {
        combatant: CombatantId,
        killer: Option<CombatantId>,
    },
}

/// Final state of one combatant, written alongside the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantMetadata {
    pub name: CombatantId,
    pub faction: u8,
    pub spell: String,
    pub max_health: f32,
    pub final_health: f32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub final_position: (f32, f32, f32),
}

/// Match-level information saved with the combat log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub scenario_name: String,
    /// Winning faction, `None` for a draw
    pub winner: Option<u8>,
    pub duration: f32,
    pub random_seed: Option<u64>,
    pub combatants: Vec<CombatantMetadata>,
}

#[derive(Serialize)]
struct CombatLogReport<'a> {
    metadata: &'a MatchMetadata,
    entries: &'a [CombatLogEntry],
}

/// The combat log resource storing all events
#[derive(Resource, Default, Debug, Clone)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current match time
    pub match_time: f32,
    /// Combatants that took part, in registration order
    combatants: Vec<CombatantId>,
}

impl CombatLog {
    /// Clear the log for a new match
    pub fn clear(&mut self) {
        self.entries.clear();
        self.combatants.clear();
        self.match_time = 0.0;
    }

    /// Add a new free-form entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.push(event_type, message, None);
    }

    fn push(&mut self, event_type: CombatLogEventType, message: String, data: Option<StructuredEventData>) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            data,
        });
    }

    /// Register a combatant so it shows up in reports even if it never acts
    pub fn register_combatant(&mut self, id: CombatantId) {
        if !self.combatants.contains(&id) {
            self.combatants.push(id);
        }
    }

    pub fn all_combatants(&self) -> &[CombatantId] {
        &self.combatants
    }

    // ========================================================================
    // Structured logging
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn log_damage(
        &mut self,
        source: CombatantId,
        target: CombatantId,
        spell: String,
        amount: f32,
        periodic: bool,
        is_killing_blow: bool,
        message: String,
    ) {
        let data = StructuredEventData::HealthChange {
            source,
            target,
            spell,
            amount,
            periodic,
            is_killing_blow,
        };
        self.push(CombatLogEventType::Damage, message, Some(data));
    }

    pub fn log_healing(
        &mut self,
        source: CombatantId,
        target: CombatantId,
        spell: String,
        amount: f32,
        periodic: bool,
        message: String,
    ) {
        let data = StructuredEventData::HealthChange {
            source,
            target,
            spell,
            amount,
            periodic,
            is_killing_blow: false,
        };
        self.push(CombatLogEventType::Healing, message, Some(data));
    }

    pub fn log_spell_cast(&mut self, caster: CombatantId, spell: String, target: Option<CombatantId>, message: String) {
        let data = StructuredEventData::SpellCast { caster, spell, target };
        self.push(CombatLogEventType::SpellCast, message, Some(data));
    }

    pub fn log_summon(&mut self, summoner: CombatantId, prefab: String, count: u32, message: String) {
        let data = StructuredEventData::Summon {
            summoner,
            prefab,
            count,
        };
        self.push(CombatLogEventType::Summon, message, Some(data));
    }

    pub fn log_death(&mut self, combatant: CombatantId, killer: Option<CombatantId>, message: String) {
        let data = StructuredEventData::Death { combatant, killer };
        self.push(CombatLogEventType::Death, message, Some(data));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get only HP-changing events (damage and healing)
    pub fn hp_changes_only(&self) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CombatLogEventType::Damage | CombatLogEventType::Healing
                )
            })
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Health changes of one type as (source, target, spell, amount, killing blow)
    fn health_changes(&self, event_type: CombatLogEventType) -> impl Iterator<Item = (&str, &str, &str, f32, bool)> {
        self.entries
            .iter()
            .filter(move |e| e.event_type == event_type)
            .filter_map(|e| match &e.data {
                Some(StructuredEventData::HealthChange {
                    source,
                    target,
                    spell,
                    amount,
                    is_killing_blow,
                    ..
                }) => Some((
                    source.as_str(),
                    target.as_str(),
                    spell.as_str(),
                    *amount,
                    *is_killing_blow,
                )),
                _ => None,
            })
    }

    /// Damage dealt by `source`, summed per spell
    pub fn damage_by_spell(&self, source: &str) -> HashMap<String, f32> {
        let mut totals = HashMap::new();
        for (from, _, spell, amount, _) in self.health_changes(CombatLogEventType::Damage) {
            if from == source {
                *totals.entry(spell.to_string()).or_insert(0.0) += amount;
            }
        }
        totals
    }

    /// Healing done by `source`, summed per spell
    pub fn healing_by_spell(&self, source: &str) -> HashMap<String, f32> {
        let mut totals = HashMap::new();
        for (from, _, spell, amount, _) in self.health_changes(CombatLogEventType::Healing) {
            if from == source {
                *totals.entry(spell.to_string()).or_insert(0.0) += amount;
            }
        }
        totals
    }

    pub fn total_damage_dealt(&self, source: &str) -> f32 {
        self.health_changes(CombatLogEventType::Damage)
            .filter(|(from, ..)| *from == source)
            .map(|(_, _, _, amount, _)| amount)
            .sum()
    }

    pub fn total_damage_taken(&self, target: &str) -> f32 {
        self.health_changes(CombatLogEventType::Damage)
            .filter(|(_, to, ..)| *to == target)
            .map(|(_, _, _, amount, _)| amount)
            .sum()
    }

    pub fn total_healing_done(&self, source: &str) -> f32 {
        self.health_changes(CombatLogEventType::Healing)
            .filter(|(from, ..)| *from == source)
            .map(|(_, _, _, amount, _)| amount)
            .sum()
    }

    /// Number of killing blows landed by `source`
    pub fn killing_blows(&self, source: &str) -> usize {
        self.health_changes(CombatLogEventType::Damage)
            .filter(|(from, _, _, _, killing_blow)| *from == source && *killing_blow)
            .count()
    }

    /// Whether `combatant` has no death recorded
    pub fn combatant_survived(&self, combatant: &str) -> bool {
        !self.entries.iter().any(|e| {
            matches!(
                &e.data,
                Some(StructuredEventData::Death { combatant: dead, .. }) if dead == combatant
            )
        })
    }

    /// Spells released by `caster` as (timestamp, spell name)
    pub fn spell_casts_for(&self, caster: &str) -> Vec<(f32, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.data {
                Some(StructuredEventData::SpellCast { caster: who, spell, .. }) if who == caster => {
                    Some((e.timestamp, spell.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save the log and match metadata as pretty-printed JSON.
    ///
    /// Without an explicit path the file goes to `match_logs/` with a
    /// timestamped name. Returns the path written.
    pub fn save_to_file(&self, metadata: &MatchMetadata, path: Option<&str>) -> Result<String, String> {
        let filename = match path {
            Some(path) => path.to_string(),
            None => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                std::fs::create_dir_all("match_logs")
                    .map_err(|e| format!("Failed to create match_logs directory: {}", e))?;
                format!("match_logs/match_{}.json", stamp)
            }
        };

        let report = CombatLogReport {
            metadata,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize combat log: {}", e))?;
        std::fs::write(&filename, json).map_err(|e| format!("Failed to write {}: {}", filename, e))?;

        Ok(filename)
    }
}
