//! JSON configuration parsing for headless mode
//!
//! Parses JSON scenario files and resolves them against the loaded spell
//! definitions into actors ready to spawn.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::spells::components::Faction;
use crate::spells::constants::DEFAULT_HURTBOX_RADIUS;
use crate::spells::spell_config::{SpellConfig, SpellDefinitions};

/// One actor placed by the scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    pub name: String,
    /// Faction id (0..32)
    pub faction: u8,
    /// World position [x, y, z]
    pub position: [f32; 3],
    #[serde(default = "default_health")]
    pub health: f32,
    #[serde(default = "default_hurtbox_radius")]
    pub hurtbox_radius: f32,
    /// Spell definition name; actors without one never cast
    #[serde(default)]
    pub spell: Option<String>,
    /// Initial facing in degrees around the up axis (0 = facing -Z).
    /// Defaults to facing the origin.
    #[serde(default)]
    pub yaw_deg: Option<f32>,
}

/// Template for actors created by summon spells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabConfig {
    #[serde(default = "default_summon_health")]
    pub health: f32,
    #[serde(default = "default_hurtbox_radius")]
    pub hurtbox_radius: f32,
    #[serde(default)]
    pub spell: Option<String>,
}

impl Default for PrefabConfig {
    fn default() -> Self {
        Self {
            health: default_summon_health(),
            hurtbox_radius: default_hurtbox_radius(),
            spell: None,
        }
    }
}

/// Headless scenario configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessScenarioConfig {
    /// Scenario name written into the match log
    #[serde(default = "default_name")]
    pub name: String,
    pub actors: Vec<ActorConfig>,
    /// Summon prefabs by name
    #[serde(default)]
    pub prefabs: BTreeMap<String, PrefabConfig>,
    /// Spell definitions file (default: assets/config/spells.ron)
    #[serde(default)]
    pub spells_path: Option<String>,
    /// Custom output path for match log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Maximum match duration in seconds (default: 120)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Random seed for deterministic match reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Maximum random offset applied to each spawn position on the XZ plane
    #[serde(default)]
    pub spawn_jitter: f32,
}

fn default_name() -> String {
    "Unnamed Scenario".to_string()
}

fn default_health() -> f32 {
    100.0
}

fn default_summon_health() -> f32 {
    30.0
}

fn default_hurtbox_radius() -> f32 {
    DEFAULT_HURTBOX_RADIUS
}

fn default_max_duration() -> f32 {
    120.0
}

/// An actor resolved against the spell definitions, ready to spawn
#[derive(Debug, Clone)]
pub struct ActorSpec {
    pub name: String,
    pub faction: Faction,
    pub transform: Transform,
    pub health: f32,
    pub hurtbox_radius: f32,
    pub spell: Option<SpellConfig>,
}

/// Facing toward `target` from `position`, as a yaw-only rotation
pub fn yaw_toward(position: Vec3, target: Vec3) -> Quat {
    let to = Vec3::new(target.x - position.x, 0.0, target.z - position.z);
    if to.length_squared() < 1e-6 {
        return Quat::IDENTITY;
    }
    // Forward is -Z: yaw = atan2(-x, -z)
    Quat::from_rotation_y((-to.x).atan2(-to.z))
}

impl HeadlessScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_json(&contents)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(contents: &str) -> Result<Self, String> {
        let config: HeadlessScenarioConfig = serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.actors.is_empty() {
            return Err("scenario must contain at least one actor".to_string());
        }

        let mut names = HashSet::new();
        for actor in &self.actors {
            if !names.insert(actor.name.as_str()) {
                return Err(format!("duplicate actor name '{}'", actor.name));
            }
            if actor.faction >= 32 {
                return Err(format!("{}: faction {} is out of range (0-31)", actor.name, actor.faction));
            }
            if actor.health <= 0.0 {
                return Err(format!("{}: health must be positive", actor.name));
            }
            if actor.hurtbox_radius < 0.0 {
                return Err(format!("{}: hurtbox_radius must be non-negative", actor.name));
            }
        }

        let factions: HashSet<u8> = self.actors.iter().map(|a| a.faction).collect();
        if factions.len() < 2 {
            return Err("scenario needs actors from at least two factions".to_string());
        }

        for (name, prefab) in &self.prefabs {
            if prefab.health <= 0.0 {
                return Err(format!("prefab '{}': health must be positive", name));
            }
        }

        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }
        if self.spawn_jitter < 0.0 {
            return Err("spawn_jitter must be non-negative".to_string());
        }

        Ok(())
    }

    /// Resolve every actor's spell against the loaded definitions
    pub fn to_actor_specs(&self, definitions: &SpellDefinitions) -> Result<Vec<ActorSpec>, String> {
        self.actors
            .iter()
            .map(|actor| {
                let spell = resolve_spell(definitions, actor.spell.as_deref())
                    .map_err(|e| format!("{}: {}", actor.name, e))?;

                let position = Vec3::from_array(actor.position);
                let rotation = match actor.yaw_deg {
                    Some(yaw) => Quat::from_rotation_y(yaw.to_radians()),
                    None => yaw_toward(position, Vec3::ZERO),
                };

                Ok(ActorSpec {
                    name: actor.name.clone(),
                    faction: Faction(actor.faction),
                    transform: Transform::from_translation(position).with_rotation(rotation),
                    health: actor.health,
                    hurtbox_radius: actor.hurtbox_radius,
                    spell,
                })
            })
            .collect()
    }

    /// Prefab template for a summon, falling back to defaults
    pub fn prefab(&self, name: &str) -> PrefabConfig {
        self.prefabs.get(name).cloned().unwrap_or_default()
    }
}

/// Look up an optional spell name in the definitions
pub fn resolve_spell(definitions: &SpellDefinitions, name: Option<&str>) -> Result<Option<SpellConfig>, String> {
    match name {
        None => Ok(None),
        Some(name) => definitions
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| format!("unknown spell '{}'", name)),
    }
}
