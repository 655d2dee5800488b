//! Data-Driven Spell Configuration
//!
//! Spell definitions are loaded from RON config files instead of being
//! hardcoded. Each caster carries its own copy of a definition as a
//! [`SpellConfig`] component, which stays immutable for the whole cast cycle.
//!
//! ## Usage
//! ```ignore
//! fn my_system(spells: Res<SpellDefinitions>) {
//!     let firebolt = spells.get("Firebolt").unwrap();
//!     println!("Firebolt cast time: {}", firebolt.cast_time);
//! }
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::components::{CastRequest, MovementLock, SpellCooldown, SpellDecisionRequest, SpellWindup};
use super::constants::{HURTBOX_CENTER_HEIGHT, MIN_FACE_TOLERANCE_DEG, MIN_TICK_INTERVAL};
use super::registry::EffectRegistry;

/// Default location of the spell definitions file, relative to the crate root.
pub const SPELLS_CONFIG_PATH: &str = "assets/config/spells.ron";

/// The five categories of spell effect the resolver knows how to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellKind {
    /// Straight projectile from the caster's muzzle toward the aim point
    ProjectileLine,
    /// Damage/heal-over-time bound to a single target actor
    EffectOverTimeTarget,
    /// Damage/heal-over-time bound to a point on the ground
    EffectOverTimeArea,
    /// Projectile that hops greedily from target to target
    Chain,
    /// Asks an external spawner for a new actor at the aim point
    Summon,
}

/// How the planner picks a target for this spell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquireMode {
    #[default]
    ClosestEnemy,
    LowestHealthAlly,
    /// Area spells only; single-target spells treat this as `ClosestEnemy`.
    DensestEnemyCluster,
}

/// Whether the spell hurts (Negative) or helps (Positive) what it touches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectPolarity {
    #[default]
    Negative,
    Positive,
}

/// Projectile sub-parameters (ProjectileLine).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileParams {
    /// Travel speed in units/second
    pub speed: f32,
    /// Sweep radius: 0.0 = ray, > 0.0 = thick sweep
    pub radius: f32,
    /// Distance after which the projectile despawns
    pub max_distance: f32,
    /// Keep flying after the first hit
    pub pierce: bool,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            speed: 20.0,
            radius: 0.0,
            max_distance: 30.0,
            pierce: true,
        }
    }
}

/// Periodic effect timing shared by target and area effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverTimeParams {
    /// Seconds between ticks (floored to `MIN_TICK_INTERVAL`)
    pub tick_interval: f32,
    /// Total lifetime of the effect in seconds
    pub duration: f32,
    /// Visual effect name bound to the target while the effect is active
    pub vfx: Option<String>,
}

impl Default for OverTimeParams {
    fn default() -> Self {
        Self {
            tick_interval: 1.0,
            duration: 5.0,
            vfx: None,
        }
    }
}

/// Area sub-parameters (EffectOverTimeArea, DensestEnemyCluster scoring).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaParams {
    pub radius: f32,
    /// Visual effect name placed at the area's centre
    pub vfx: Option<String>,
    /// Vertical offset applied to the visual only
    pub vfx_y_offset: f32,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self {
            radius: 4.0,
            vfx: None,
            vfx_y_offset: 0.0,
        }
    }
}

/// Chain sub-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Maximum number of hops, including the seed target
    pub max_targets: u32,
    /// Search radius around the previous target for the next hop
    pub radius: f32,
    /// Pause after a hop lands before the next one leaves
    pub jump_delay: f32,
    pub projectile_speed: f32,
    /// Height above an actor's origin that hops aim at
    pub height_offset: f32,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            max_targets: 3,
            radius: 10.0,
            jump_delay: 0.1,
            projectile_speed: 30.0,
            height_offset: super::constants::CHAIN_HEIGHT_OFFSET,
        }
    }
}

/// Summon sub-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummonParams {
    /// Prefab name handed to the external spawner (None = summon does nothing)
    pub prefab: Option<String>,
    pub count: u32,
}

impl Default for SummonParams {
    fn default() -> Self {
        Self {
            prefab: None,
            count: 1,
        }
    }
}

fn default_muzzle_offset() -> [f32; 3] {
    [0.0, HURTBOX_CENTER_HEIGHT, 0.0]
}

fn default_face_tolerance() -> f32 {
    15.0
}

/// Complete spell configuration, loaded from RON and attached to a caster.
///
/// Inserting this component also inserts the per-caster spell records
/// (decision request, cast request, windup, cooldown, movement lock).
#[derive(Component, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[require(SpellDecisionRequest, CastRequest, SpellWindup, SpellCooldown, MovementLock)]
pub struct SpellConfig {
    /// Display name, also used as the lookup key in `SpellDefinitions`
    pub name: String,
    pub kind: SpellKind,
    #[serde(default)]
    pub acquire: AcquireMode,

    // === Casting ===
    /// Maximum targeting range in units (before `SpellStats` scaling)
    pub range: f32,
    /// Windup in seconds (0.0 = fires on the tick it is accepted)
    #[serde(default)]
    pub cast_time: f32,
    /// Cooldown after release in seconds
    #[serde(default)]
    pub cooldown: f32,
    /// Damage or healing per hit / per tick
    pub amount: f32,
    #[serde(default)]
    pub effect: EffectPolarity,
    /// Spawn point relative to the caster, rotated by the caster's orientation.
    /// Defaults to hurtbox height so flat shots connect.
    #[serde(default = "default_muzzle_offset")]
    pub muzzle_offset: [f32; 3],

    // === Facing gate ===
    #[serde(default)]
    pub require_facing: bool,
    #[serde(default = "default_face_tolerance")]
    pub face_tolerance_deg: f32,
    /// Extra time after the scheduled release during which facing is enforced
    #[serde(default)]
    pub facing_grace: f32,

    // === Kind-specific ===
    #[serde(default)]
    pub projectile: ProjectileParams,
    #[serde(default)]
    pub over_time: OverTimeParams,
    #[serde(default)]
    pub area: AreaParams,
    #[serde(default)]
    pub chain: ChainParams,
    #[serde(default)]
    pub summon: SummonParams,
}

impl Default for SpellConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed Spell".to_string(),
            kind: SpellKind::ProjectileLine,
            acquire: AcquireMode::default(),
            range: 20.0,
            cast_time: 0.0,
            cooldown: 0.0,
            amount: 10.0,
            effect: EffectPolarity::default(),
            muzzle_offset: default_muzzle_offset(),
            require_facing: false,
            face_tolerance_deg: default_face_tolerance(),
            facing_grace: 0.0,
            projectile: ProjectileParams::default(),
            over_time: OverTimeParams::default(),
            area: AreaParams::default(),
            chain: ChainParams::default(),
            summon: SummonParams::default(),
        }
    }
}

impl SpellConfig {
    /// Returns true for heals and buffs
    pub fn is_positive(&self) -> bool {
        self.effect == EffectPolarity::Positive
    }

    /// Amount as applied to health: positive damages, negative heals.
    pub fn signed_amount(&self) -> f32 {
        signed_amount(self.amount, self.is_positive())
    }

    pub fn muzzle_offset(&self) -> Vec3 {
        Vec3::from_array(self.muzzle_offset)
    }

    /// Tick interval with the engine-wide floor applied
    pub fn tick_interval(&self) -> f32 {
        self.over_time.tick_interval.max(MIN_TICK_INTERVAL)
    }

    /// Facing tolerance with the one-degree floor applied
    pub fn face_tolerance(&self) -> f32 {
        self.face_tolerance_deg.max(MIN_FACE_TOLERANCE_DEG)
    }

    /// Check a single definition for values the passes cannot work with.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("spell has an empty name".to_string());
        }
        for (field, value) in [
            ("range", self.range),
            ("cast_time", self.cast_time),
            ("cooldown", self.cooldown),
            ("amount", self.amount),
            ("facing_grace", self.facing_grace),
        ] {
            if value < 0.0 {
                problems.push(format!("{}: {} must be non-negative, got {}", self.name, field, value));
            }
        }
        match self.kind {
            SpellKind::ProjectileLine => {
                if self.projectile.speed <= 0.0 {
                    problems.push(format!("{}: projectile.speed must be positive", self.name));
                }
                if self.projectile.max_distance <= 0.0 {
                    problems.push(format!("{}: projectile.max_distance must be positive", self.name));
                }
                if self.projectile.radius < 0.0 {
                    problems.push(format!("{}: projectile.radius must be non-negative", self.name));
                }
            }
            SpellKind::EffectOverTimeTarget | SpellKind::EffectOverTimeArea => {
                if self.over_time.duration < 0.0 {
                    problems.push(format!("{}: over_time.duration must be non-negative", self.name));
                }
                if self.kind == SpellKind::EffectOverTimeArea && self.area.radius < 0.0 {
                    problems.push(format!("{}: area.radius must be non-negative", self.name));
                }
            }
            SpellKind::Chain => {
                if self.chain.projectile_speed <= 0.0 {
                    problems.push(format!("{}: chain.projectile_speed must be positive", self.name));
                }
                if self.chain.radius < 0.0 {
                    problems.push(format!("{}: chain.radius must be non-negative", self.name));
                }
            }
            SpellKind::Summon => {
                if self.summon.prefab.is_none() {
                    warn!("{}: summon spell has no prefab and will never summon", self.name);
                }
            }
        }
        problems
    }
}

/// Sign convention shared by every effect: damage is positive, healing negative.
pub fn signed_amount(amount: f32, positive: bool) -> f32 {
    if positive {
        -amount
    } else {
        amount
    }
}

/// Root structure for the spells.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct SpellsConfig {
    pub spells: Vec<SpellConfig>,
}

/// Resource containing all spell definitions, keyed by name.
///
/// Loaded from `assets/config/spells.ron` at startup.
#[derive(Resource, Debug, Clone)]
pub struct SpellDefinitions {
    definitions: HashMap<String, SpellConfig>,
}

impl Default for SpellDefinitions {
    /// Load spell definitions from the default config file.
    /// Panics if the file cannot be loaded - use for tests only.
    fn default() -> Self {
        load_spell_definitions(SPELLS_CONFIG_PATH)
            .expect("Failed to load spell definitions in Default impl")
    }
}

impl SpellDefinitions {
    /// Create from a loaded config
    pub fn new(config: SpellsConfig) -> Self {
        Self {
            definitions: config
                .spells
                .into_iter()
                .map(|spell| (spell.name.clone(), spell))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SpellConfig> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterate definitions in name order (stable across runs)
    pub fn iter(&self) -> impl Iterator<Item = &SpellConfig> {
        let mut spells: Vec<&SpellConfig> = self.definitions.values().collect();
        spells.sort_by(|a, b| a.name.cmp(&b.name));
        spells.into_iter()
    }

    /// Check every definition, returning all problems found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let problems: Vec<String> = self.iter().flat_map(SpellConfig::problems).collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

/// Parse spell definitions from RON text.
pub fn parse_spell_definitions(contents: &str) -> Result<SpellDefinitions, String> {
    let config: SpellsConfig =
        ron::from_str(contents).map_err(|e| format!("Failed to parse spell config: {}", e))?;

    let count = config.spells.len();
    let definitions = SpellDefinitions::new(config);
    if definitions.len() != count {
        return Err("Spell config contains duplicate spell names".to_string());
    }

    definitions
        .validate()
        .map_err(|problems| format!("Invalid spell definitions: {}", problems.join("; ")))?;

    Ok(definitions)
}

/// Load spell definitions from a RON file on disk.
pub fn load_spell_definitions(path: &str) -> Result<SpellDefinitions, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;

    let definitions = parse_spell_definitions(&contents).map_err(|e| format!("{}: {}", path, e))?;

    info!("Loaded {} spell definitions from {}", definitions.len(), path);

    Ok(definitions)
}

/// Bevy plugin that loads spell definitions and builds the effect registry
pub struct SpellConfigPlugin {
    pub path: String,
}

impl Default for SpellConfigPlugin {
    fn default() -> Self {
        Self {
            path: SPELLS_CONFIG_PATH.to_string(),
        }
    }
}

impl Plugin for SpellConfigPlugin {
    fn build(&self, app: &mut App) {
        match load_spell_definitions(&self.path) {
            Ok(definitions) => {
                let registry = EffectRegistry::from_definitions(&definitions);
                app.insert_resource(definitions).insert_resource(registry);
            }
            Err(e) => {
                // Casters cannot be configured without definitions
                panic!("Failed to load spell definitions: {}", e);
            }
        }
    }
}
