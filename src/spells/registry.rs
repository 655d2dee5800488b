//! Effect Registry
//!
//! Maps the visual-effect and summon-prefab names used in spell definitions
//! to compact numeric ids. The registry is built once when definitions are
//! loaded and handed to the passes as a resource, so nothing resolves names
//! through ambient global state.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::spell_config::SpellDefinitions;

/// Id of a visual effect known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VfxId(pub u32);

/// Id of a summonable prefab known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrefabId(pub u32);

/// Bidirectional name table with ids handed out in registration order.
#[derive(Debug, Clone, Default)]
struct NameTable {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl NameTable {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }
}

/// Registry of visual-effect and prefab identifiers.
#[derive(Resource, Debug, Clone, Default)]
pub struct EffectRegistry {
    vfx: NameTable,
    prefabs: NameTable,
}

impl EffectRegistry {
    /// Register every visual and prefab name referenced by the definitions.
    pub fn from_definitions(definitions: &SpellDefinitions) -> Self {
        let mut registry = Self::default();
        for spell in definitions.iter() {
            if let Some(name) = &spell.over_time.vfx {
                registry.register_vfx(name);
            }
            if let Some(name) = &spell.area.vfx {
                registry.register_vfx(name);
            }
            if let Some(name) = &spell.summon.prefab {
                registry.register_prefab(name);
            }
        }
        info!(
            "Effect registry ready: {} visual effects, {} prefabs",
            registry.vfx.names.len(),
            registry.prefabs.names.len()
        );
        registry
    }

    pub fn register_vfx(&mut self, name: &str) -> VfxId {
        VfxId(self.vfx.intern(name))
    }

    pub fn register_prefab(&mut self, name: &str) -> PrefabId {
        PrefabId(self.prefabs.intern(name))
    }

    pub fn vfx_id(&self, name: &str) -> Option<VfxId> {
        self.vfx.id(name).map(VfxId)
    }

    pub fn vfx_name(&self, id: VfxId) -> Option<&str> {
        self.vfx.name(id.0)
    }

    pub fn prefab_id(&self, name: &str) -> Option<PrefabId> {
        self.prefabs.id(name).map(PrefabId)
    }

    pub fn prefab_name(&self, id: PrefabId) -> Option<&str> {
        self.prefabs.name(id.0)
    }

    /// Resolve an optional visual name, warning about names nobody registered.
    pub fn resolve_vfx(&self, name: Option<&str>) -> Option<VfxId> {
        let name = name?;
        let id = self.vfx_id(name);
        if id.is_none() {
            warn!("Unknown visual effect '{}', effect will play without visuals", name);
        }
        id
    }
}
