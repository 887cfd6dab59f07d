//! ID types for generated entities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::Vec3;
use crate::hash::GuidBuilder;

/// Stable identifier of a generated entity.
///
/// Derived deterministically from generation inputs, so it survives
/// materialize/destroy cycles and regeneration of the same area. This is
/// the only handle safe to keep across chunk boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StableId {
    /// Globally unique identifier
    pub guid: String,
}

impl StableId {
    /// Wraps an existing GUID (or a blueprint-local label).
    #[must_use]
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into() }
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.guid)
    }
}

/// Handle of a live, materialized entity.
///
/// Only meaningful to the entity store that issued it and never stable
/// across activation cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Generates a deterministic GUID from the given parts.
#[must_use]
pub fn make_guid(parts: &[&dyn fmt::Display]) -> String {
    parts
        .iter()
        .fold(GuidBuilder::new(), |builder, part| builder.part(part))
        .finish()
}

/// GUID for an entity stamped by a blueprint instance.
#[must_use]
pub fn make_blueprint_entity_guid(instance_id: &str, label_or_index: &str) -> String {
    make_guid(&[&"blueprint_entity", &instance_id, &label_or_index])
}

/// GUID for an entity placed directly by a generation stage.
#[must_use]
pub fn make_procedural_entity_guid(
    world_seed: u64,
    stage_id: &str,
    world_pos: Vec3,
    entity_type: &str,
    index: usize,
) -> String {
    make_guid(&[
        &world_seed,
        &"procedural",
        &stage_id,
        &world_pos,
        &entity_type,
        &index,
    ])
}
