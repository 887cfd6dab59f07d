//! Pure-data edits produced by generation before they are committed.

use std::collections::BTreeSet;

use delve_common::{StableId, Vec3};
use serde::{Deserialize, Serialize};

use crate::entities::ComponentFactory;
use crate::tiles::TileId;

/// A single tile write in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileWrite {
    /// World position
    pub pos: Vec3,
    /// Tile to store
    pub tile: TileId,
}

/// Pure-data description of an entity to instantiate later.
#[derive(Debug, Clone)]
pub struct EntitySpawn {
    /// Stable identifier used for deduplication and cross-chunk references
    pub stable_id: StableId,
    /// Offset from the anchor position the spawn is recorded at
    pub local_pos: Vec3,
    /// Component constructors, run in order on materialization
    pub components: Vec<ComponentFactory>,
    /// Free-form tags
    pub tags: BTreeSet<String>,
}

impl EntitySpawn {
    /// Creates a spawn with no offset, components or tags.
    #[must_use]
    pub fn new(stable_id: StableId) -> Self {
        Self {
            stable_id,
            local_pos: Vec3::ZERO,
            components: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Sets the offset from the anchor position.
    #[must_use]
    pub fn with_offset(mut self, local_pos: Vec3) -> Self {
        self.local_pos = local_pos;
        self
    }

    /// Appends a component constructor.
    #[must_use]
    pub fn with_component(mut self, factory: ComponentFactory) -> Self {
        self.components.push(factory);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Same spawn under a different stable id.
    #[must_use]
    pub fn reidentified(&self, stable_id: StableId) -> Self {
        Self {
            stable_id,
            ..self.clone()
        }
    }
}

/// Collection of tile writes and deferred spawns, applied per chunk on commit.
#[derive(Debug, Clone, Default)]
pub struct Edits {
    /// Tile writes
    pub tiles: Vec<TileWrite>,
    /// Deferred spawns anchored at a world position
    pub spawns: Vec<(Vec3, EntitySpawn)>,
}

impl Edits {
    /// Creates an empty edit set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tile write.
    pub fn add_tile(&mut self, pos: Vec3, tile: TileId) {
        self.tiles.push(TileWrite { pos, tile });
    }

    /// Adds a deferred spawn.
    pub fn add_spawn(&mut self, world_pos: Vec3, spawn: EntitySpawn) {
        self.spawns.push((world_pos, spawn));
    }

    /// Appends every edit of `other`.
    pub fn merge(&mut self, other: Self) {
        self.tiles.extend(other.tiles);
        self.spawns.extend(other.spawns);
    }

    /// Total number of edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len() + self.spawns.len()
    }

    /// Whether there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.spawns.is_empty()
    }
}
