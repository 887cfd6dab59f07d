//! Tile definitions and the tile registry.

use std::collections::BTreeSet;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// Numeric tile identifier stored in chunk arrays.
pub type TileId = u16;

/// Definition of a tile type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDef {
    /// Registry id
    pub id: TileId,
    /// Unique name referenced by blueprints and stages
    pub name: String,
    /// Display glyph
    pub glyph: char,
    /// Whether the tile blocks movement
    pub blocks_move: bool,
    /// Whether the tile blocks sight
    pub blocks_sight: bool,
    /// Free-form tags
    pub tags: BTreeSet<String>,
}

impl TileDef {
    /// Creates a passable, transparent tile.
    #[must_use]
    pub fn new(id: TileId, name: impl Into<String>, glyph: char) -> Self {
        Self {
            id,
            name: name.into(),
            glyph,
            blocks_move: false,
            blocks_sight: false,
            tags: BTreeSet::new(),
        }
    }

    /// Sets the movement/sight blocking flags.
    #[must_use]
    pub fn blocking(mut self, blocks_move: bool, blocks_sight: bool) -> Self {
        self.blocks_move = blocks_move;
        self.blocks_sight = blocks_sight;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Registry for tile definitions, providing lookup by id or name.
#[derive(Debug, Clone)]
pub struct TileRegistry {
    by_id: AHashMap<TileId, TileDef>,
    by_name: AHashMap<String, TileId>,
    next_id: TileId,
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TileRegistry {
    /// Name of the tile new chunks are filled with.
    pub const VOID: &'static str = "void";

    /// Creates an empty registry. Auto-assigned ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_id: AHashMap::new(),
            by_name: AHashMap::new(),
            next_id: 1,
        }
    }

    /// Creates a registry holding `void`, `floor`, `wall` and `door` (ids 1-4).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for def in [
            TileDef::new(1, Self::VOID, ' ').blocking(true, true),
            TileDef::new(2, "floor", '.'),
            TileDef::new(3, "wall", '#').blocking(true, true),
            TileDef::new(4, "door", '+'),
        ] {
            registry.insert(def);
        }
        registry
    }

    fn insert(&mut self, def: TileDef) {
        self.next_id = self.next_id.max(def.id.saturating_add(1));
        self.by_name.insert(def.name.clone(), def.id);
        self.by_id.insert(def.id, def);
    }

    /// Registers a tile definition with an explicit id.
    pub fn register(&mut self, def: TileDef) -> WorldResult<()> {
        if self.by_id.contains_key(&def.id) {
            return Err(WorldError::DuplicateTileId(def.id));
        }
        if self.by_name.contains_key(&def.name) {
            return Err(WorldError::DuplicateTileName(def.name));
        }
        self.insert(def);
        Ok(())
    }

    /// Registers a new tile with the next free id.
    pub fn register_new(
        &mut self,
        name: impl Into<String>,
        glyph: char,
        blocks_move: bool,
        blocks_sight: bool,
    ) -> WorldResult<TileId> {
        if self.next_id == TileId::MAX {
            return Err(WorldError::TileIdsExhausted);
        }
        let id = self.next_id;
        self.register(TileDef::new(id, name, glyph).blocking(blocks_move, blocks_sight))?;
        Ok(id)
    }

    /// Gets a tile definition by id.
    pub fn get(&self, id: TileId) -> WorldResult<&TileDef> {
        self.by_id.get(&id).ok_or(WorldError::UnknownTileId(id))
    }

    /// Gets a tile definition by name.
    pub fn get_by_name(&self, name: &str) -> WorldResult<&TileDef> {
        let id = self.id(name)?;
        self.get(id)
    }

    /// Gets a tile id by name.
    pub fn id(&self, name: &str) -> WorldResult<TileId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| WorldError::UnknownTile(name.to_string()))
    }

    /// Gets a tile name by id.
    pub fn name(&self, id: TileId) -> WorldResult<&str> {
        self.get(id).map(|def| def.name.as_str())
    }

    /// Whether a tile with this name exists.
    #[must_use]
    pub fn has_tile(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Whether a tile with this id exists.
    #[must_use]
    pub fn contains_id(&self, id: TileId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Number of registered tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tiles = TileRegistry::with_defaults();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles.id("void").unwrap(), 1);
        assert_eq!(tiles.id("floor").unwrap(), 2);
        assert_eq!(tiles.id("wall").unwrap(), 3);
        let wall = tiles.get_by_name("wall").unwrap();
        assert!(wall.blocks_move && wall.blocks_sight);
        assert!(!tiles.get_by_name("door").unwrap().blocks_move);
    }

    #[test]
    fn test_register_new_continues_ids() {
        let mut tiles = TileRegistry::with_defaults();
        let water = tiles.register_new("water", '~', true, false).unwrap();
        assert_eq!(water, 5);
        assert_eq!(tiles.name(water).unwrap(), "water");
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut tiles = TileRegistry::with_defaults();
        assert_eq!(
            tiles.register(TileDef::new(2, "moss", '"')),
            Err(WorldError::DuplicateTileId(2))
        );
        assert_eq!(
            tiles.register_new("wall", '#', true, true),
            Err(WorldError::DuplicateTileName("wall".into()))
        );
    }

    #[test]
    fn test_unknown_lookups() {
        let tiles = TileRegistry::with_defaults();
        assert_eq!(tiles.id("lava"), Err(WorldError::UnknownTile("lava".into())));
        assert!(tiles.get(99).is_err());
        assert!(!tiles.contains_id(0));
    }
}
