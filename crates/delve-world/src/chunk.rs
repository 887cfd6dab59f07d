//! Chunk storage with deferred entity spawns.

use ahash::{AHashMap, AHashSet};
use delve_common::{ChunkDims, ChunkKey, EntityHandle, LocalCoord, Vec3};

use crate::edits::EntitySpawn;
use crate::tiles::TileId;

/// Fully validated replacement state for one chunk, built off to the side
/// during a commit and swapped in at once.
#[derive(Debug)]
pub(crate) struct StagedChunk {
    pub(crate) tiles: Vec<TileId>,
    pub(crate) spawns: Vec<(Vec3, EntitySpawn)>,
    pub(crate) guids: AHashSet<String>,
}

/// A chunk of the world containing tiles and deferred entity spawns.
#[derive(Debug)]
pub struct Chunk {
    /// Chunk key
    key: ChunkKey,
    /// Dimensions the tile array is laid out with
    dims: ChunkDims,
    /// Flat tile array, `dims.volume()` long
    tiles: Vec<TileId>,
    /// Deferred spawns anchored at world positions
    pub(crate) spawns: Vec<(Vec3, EntitySpawn)>,
    /// GUIDs of every recorded spawn
    spawn_guids: AHashSet<String>,
    /// Live entities created from `spawns`, by GUID
    pub(crate) materialized: AHashMap<String, EntityHandle>,
}

impl Chunk {
    /// Creates a chunk filled with `fill`.
    #[must_use]
    pub fn new(key: ChunkKey, dims: ChunkDims, fill: TileId) -> Self {
        Self {
            key,
            dims,
            tiles: vec![fill; dims.volume()],
            spawns: Vec::new(),
            spawn_guids: AHashSet::new(),
            materialized: AHashMap::new(),
        }
    }

    /// Returns the chunk key.
    #[must_use]
    pub const fn key(&self) -> ChunkKey {
        self.key
    }

    /// Returns the chunk dimensions.
    #[must_use]
    pub const fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Gets a tile at local coordinates.
    #[must_use]
    pub fn get_local(&self, local: LocalCoord) -> Option<TileId> {
        let index = self.dims.local_index(local).ok()?;
        self.tiles.get(index).copied()
    }

    /// Returns a slice of all tiles.
    #[must_use]
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Returns the deferred spawns.
    #[must_use]
    pub fn spawns(&self) -> &[(Vec3, EntitySpawn)] {
        &self.spawns
    }

    /// Whether a spawn with this GUID has been recorded.
    #[must_use]
    pub fn has_spawn(&self, guid: &str) -> bool {
        self.spawn_guids.contains(guid)
    }

    /// Number of live entities materialized from this chunk.
    #[must_use]
    pub fn materialized_count(&self) -> usize {
        self.materialized.len()
    }

    /// Live handle materialized for a GUID, if any.
    #[must_use]
    pub fn materialized_handle(&self, guid: &str) -> Option<EntityHandle> {
        self.materialized.get(guid).copied()
    }

    /// Live handles materialized from this chunk.
    pub fn materialized_handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.materialized.values().copied()
    }

    /// Copies the current state so a commit can modify it.
    pub(crate) fn stage(&self) -> StagedChunk {
        StagedChunk {
            tiles: self.tiles.clone(),
            spawns: Vec::new(),
            guids: AHashSet::new(),
        }
    }

    /// Swaps in a staged state. Staged spawns are appended after the existing ones.
    pub(crate) fn apply(&mut self, staged: StagedChunk) {
        self.tiles = staged.tiles;
        self.spawns.extend(staged.spawns);
        self.spawn_guids.extend(staged.guids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_common::StableId;

    #[test]
    fn test_chunk_creation() {
        let chunk = Chunk::new(ChunkKey::new(1, 2, 0), ChunkDims::default(), 1);
        assert_eq!(chunk.key(), ChunkKey::new(1, 2, 0));
        assert_eq!(chunk.tiles().len(), 32 * 32);
        assert!(chunk.tiles().iter().all(|&t| t == 1));
        assert!(chunk.spawns().is_empty());
    }

    #[test]
    fn test_get_local_bounds() {
        let chunk = Chunk::new(ChunkKey::default(), ChunkDims::default(), 7);
        assert_eq!(chunk.get_local(LocalCoord::new(31, 31, 0)), Some(7));
        assert_eq!(chunk.get_local(LocalCoord::new(32, 0, 0)), None);
        assert_eq!(chunk.get_local(LocalCoord::new(0, 0, 1)), None);
    }

    #[test]
    fn test_staged_apply_appends() {
        let mut chunk = Chunk::new(ChunkKey::default(), ChunkDims::default(), 1);
        let mut staged = chunk.stage();
        staged.tiles[0] = 3;
        staged
            .spawns
            .push((Vec3::ZERO, EntitySpawn::new(StableId::new("a"))));
        staged.guids.insert("a".into());

        // Nothing visible before the swap.
        assert_eq!(chunk.tiles()[0], 1);
        assert!(!chunk.has_spawn("a"));

        chunk.apply(staged);
        assert_eq!(chunk.tiles()[0], 3);
        assert!(chunk.has_spawn("a"));
        assert_eq!(chunk.spawns().len(), 1);
    }
}
