//! The realm: chunk map, tile registry and the atomic commit path.

use std::collections::BTreeMap;

use ahash::AHashMap;
use delve_common::{ChunkDims, ChunkKey, Vec3};
use tracing::{debug, warn};

use crate::activation::{cleanup_chunk_entities, materialize_chunk_spawns};
use crate::chunk::{Chunk, StagedChunk};
use crate::edits::{EntitySpawn, Edits, TileWrite};
use crate::entities::EntityStore;
use crate::error::{WorldError, WorldResult};
use crate::tiles::{TileId, TileRegistry};

/// Outcome of committing one [`Edits`] value.
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Chunks whose staged state was swapped in
    pub chunks_committed: usize,
    /// Chunks whose edits were dropped, with the reason
    pub chunks_failed: Vec<(ChunkKey, WorldError)>,
    /// Tile writes applied
    pub tiles_written: usize,
    /// Spawns recorded
    pub spawns_added: usize,
    /// Spawns dropped because their GUID was already present
    pub spawns_deduplicated: usize,
}

impl CommitReport {
    /// Whether every affected chunk committed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.chunks_failed.is_empty()
    }

    /// Folds another report into this one.
    pub fn absorb(&mut self, other: Self) {
        self.chunks_committed += other.chunks_committed;
        self.chunks_failed.extend(other.chunks_failed);
        self.tiles_written += other.tiles_written;
        self.spawns_added += other.spawns_added;
        self.spawns_deduplicated += other.spawns_deduplicated;
    }
}

/// Edits of one commit that fall into the same chunk.
#[derive(Default)]
struct ChunkBatch<'e> {
    tiles: Vec<&'e TileWrite>,
    spawns: Vec<&'e (Vec3, EntitySpawn)>,
}

/// Tile world split into chunks, plus the registry its tile ids refer to.
#[derive(Debug)]
pub struct Realm {
    dims: ChunkDims,
    tiles: TileRegistry,
    void: TileId,
    chunks: AHashMap<ChunkKey, Chunk>,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    /// Creates a realm with default chunk dimensions and default tiles.
    #[must_use]
    pub fn new() -> Self {
        let tiles = TileRegistry::with_defaults();
        // with_defaults always registers void as id 1
        let void = tiles.id(TileRegistry::VOID).unwrap_or(1);
        Self {
            dims: ChunkDims::default(),
            tiles,
            void,
            chunks: AHashMap::new(),
        }
    }

    /// Creates a realm from explicit parts. The registry must define `void`.
    pub fn with_parts(dims: ChunkDims, tiles: TileRegistry) -> WorldResult<Self> {
        let void = tiles.id(TileRegistry::VOID)?;
        Ok(Self {
            dims,
            tiles,
            void,
            chunks: AHashMap::new(),
        })
    }

    /// Chunk dimensions.
    #[must_use]
    pub const fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// The tile registry.
    #[must_use]
    pub const fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    /// Mutable access to the tile registry.
    pub fn tiles_mut(&mut self) -> &mut TileRegistry {
        &mut self.tiles
    }

    /// Id of the `void` tile.
    #[must_use]
    pub const fn void_tile(&self) -> TileId {
        self.void
    }

    /// Reads the tile at a world position; `void` where no chunk exists.
    #[must_use]
    pub fn read_tile(&self, pos: Vec3) -> TileId {
        let (key, local) = self.dims.world_to_chunk(pos);
        self.chunks
            .get(&key)
            .and_then(|chunk| chunk.get_local(local))
            .unwrap_or(self.void)
    }

    /// Writes a single tile through the commit path.
    pub fn write_tile(&mut self, pos: Vec3, tile: TileId) -> WorldResult<()> {
        let mut edits = Edits::new();
        edits.add_tile(pos, tile);
        let mut report = self.commit(&edits);
        match report.chunks_failed.pop() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Gets or creates the chunk for a key.
    pub fn get_or_create_chunk(&mut self, key: ChunkKey) -> &Chunk {
        self.chunk_entry(key)
    }

    fn chunk_entry(&mut self, key: ChunkKey) -> &mut Chunk {
        let (dims, void) = (self.dims, self.void);
        self.chunks
            .entry(key)
            .or_insert_with(|| Chunk::new(key, dims, void))
    }

    /// Returns the chunk for a key, if it exists.
    #[must_use]
    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Iterates all resident chunks.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Removes a chunk entirely. Its materialized entities are left to the caller.
    pub fn remove_chunk(&mut self, key: ChunkKey) -> Option<Chunk> {
        self.chunks.remove(&key)
    }

    /// Applies edits, atomically per chunk.
    ///
    /// Writes and spawns are grouped by the chunk they fall into. Each
    /// chunk's new state is built on a copy and swapped in only when every
    /// operation for that chunk succeeded. A failing chunk is logged and
    /// skipped; the remaining chunks still commit. Spawns whose GUID the
    /// chunk already holds are dropped, so committing the same edits twice
    /// records each spawn once.
    pub fn commit(&mut self, edits: &Edits) -> CommitReport {
        let mut batches: BTreeMap<ChunkKey, ChunkBatch<'_>> = BTreeMap::new();
        for write in &edits.tiles {
            let key = self.dims.key_of(write.pos);
            batches.entry(key).or_default().tiles.push(write);
        }
        for spawn in &edits.spawns {
            let key = self.dims.key_of(spawn.0);
            batches.entry(key).or_default().spawns.push(spawn);
        }

        let mut report = CommitReport::default();
        for (key, batch) in batches {
            let (dims, void) = (self.dims, self.void);
            // New chunks stage against a fresh copy and are inserted only on success.
            let staged = match self.chunks.get(&key) {
                Some(chunk) => stage_chunk(chunk, &self.tiles, &batch),
                None => stage_chunk(&Chunk::new(key, dims, void), &self.tiles, &batch),
            };

            match staged {
                Ok((staged, deduplicated)) => {
                    let added = staged.spawns.len();
                    let chunk = self
                        .chunks
                        .entry(key)
                        .or_insert_with(|| Chunk::new(key, dims, void));
                    chunk.apply(staged);
                    report.chunks_committed += 1;
                    report.tiles_written += batch.tiles.len();
                    report.spawns_added += added;
                    report.spawns_deduplicated += deduplicated;
                    debug!(
                        "Committed chunk {key}: {} tile writes, {added} spawns (total spawns={})",
                        batch.tiles.len(),
                        chunk.spawns().len()
                    );
                },
                Err(e) => {
                    warn!("Failed to commit edits for chunk {key}: {e}");
                    report.chunks_failed.push((key, e));
                },
            }
        }
        report
    }

    /// Materializes a chunk's deferred spawns. No-op for unknown chunks.
    pub fn activate_chunk(&mut self, key: ChunkKey, store: &mut dyn EntityStore) -> usize {
        match self.chunks.get_mut(&key) {
            Some(chunk) => materialize_chunk_spawns(chunk, store),
            None => 0,
        }
    }

    /// Destroys a chunk's live entities, keeping its spawn records.
    pub fn deactivate_chunk(&mut self, key: ChunkKey, store: &mut dyn EntityStore) -> usize {
        match self.chunks.get_mut(&key) {
            Some(chunk) => cleanup_chunk_entities(chunk, store),
            None => 0,
        }
    }
}

/// Builds the replacement state for one chunk without touching it.
fn stage_chunk(
    chunk: &Chunk,
    tiles: &TileRegistry,
    batch: &ChunkBatch<'_>,
) -> WorldResult<(StagedChunk, usize)> {
    let dims = chunk.dims();
    let mut staged = chunk.stage();

    for write in &batch.tiles {
        if !tiles.contains_id(write.tile) {
            return Err(WorldError::UnknownTileId(write.tile));
        }
        let (_, local) = dims.world_to_chunk(write.pos);
        let index = dims.local_index(local)?;
        staged.tiles[index] = write.tile;
    }

    let mut deduplicated = 0;
    for (world_pos, spawn) in batch.spawns.iter().copied() {
        let guid = &spawn.stable_id.guid;
        if chunk.has_spawn(guid) || staged.guids.contains(guid) {
            deduplicated += 1;
            continue;
        }
        staged.guids.insert(guid.clone());
        staged.spawns.push((*world_pos, spawn.clone()));
    }

    Ok((staged, deduplicated))
}
