//! Streaming generation around a moving observer.

use std::collections::BTreeSet;

use delve_common::{Aabb, ChunkDims, ChunkKey, Vec3};
use delve_world::{EntityStore, Realm};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::StreamingConfig;
use crate::context::{GenContext, ProceduralInterface};
use crate::error::{GenError, GenResult};
use crate::features::FeatureRegistry;
use crate::lru::RegionCache;
use crate::pipeline::{Pipeline, PipelineReport};

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Regions currently remembered as generated
    pub generated_regions: usize,
    /// Cache capacity
    pub max_cached_regions: usize,
    /// Chunks currently active
    pub active_chunks: usize,
    /// Pipeline runs since creation
    pub pipeline_runs: u64,
    /// Regions evicted since creation
    pub evicted_regions: u64,
}

/// Result of one interest update.
#[derive(Debug, Default)]
pub struct InterestUpdate {
    /// Pipeline report when generation ran, `None` on a cache hit
    pub generation: Option<PipelineReport>,
    /// Chunks that became active
    pub activated: Vec<ChunkKey>,
    /// Chunks that stopped being active
    pub deactivated: Vec<ChunkKey>,
    /// Entities materialized
    pub entities_created: usize,
    /// Entities destroyed
    pub entities_destroyed: usize,
}

/// Drives a pipeline over snapped, cached regions and keeps the chunks
/// around an observer active.
#[derive(Debug)]
pub struct ChunkManager {
    pipeline: Pipeline,
    features: FeatureRegistry,
    world_seed: u64,
    config: StreamingConfig,
    dims: ChunkDims,
    regions: RegionCache<Aabb>,
    active: BTreeSet<ChunkKey>,
    pipeline_runs: u64,
    evicted_regions: u64,
}

impl ChunkManager {
    /// Creates a manager for a realm with chunk dimensions `dims`.
    ///
    /// Fails if the configuration is invalid, its chunk size disagrees with
    /// `dims`, or the pipeline's dependencies are unsatisfied.
    pub fn new(
        pipeline: Pipeline,
        features: FeatureRegistry,
        world_seed: u64,
        config: StreamingConfig,
        dims: ChunkDims,
    ) -> GenResult<Self> {
        config.validate()?;
        if config.chunk_size != dims.size {
            return Err(GenError::InvalidConfig(format!(
                "chunk_size {} does not match realm chunk size {}",
                config.chunk_size, dims.size
            )));
        }
        pipeline.validate_dependencies()?;
        info!(
            "Chunk manager ready: seed={world_seed}, stages={:?}, snap={}, buffer={}, max regions={}",
            pipeline.stage_order(),
            config.grid_snap_size,
            config.expansion_buffer,
            config.max_cached_regions
        );
        Ok(Self {
            pipeline,
            features,
            world_seed,
            config,
            dims,
            regions: RegionCache::new(),
            active: BTreeSet::new(),
            pipeline_runs: 0,
            evicted_regions: 0,
        })
    }

    /// World seed.
    #[must_use]
    pub const fn world_seed(&self) -> u64 {
        self.world_seed
    }

    /// Streaming configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// The generation pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The feature registry stages query.
    #[must_use]
    pub const fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    /// Expanded, grid-snapped bounds generated for a request.
    pub fn canonical_region(&self, area: Aabb) -> GenResult<Aabb> {
        area.validate()?;
        let expanded = area.expand(self.config.expansion_buffer);
        let snap = self.config.grid_snap_size;
        // Snapped bounds saturate at the i32 range instead of wrapping.
        let down = |c: i32| c.div_euclid(snap).saturating_mul(snap);
        let up = |c: i32| {
            let q = c.div_euclid(snap);
            let q = if c.rem_euclid(snap) == 0 { q } else { q + 1 };
            q.saturating_mul(snap)
        };
        Ok(Aabb::new(
            Vec3::new(down(expanded.min.x), down(expanded.min.y), expanded.min.z),
            Vec3::new(up(expanded.max.x), up(expanded.max.y), expanded.max.z),
        ))
    }

    /// Whether the region covering `area` is cached.
    pub fn is_region_cached(&self, area: Aabb) -> GenResult<bool> {
        Ok(self.regions.contains(&self.canonical_region(area)?))
    }

    /// Generates the canonical region covering `area` unless it is cached.
    ///
    /// Returns the pipeline report when generation ran.
    pub fn ensure_generated(
        &mut self,
        realm: &mut Realm,
        area: Aabb,
    ) -> GenResult<Option<PipelineReport>> {
        if realm.dims() != self.dims {
            return Err(GenError::InvalidConfig(format!(
                "realm chunk dims {:?} differ from manager dims {:?}",
                realm.dims(),
                self.dims
            )));
        }
        let region = self.canonical_region(area)?;
        if self.regions.touch(&region) {
            return Ok(None);
        }

        self.evict_if_needed();

        let report = {
            let api = ProceduralInterface::new(realm, &self.features);
            let mut ctx = GenContext::new(region, self.world_seed, api)?;
            self.pipeline.run(&mut ctx)?
        };
        self.pipeline_runs += 1;
        self.regions.insert(region);
        debug!(
            "Generated region {region} ({} chunks committed, {} failed); cached {}/{}",
            report.commit.chunks_committed,
            report.commit.chunks_failed.len(),
            self.regions.len(),
            self.config.max_cached_regions
        );
        Ok(Some(report))
    }

    fn evict_if_needed(&mut self) {
        if self.regions.len() < self.config.cleanup_trigger() {
            return;
        }
        let target = self.config.cleanup_target();
        let mut removed = 0;
        while self.regions.len() > target {
            if self.regions.pop_oldest().is_none() {
                break;
            }
            removed += 1;
        }
        if removed > 0 {
            self.evicted_regions += removed;
            info!(
                "Cleaned up {removed} old generated regions (cache size: {}/{})",
                self.regions.len(),
                self.config.max_cached_regions
            );
        }
    }

    /// Interest box of `radius_chunks` chunks around `center`, one tile deep.
    ///
    /// A radius of zero covers the single tile at `center`.
    #[must_use]
    pub fn interest_aabb(&self, center: Vec3, radius_chunks: i32) -> Aabb {
        let reach = radius_chunks.saturating_mul(self.config.chunk_size);
        Aabb::new(
            Vec3::new(center.x.saturating_sub(reach), center.y.saturating_sub(reach), center.z),
            Vec3::new(
                center.x.saturating_add(reach.max(1)),
                center.y.saturating_add(reach.max(1)),
                center.z.saturating_add(1),
            ),
        )
    }

    /// World bounds of a chunk.
    #[must_use]
    pub const fn chunk_bounds(&self, key: ChunkKey) -> Aabb {
        self.dims.chunk_bounds(key)
    }

    /// Generates around `position`, then replaces the active chunk set with
    /// the chunks overlapping the interest box.
    ///
    /// Chunks leaving the set are deactivated before chunks joining it are
    /// activated.
    pub fn update_player_interest(
        &mut self,
        realm: &mut Realm,
        store: &mut dyn EntityStore,
        position: Vec3,
        radius_chunks: i32,
    ) -> GenResult<InterestUpdate> {
        if radius_chunks < 0 {
            return Err(GenError::NegativeRadius(radius_chunks));
        }
        let interest = self.interest_aabb(position, radius_chunks);
        let mut update = InterestUpdate {
            generation: self.ensure_generated(realm, interest)?,
            ..Default::default()
        };

        let wanted: BTreeSet<ChunkKey> = self.dims.keys_overlapping(&interest).into_iter().collect();
        for &key in self.active.difference(&wanted) {
            update.entities_destroyed += realm.deactivate_chunk(key, store);
            update.deactivated.push(key);
        }
        for &key in wanted.difference(&self.active) {
            update.entities_created += realm.activate_chunk(key, store);
            update.activated.push(key);
        }
        if update.generation.is_some() {
            // A new region may have committed spawns into chunks that stayed active.
            for &key in wanted.intersection(&self.active) {
                update.entities_created += realm.activate_chunk(key, store);
            }
        }
        self.active = wanted;

        if !update.activated.is_empty() || !update.deactivated.is_empty() {
            debug!(
                "Interest at {position}: +{} chunks ({} entities), -{} chunks ({} entities), {} active",
                update.activated.len(),
                update.entities_created,
                update.deactivated.len(),
                update.entities_destroyed,
                self.active.len()
            );
        }
        Ok(update)
    }

    /// Currently active chunks.
    #[must_use]
    pub const fn active_chunks(&self) -> &BTreeSet<ChunkKey> {
        &self.active
    }

    /// Cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            generated_regions: self.regions.len(),
            max_cached_regions: self.config.max_cached_regions,
            active_chunks: self.active.len(),
            pipeline_runs: self.pipeline_runs,
            evicted_regions: self.evicted_regions,
        }
    }

    /// Cached regions from least to most recently used.
    #[must_use]
    pub fn cached_regions(&self) -> Vec<Aabb> {
        self.regions.keys_oldest_first().into_iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenContext;
    use crate::stage::{capabilities, Stage};
    use crate::stages::NoiseTerrain;
    use delve_common::StableId;
    use delve_world::{EntityRegistry, EntitySpawn, Edits};

    fn manager(config: StreamingConfig) -> ChunkManager {
        let pipeline = Pipeline::new().with_stage(NoiseTerrain::new([(0.5, "wall"), (1.0, "floor")]).unwrap());
        ChunkManager::new(pipeline, FeatureRegistry::new(), 9, config, ChunkDims::default()).unwrap()
    }

    fn area(x0: i32, y0: i32, x1: i32, y1: i32) -> Aabb {
        Aabb::new(Vec3::xy(x0, y0), Vec3::new(x1, y1, 1))
    }

    #[test]
    fn test_canonical_region_expands_and_snaps() {
        let mgr = manager(StreamingConfig::default());
        assert_eq!(mgr.canonical_region(area(0, 0, 10, 10)).unwrap(), area(-64, -64, 64, 64));
        assert_eq!(mgr.canonical_region(area(20, 20, 40, 40)).unwrap(), area(0, 0, 64, 64));
        // z is neither expanded nor snapped.
        let deep = Aabb::new(Vec3::new(20, 20, 3), Vec3::new(40, 40, 5));
        assert_eq!(mgr.canonical_region(deep).unwrap().min.z, 3);
        assert!(mgr.canonical_region(area(5, 5, 5, 9)).is_err());
    }

    #[test]
    fn test_region_generated_once() {
        let mut mgr = manager(StreamingConfig::default());
        let mut realm = Realm::new();

        assert!(mgr.ensure_generated(&mut realm, area(20, 20, 40, 40)).unwrap().is_some());
        let stats = mgr.cache_stats();
        assert_eq!(stats.generated_regions, 1);
        assert_eq!(stats.pipeline_runs, 1);

        assert!(mgr.ensure_generated(&mut realm, area(20, 20, 40, 40)).unwrap().is_none());
        assert!(mgr.ensure_generated(&mut realm, area(17, 18, 44, 46)).unwrap().is_none());
        let stats = mgr.cache_stats();
        assert_eq!(stats.generated_regions, 1);
        assert_eq!(stats.pipeline_runs, 1);
        assert!(mgr.is_region_cached(area(30, 30, 31, 31)).unwrap());
    }

    #[test]
    fn test_invalid_area_rejected() {
        let mut mgr = manager(StreamingConfig::default());
        let mut realm = Realm::new();
        let inverted = Aabb::new(Vec3::new(10, 0, 0), Vec3::new(0, 10, 1));
        assert!(matches!(
            mgr.ensure_generated(&mut realm, inverted),
            Err(GenError::InvalidArea(_))
        ));
        assert_eq!(realm.chunk_count(), 0);
    }

    #[test]
    fn test_eviction_is_access_ordered() {
        let config = StreamingConfig {
            expansion_buffer: 0,
            grid_snap_size: 32,
            max_cached_regions: 4,
            cleanup_threshold: 1.0,
            ..Default::default()
        };
        let mut mgr = manager(config);
        let mut realm = Realm::new();
        let region = |i: i32| area(i * 32, 0, i * 32 + 32, 32);

        for i in 0..4 {
            mgr.ensure_generated(&mut realm, region(i)).unwrap();
        }
        // Touch region 0 so regions 1 and 2 are the oldest.
        mgr.ensure_generated(&mut realm, region(0)).unwrap();
        mgr.ensure_generated(&mut realm, region(4)).unwrap();

        assert_eq!(mgr.cached_regions(), [region(3), region(0), region(4)]);
        let stats = mgr.cache_stats();
        assert_eq!(stats.evicted_regions, 2);
        assert_eq!(stats.pipeline_runs, 5);

        // An evicted region is generated again on request.
        assert!(mgr.ensure_generated(&mut realm, region(1)).unwrap().is_some());
    }

    #[test]
    fn test_interest_aabb() {
        let mgr = manager(StreamingConfig::default());
        let interest = mgr.interest_aabb(Vec3::new(100, 50, 2), 2);
        assert_eq!(interest, Aabb::new(Vec3::new(36, -14, 2), Vec3::new(164, 114, 3)));
        let single = mgr.interest_aabb(Vec3::xy(5, 5), 0);
        assert_eq!(single, area(5, 5, 6, 6));
        assert_eq!(mgr.chunk_bounds(ChunkKey::new(-1, 2, 0)), area(-32, 64, 0, 96));
    }

    #[test]
    fn test_negative_radius_rejected() {
        let mut mgr = manager(StreamingConfig::default());
        let mut realm = Realm::new();
        let mut store = EntityRegistry::new();
        assert_eq!(
            mgr.update_player_interest(&mut realm, &mut store, Vec3::ZERO, -1).unwrap_err(),
            GenError::NegativeRadius(-1)
        );
        assert_eq!(mgr.cache_stats().generated_regions, 0);
    }

    #[test]
    fn test_active_set_replaced() {
        let mut mgr = manager(StreamingConfig::default());
        let mut realm = Realm::new();
        let mut store = EntityRegistry::new();

        let first = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(16, 16), 1).unwrap();
        assert_eq!(first.activated.len(), 9);
        assert!(first.deactivated.is_empty());
        assert!(mgr.active_chunks().contains(&ChunkKey::new(-1, -1, 0)));

        let moved = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(48, 16), 1).unwrap();
        let column = |cx: i32| (-1..=1).map(|cy| ChunkKey::new(cx, cy, 0)).collect::<Vec<_>>();
        assert_eq!(moved.deactivated, column(-1));
        assert_eq!(moved.activated, column(2));
        assert_eq!(mgr.cache_stats().active_chunks, 9);
    }

    #[test]
    fn test_activation_materializes_and_cleans_up() {
        let mut mgr = manager(StreamingConfig::default());
        let mut realm = Realm::new();
        let mut store = EntityRegistry::new();

        let mut edits = Edits::new();
        edits.add_spawn(Vec3::xy(3, 3), EntitySpawn::new(StableId::new("torch")));
        realm.commit(&edits);

        let update = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(3, 3), 0).unwrap();
        assert_eq!(update.activated, [ChunkKey::default()]);
        assert_eq!(update.entities_created, 1);
        assert!(store.find_by_guid("torch").is_some());

        // Staying put is a no-op.
        let again = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(3, 3), 0).unwrap();
        assert!(again.activated.is_empty());
        assert_eq!(store.len(), 1);

        let away = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(300, 3), 0).unwrap();
        assert_eq!(away.entities_destroyed, 1);
        assert!(store.is_empty());
        assert!(realm.chunk(ChunkKey::default()).unwrap().has_spawn("torch"));
    }

    /// Spawns one entity at (5, 5) whose GUID depends on the region.
    struct RegionMarker;

    impl Stage for RegionMarker {
        fn id(&self) -> &str {
            "region_marker"
        }

        fn provides(&self) -> BTreeSet<String> {
            capabilities(["markers"])
        }

        fn requires(&self) -> BTreeSet<String> {
            BTreeSet::new()
        }

        fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits> {
            let mut edits = Edits::new();
            let guid = format!("marker:{}", ctx.area());
            edits.add_spawn(Vec3::xy(5, 5), EntitySpawn::new(StableId::new(guid)));
            Ok(edits)
        }
    }

    #[test]
    fn test_new_spawns_in_active_chunk_materialize() {
        let pipeline = Pipeline::new().with_stage(RegionMarker);
        let mut mgr =
            ChunkManager::new(pipeline, FeatureRegistry::new(), 9, StreamingConfig::default(), ChunkDims::default())
                .unwrap();
        let mut realm = Realm::new();
        let mut store = EntityRegistry::new();

        let first = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(16, 16), 1).unwrap();
        assert_eq!(first.entities_created, 1);

        // The second region overlaps chunk (0, 0), which stays active.
        let moved = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(48, 16), 1).unwrap();
        assert!(moved.generation.is_some());
        assert!(!moved.activated.contains(&ChunkKey::default()));
        assert_eq!(moved.entities_created, 1);

        let chunk = realm.chunk(ChunkKey::default()).unwrap();
        assert_eq!(chunk.spawns().len(), 2);
        assert_eq!(chunk.materialized_count(), 2);
        assert_eq!(store.len(), 2);

        // A cached region adds nothing new.
        let back = mgr.update_player_interest(&mut realm, &mut store, Vec3::xy(48, 16), 1).unwrap();
        assert!(back.generation.is_none());
        assert_eq!(back.entities_created, 0);
    }

    #[test]
    fn test_generation_near_i32_limits() {
        let mut mgr = manager(StreamingConfig::default());
        let mut realm = Realm::new();

        let high = Aabb::new(Vec3::new(i32::MAX - 10, 0, 0), Vec3::new(i32::MAX, 10, 1));
        let region = mgr.canonical_region(high).unwrap();
        assert_eq!(region.min.x, i32::MAX - 63);
        assert_eq!(region.max.x, i32::MAX);
        assert!(mgr.ensure_generated(&mut realm, high).unwrap().is_some());
        assert_ne!(realm.read_tile(Vec3::new(i32::MAX - 1, 5, 0)), realm.void_tile());

        let low = Aabb::new(Vec3::new(i32::MIN, i32::MIN, 0), Vec3::new(i32::MIN + 8, i32::MIN + 8, 1));
        let region = mgr.canonical_region(low).unwrap();
        assert_eq!(region.min, Vec3::new(i32::MIN, i32::MIN, 0));
        assert!(!region.is_degenerate());
        assert!(mgr.ensure_generated(&mut realm, low).unwrap().is_some());

        let mut store = EntityRegistry::new();
        let edge = Vec3::new(i32::MAX - 1, i32::MIN, 0);
        let update = mgr.update_player_interest(&mut realm, &mut store, edge, 1).unwrap();
        assert!(!update.activated.is_empty());
        assert!(mgr.interest_aabb(Vec3::new(0, 0, i32::MAX), 1).is_degenerate());
    }

    #[test]
    fn test_chunk_size_mismatch_rejected() {
        let config = StreamingConfig {
            chunk_size: 16,
            ..Default::default()
        };
        let result = ChunkManager::new(Pipeline::new(), FeatureRegistry::new(), 0, config, ChunkDims::default());
        assert!(matches!(result, Err(GenError::InvalidConfig(_))));
    }
}
