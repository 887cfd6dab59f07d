//! Blueprints (ASCII prefabs) and the tag-indexed feature registry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use delve_common::{make_blueprint_entity_guid, make_guid, StableId, Vec3};
use delve_world::{Edits, EntitySpawn, TileId, TileRegistry, TileWrite};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{GenError, GenResult};

/// Tag given to blueprints constructed without explicit tags.
pub const DEFAULT_TAG: &str = "feature";

/// A prefab stamped into the world from ASCII rows and a glyph legend.
///
/// Glyphs missing from the legend are transparent. Each entity template is
/// placed at its `(x, y)` cell; its `stable_id` is used as a label and
/// replaced by a per-instance GUID on stamping.
pub struct Blueprint {
    id: String,
    w: i32,
    h: i32,
    rows: Vec<String>,
    legend: BTreeMap<char, String>,
    entities: Vec<((i32, i32), EntitySpawn)>,
    tags: BTreeSet<String>,
    /// Base tile writes in local coordinates, keyed by resolved legend.
    tile_cache: RwLock<AHashMap<String, Arc<[TileWrite]>>>,
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("id", &self.id)
            .field("w", &self.w)
            .field("h", &self.h)
            .field("tags", &self.tags)
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

impl Blueprint {
    /// Builds a blueprint, checking that rows are non-empty and of equal width.
    pub fn new<R, S>(
        id: impl Into<String>,
        rows: R,
        legend: BTreeMap<char, String>,
    ) -> GenResult<Self>
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let rows: Vec<String> = rows.into_iter().map(Into::into).collect();
        let malformed = |reason: String| GenError::MalformedBlueprint {
            id: id.clone(),
            reason,
        };

        let w = rows.first().map_or(0, |row| row.chars().count());
        if w == 0 {
            return Err(malformed("blueprint has no cells".into()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.chars().count() != w) {
            return Err(malformed(format!(
                "row {y} has width {} but row 0 has width {w}",
                row.chars().count()
            )));
        }
        let w = i32::try_from(w).map_err(|_| malformed("blueprint too wide".into()))?;
        let h = i32::try_from(rows.len()).map_err(|_| malformed("blueprint too tall".into()))?;

        Ok(Self {
            id,
            w,
            h,
            rows,
            legend,
            entities: Vec::new(),
            tags: BTreeSet::from([DEFAULT_TAG.to_string()]),
            tile_cache: RwLock::new(AHashMap::new()),
        })
    }

    /// Replaces the tag set.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an entity template at a blueprint-local cell.
    pub fn with_entity(mut self, x: i32, y: i32, spawn: EntitySpawn) -> GenResult<Self> {
        if !(0..self.w).contains(&x) || !(0..self.h).contains(&y) {
            return Err(GenError::MalformedBlueprint {
                id: self.id.clone(),
                reason: format!(
                    "entity '{}' at ({x}, {y}) is outside {}x{}",
                    spawn.stable_id, self.w, self.h
                ),
            });
        }
        self.entities.push(((x, y), spawn));
        Ok(self)
    }

    /// Blueprint id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Width in tiles.
    #[must_use]
    pub const fn w(&self) -> i32 {
        self.w
    }

    /// Height in tiles.
    #[must_use]
    pub const fn h(&self) -> i32 {
        self.h
    }

    /// ASCII rows, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Glyph to tile-name legend.
    #[must_use]
    pub const fn legend(&self) -> &BTreeMap<char, String> {
        &self.legend
    }

    /// Entity templates.
    #[must_use]
    pub fn entities(&self) -> &[((i32, i32), EntitySpawn)] {
        &self.entities
    }

    /// Tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether the blueprint carries a tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Number of cached tile mappings.
    #[must_use]
    pub fn cached_mappings(&self) -> usize {
        self.tile_cache.read().len()
    }

    /// Stamps the blueprint with its top-left cell at `origin`.
    ///
    /// The instance id is derived from `(world_seed, id, origin, salt)` with
    /// an empty default salt, so re-stamping at the same place yields the
    /// same entity GUIDs.
    pub fn stamp(
        &self,
        origin: Vec3,
        tiles: &TileRegistry,
        world_seed: u64,
        salt: Option<&str>,
    ) -> GenResult<Edits> {
        let base = self.base_tiles(tiles)?;

        let mut edits = Edits::new();
        for write in base.iter() {
            edits.add_tile(origin + write.pos, write.tile);
        }

        let salt = salt.unwrap_or("");
        let instance_id = make_guid(&[&world_seed, &self.id, &origin, &salt]);
        for ((rx, ry), template) in &self.entities {
            let guid = make_blueprint_entity_guid(&instance_id, &template.stable_id.guid);
            let world_pos = Vec3::new(origin.x + rx, origin.y + ry, origin.z);
            edits.add_spawn(world_pos, template.reidentified(StableId::new(guid)));
        }
        Ok(edits)
    }

    fn mapping_key(&self, tiles: &TileRegistry) -> String {
        let mut parts: Vec<String> = self
            .legend
            .iter()
            .map(|(glyph, name)| match tiles.id(name) {
                Ok(id) => format!("{glyph}:{id}"),
                Err(_) => format!("{glyph}:?"),
            })
            .collect();
        parts.sort();
        parts.join(",")
    }

    fn base_tiles(&self, tiles: &TileRegistry) -> GenResult<Arc<[TileWrite]>> {
        let key = self.mapping_key(tiles);
        if let Some(cached) = self.tile_cache.read().get(&key) {
            return Ok(Arc::clone(cached));
        }

        let mut resolved: AHashMap<char, TileId> = AHashMap::new();
        let mut writes = Vec::with_capacity((self.w * self.h) as usize);
        for (y, row) in (0..).zip(&self.rows) {
            for (x, glyph) in (0..).zip(row.chars()) {
                let Some(name) = self.legend.get(&glyph) else {
                    continue;
                };
                let tile = match resolved.get(&glyph) {
                    Some(&tile) => tile,
                    None => {
                        let tile = tiles.id(name).map_err(|_| GenError::UnknownBlueprintTile {
                            blueprint: self.id.clone(),
                            tile: name.clone(),
                            glyph,
                            x,
                            y,
                        })?;
                        resolved.insert(glyph, tile);
                        tile
                    },
                };
                writes.push(TileWrite {
                    pos: Vec3::xy(x, y),
                    tile,
                });
            }
        }

        let base: Arc<[TileWrite]> = writes.into();
        debug!("Cached {} base tiles for blueprint '{}'", base.len(), self.id);
        self.tile_cache.write().insert(key, Arc::clone(&base));
        Ok(base)
    }
}

/// Registry of blueprints with a tag index.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    by_id: AHashMap<String, Blueprint>,
    by_tag: AHashMap<String, AHashSet<String>>,
}

impl FeatureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a blueprint. Ids must be unique.
    pub fn register(&mut self, blueprint: Blueprint) -> GenResult<()> {
        if self.by_id.contains_key(blueprint.id()) {
            return Err(GenError::DuplicateBlueprint(blueprint.id().to_string()));
        }
        for tag in blueprint.tags() {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(blueprint.id().to_string());
        }
        debug!("Registered blueprint '{}' ({}x{})", blueprint.id(), blueprint.w(), blueprint.h());
        self.by_id.insert(blueprint.id().to_string(), blueprint);
        Ok(())
    }

    /// Looks up a blueprint by id.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Blueprint> {
        self.by_id.get(id)
    }

    /// Blueprints whose tags include every `include` tag and no `exclude`
    /// tag, no larger than `size_at_most`, and accepted by `filter`.
    ///
    /// Results are sorted by id.
    pub fn query(
        &self,
        include: &BTreeSet<String>,
        exclude: &BTreeSet<String>,
        size_at_most: Option<(i32, i32)>,
        filter: Option<&dyn Fn(&Blueprint) -> bool>,
    ) -> Vec<&Blueprint> {
        let candidates: Vec<&String> = if include.is_empty() {
            self.by_id.keys().collect()
        } else {
            let mut sets = Vec::with_capacity(include.len());
            for tag in include {
                match self.by_tag.get(tag) {
                    Some(ids) => sets.push(ids),
                    None => return Vec::new(),
                }
            }
            sets.sort_by_key(|ids| ids.len());
            let Some((&smallest, rest)) = sets.split_first() else {
                return Vec::new();
            };
            smallest
                .iter()
                .filter(|id| rest.iter().all(|ids| ids.contains(*id)))
                .collect()
        };

        let mut results: Vec<&Blueprint> = candidates
            .into_iter()
            .filter(|id| {
                !exclude
                    .iter()
                    .any(|tag| self.by_tag.get(tag).is_some_and(|ids| ids.contains(*id)))
            })
            .filter_map(|id| self.by_id.get(id))
            .filter(|bp| size_at_most.map_or(true, |(w, h)| bp.w() <= w && bp.h() <= h))
            .filter(|bp| filter.map_or(true, |f| f(bp)))
            .collect();
        results.sort_by(|a, b| a.id().cmp(b.id()));
        results
    }

    /// Every tag in use.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<&str> {
        self.by_tag.keys().map(String::as_str).collect()
    }

    /// All blueprints, sorted by id.
    #[must_use]
    pub fn all(&self) -> Vec<&Blueprint> {
        let mut all: Vec<_> = self.by_id.values().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Blueprints carrying one tag, sorted by id.
    #[must_use]
    pub fn with_tag(&self, tag: &str) -> Vec<&Blueprint> {
        let mut found: Vec<_> = self
            .by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .collect();
        found.sort_by(|a, b| a.id().cmp(b.id()));
        found
    }

    /// Number of blueprints.
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

/// Builds a legend from `(glyph, tile name)` pairs.
#[must_use]
pub fn legend<const N: usize>(pairs: [(char, &str); N]) -> BTreeMap<char, String> {
    pairs.into_iter().map(|(c, name)| (c, name.to_string())).collect()
}
