//! Demo world: tiles, blueprints, the generation pipeline and a scripted walk.

use anyhow::{Context, Result};
use delve_common::{Aabb, StableId, Vec3};
use delve_procgen::{
    legend, Blueprint, CacheStats, CellularAutomata, ChunkManager, FeatureRegistry, NoiseTerrain,
    Pipeline, PlaceBuildings, ScatterSpawns, SimpleRoomParcels,
};
use delve_world::{ComponentFactory, EntityRegistry, EntitySpawn, Position, Realm};
use tracing::{debug, info};

use crate::config::EngineConfig;

/// Display glyph for a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph(pub char);

/// Human-readable entity name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// Marker for entities that attack on sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hostile;

/// The realm, live entities and the streaming manager.
pub struct DemoWorld {
    /// Tile storage
    pub realm: Realm,
    /// Live entities
    pub entities: EntityRegistry,
    /// Streaming driver
    pub manager: ChunkManager,
}

fn npc(label: &str, glyph: char, name: &str) -> EntitySpawn {
    EntitySpawn::new(StableId::new(label))
        .with_component(ComponentFactory::cloned(Glyph(glyph)))
        .with_component(ComponentFactory::cloned(Name(name.to_string())))
        .with_tag("npc")
}

/// Blueprints available to the building stage.
pub fn demo_features() -> Result<FeatureRegistry> {
    let house = legend([('#', "wall"), ('.', "floor"), ('+', "door")]);
    let mut features = FeatureRegistry::new();

    features.register(
        Blueprint::new("cottage", ["#####", "#...#", "#...+", "#####"], house.clone())?
            .with_tags(["house", "small"])
            .with_entity(2, 1, npc("farmer", 'f', "Farmer"))?,
    )?;
    features.register(
        Blueprint::new(
            "longhouse",
            ["########", "#......#", "+......#", "#......#", "########"],
            house.clone(),
        )?
        .with_tags(["house", "large"])
        .with_entity(2, 2, npc("elder", 'e', "Elder"))?
        .with_entity(5, 2, npc("smith", 's', "Smith"))?,
    )?;
    features.register(
        Blueprint::new("shrine", [" # ", "#.#", " + "], house)?
            .with_tags(["holy", "small"])
            .with_entity(1, 1, npc("priest", 'p', "Priest"))?,
    )?;
    Ok(features)
}

/// The generation pipeline used by the demo.
pub fn demo_pipeline() -> Result<Pipeline> {
    Ok(Pipeline::new()
        .with_stage(NoiseTerrain::new([(0.42, "wall"), (1.0, "floor")])?)
        .with_stage(CellularAutomata::new("wall", "floor").with_iterations(3))
        .with_stage(SimpleRoomParcels::new((9, 7), 3)?)
        .with_stage(PlaceBuildings::new(["house"]).with_density(0.35))
        .with_stage(
            ScatterSpawns::new("rat", "floor", 0.01)?
                .with_component(ComponentFactory::cloned(Glyph('r')))
                .with_component(ComponentFactory::cloned(Hostile)),
        ))
}

impl DemoWorld {
    /// Builds an empty world ready to stream.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let realm = Realm::new();
        let manager = ChunkManager::new(
            demo_pipeline()?,
            demo_features()?,
            config.world_seed,
            config.streaming.clone(),
            realm.dims(),
        )
        .context("failed to build chunk manager")?;

        Ok(Self {
            realm,
            entities: EntityRegistry::new(),
            manager,
        })
    }

    /// Observer position after `step` moves along the demo path.
    #[must_use]
    pub fn walk_position(step: u32, stride: i32) -> Vec3 {
        let step = step as i32;
        // Mostly east, stepping north every 8 moves.
        let east = step * stride;
        let north = (step / 8) * (stride / 2);
        Vec3::xy(east, north)
    }

    /// Runs the scripted walk and returns the final observer position.
    pub fn walk(&mut self, config: &EngineConfig) -> Result<Vec3> {
        let mut pos = Vec3::ZERO;
        for step in 0..config.walk_steps {
            pos = Self::walk_position(step, config.walk_stride);
            let update = self
                .manager
                .update_player_interest(
                    &mut self.realm,
                    &mut self.entities,
                    pos,
                    config.interest_radius,
                )
                .with_context(|| format!("interest update failed at {pos}"))?;
            debug!(
                "Step {step} at {pos}: generated={}, +{} / -{} chunks, {} live entities",
                update.generation.is_some(),
                update.activated.len(),
                update.deactivated.len(),
                self.entities.len()
            );
            if let Some(report) = &update.generation {
                if !report.commit.is_clean() {
                    info!("Step {step}: {} chunks dropped edits", report.commit.chunks_failed.len());
                }
            }
        }
        Ok(pos)
    }

    /// Streaming statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.manager.cache_stats()
    }

    /// ASCII rendering of `area` at its min z, live entities drawn over tiles.
    #[must_use]
    pub fn render(&self, area: Aabb) -> String {
        let tiles = self.realm.tiles();
        let width = area.width().max(0) as usize;
        let mut rows: Vec<Vec<char>> = (area.min.y..area.max.y)
            .map(|y| {
                (area.min.x..area.max.x)
                    .map(|x| {
                        let id = self.realm.read_tile(Vec3::new(x, y, area.min.z));
                        tiles.get(id).map_or('?', |def| def.glyph)
                    })
                    .collect()
            })
            .collect();

        for handle in self.entities.handles() {
            let Some(pos) = self.entities.get::<Position>(handle) else {
                continue;
            };
            let at = Vec3::new(pos.x, pos.y, pos.z);
            if !area.contains(at) {
                continue;
            }
            let glyph = self.entities.get::<Glyph>(handle).map_or('@', |g| g.0);
            let (col, row) = ((at.x - area.min.x) as usize, (at.y - area.min.y) as usize);
            if let Some(cell) = rows.get_mut(row).and_then(|r| r.get_mut(col)) {
                *cell = glyph;
            }
        }

        let mut out = String::with_capacity(rows.len() * (width + 1));
        for row in rows {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}
