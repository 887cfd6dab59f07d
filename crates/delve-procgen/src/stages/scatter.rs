//! Per-tile entity scattering.

use std::collections::BTreeSet;

use delve_common::{make_procedural_entity_guid, StableId, Vec3};
use delve_world::{ComponentFactory, Edits, EntitySpawn};
use rand::Rng;

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::stage::{capabilities, Stage};

/// Places `kind` spawns on committed tiles named `on_tile` with probability
/// `chance` per tile.
///
/// Randomness and GUIDs are keyed by world position, so regenerating an
/// overlapping region proposes the same spawns and commit drops them.
#[derive(Debug, Clone)]
pub struct ScatterSpawns {
    id: String,
    kind: String,
    on_tile: String,
    chance: f64,
    components: Vec<ComponentFactory>,
}

impl ScatterSpawns {
    /// Creates the stage. Its id is `scatter_<kind>`.
    pub fn new(kind: impl Into<String>, on_tile: impl Into<String>, chance: f64) -> GenResult<Self> {
        if !(0.0..=1.0).contains(&chance) {
            return Err(GenError::InvalidConfig(format!("scatter chance {chance} outside [0, 1]")));
        }
        let kind = kind.into();
        Ok(Self {
            id: format!("scatter_{kind}"),
            kind,
            on_tile: on_tile.into(),
            chance,
            components: Vec::new(),
        })
    }

    /// Adds a component every spawned entity receives.
    #[must_use]
    pub fn with_component(mut self, factory: ComponentFactory) -> Self {
        self.components.push(factory);
        self
    }
}

impl Stage for ScatterSpawns {
    fn id(&self) -> &str {
        &self.id
    }

    fn provides(&self) -> BTreeSet<String> {
        capabilities(["spawns"])
    }

    fn requires(&self) -> BTreeSet<String> {
        capabilities(["terrain"])
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits> {
        let target = ctx.tile_id(&self.on_tile)?;
        let area = ctx.area();
        let namespace = format!("spawns:{}", self.kind);
        let mut edits = Edits::new();

        for (x, y) in area.iter_xy() {
            let pos = Vec3::new(x, y, area.min.z);
            if ctx.api().read_tile(pos) != target {
                continue;
            }
            if ctx.rng_for_pos(&namespace, pos).gen::<f64>() >= self.chance {
                continue;
            }
            let guid = make_procedural_entity_guid(ctx.world_seed(), &self.id, pos, &self.kind, 0);
            let spawn = self
                .components
                .iter()
                .cloned()
                .fold(EntitySpawn::new(StableId::new(guid)), EntitySpawn::with_component)
                .with_tag(self.kind.clone());
            edits.add_spawn(pos, spawn);
        }
        Ok(edits)
    }
}
