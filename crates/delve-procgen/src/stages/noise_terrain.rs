//! Threshold-mapped Perlin terrain.

use std::collections::BTreeSet;

use delve_common::{stable_hash64, Vec3};
use delve_world::{Edits, TileId};
use noise::{NoiseFn, Perlin};

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::stage::{capabilities, Stage};

/// Fills the area from Perlin noise sampled at world coordinates.
///
/// Each sample in `[0, 1]` takes the tile of the first threshold it does
/// not exceed, or the last tile when it exceeds them all. Sampling depends
/// only on the world seed and position, so overlapping regions agree.
#[derive(Debug, Clone)]
pub struct NoiseTerrain {
    thresholds: Vec<(f64, String)>,
    frequency: f64,
}

impl NoiseTerrain {
    /// Default sampling frequency in cycles per tile.
    pub const DEFAULT_FREQUENCY: f64 = 0.083;

    /// Creates the stage. Thresholds are sorted ascending.
    pub fn new<S: Into<String>>(thresholds: impl IntoIterator<Item = (f64, S)>) -> GenResult<Self> {
        let mut thresholds: Vec<(f64, String)> =
            thresholds.into_iter().map(|(t, name)| (t, name.into())).collect();
        if thresholds.is_empty() {
            return Err(GenError::InvalidConfig("noise terrain needs at least one threshold".into()));
        }
        thresholds.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            thresholds,
            frequency: Self::DEFAULT_FREQUENCY,
        })
    }

    /// Sets the sampling frequency.
    #[must_use]
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Sorted `(threshold, tile name)` pairs.
    #[must_use]
    pub fn thresholds(&self) -> &[(f64, String)] {
        &self.thresholds
    }

    /// Noise value in `[0, 1]` at a world position.
    #[must_use]
    pub fn sample(&self, noise: &Perlin, x: i32, y: i32) -> f64 {
        let raw = noise.get([f64::from(x) * self.frequency, f64::from(y) * self.frequency]);
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    fn pick(value: f64, table: &[(f64, TileId)]) -> Option<TileId> {
        table
            .iter()
            .find(|(threshold, _)| value <= *threshold)
            .or_else(|| table.last())
            .map(|&(_, tile)| tile)
    }
}

impl Stage for NoiseTerrain {
    fn id(&self) -> &str {
        "noise_terrain"
    }

    fn provides(&self) -> BTreeSet<String> {
        capabilities(["terrain"])
    }

    fn requires(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits> {
        let table = self
            .thresholds
            .iter()
            .map(|(threshold, name)| Ok((*threshold, ctx.tile_id(name)?)))
            .collect::<GenResult<Vec<_>>>()?;

        let noise = Perlin::new(stable_hash64(&format!("{}:noise_terrain", ctx.world_seed())) as u32);
        let area = ctx.area();
        let mut edits = Edits::new();
        for (x, y) in area.iter_xy() {
            if let Some(tile) = Self::pick(self.sample(&noise, x, y), &table) {
                edits.add_tile(Vec3::new(x, y, area.min.z), tile);
            }
        }
        Ok(edits)
    }
}
