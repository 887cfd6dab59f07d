//! Parcel layout and blueprint placement.

use std::collections::BTreeSet;

use delve_common::{Aabb, Vec3};
use delve_world::Edits;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::blackboard::PARCELS;
use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::stage::{capabilities, Stage};

/// Lays out a grid of equal rectangular parcels across the area.
///
/// Writes no tiles. The parcels are published under [`PARCELS`].
#[derive(Debug, Clone)]
pub struct SimpleRoomParcels {
    room_size: (i32, i32),
    padding: i32,
}

impl Default for SimpleRoomParcels {
    fn default() -> Self {
        Self {
            room_size: (8, 6),
            padding: 2,
        }
    }
}

impl SimpleRoomParcels {
    /// Creates the stage with a parcel size and the gap between parcels.
    pub fn new(room_size: (i32, i32), padding: i32) -> GenResult<Self> {
        if room_size.0 <= 0 || room_size.1 <= 0 || padding < 0 {
            return Err(GenError::InvalidConfig(format!(
                "room size {room_size:?} and padding {padding} must be positive"
            )));
        }
        Ok(Self { room_size, padding })
    }

    /// Parcels that fit entirely inside `area`, row by row.
    #[must_use]
    pub fn layout(&self, area: Aabb) -> Vec<Aabb> {
        let (room_w, room_h) = self.room_size;
        let mut parcels = Vec::new();
        let mut y = area.min.y;
        while y + room_h <= area.max.y {
            let mut x = area.min.x;
            while x + room_w <= area.max.x {
                parcels.push(Aabb::new(
                    Vec3::new(x, y, area.min.z),
                    Vec3::new(x + room_w, y + room_h, area.min.z + 1),
                ));
                x += room_w + self.padding;
            }
            y += room_h + self.padding;
        }
        parcels
    }
}

impl Stage for SimpleRoomParcels {
    fn id(&self) -> &str {
        "simple_room_parcels"
    }

    fn provides(&self) -> BTreeSet<String> {
        capabilities([PARCELS.name()])
    }

    fn requires(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits> {
        let parcels = self.layout(ctx.area());
        debug!("Laid out {} parcels in {}", parcels.len(), ctx.area());
        ctx.blackboard_mut().set(PARCELS, parcels);
        Ok(Edits::new())
    }
}

/// Stamps a tag-matched blueprint, centered, into each chosen parcel.
#[derive(Debug, Clone)]
pub struct PlaceBuildings {
    tags: BTreeSet<String>,
    density: f64,
}

impl PlaceBuildings {
    /// Creates the stage with the default density of 0.7.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            density: 0.7,
        }
    }

    /// Sets the probability that a parcel receives a building.
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }
}

impl Stage for PlaceBuildings {
    fn id(&self) -> &str {
        "place_buildings"
    }

    fn provides(&self) -> BTreeSet<String> {
        capabilities(["buildings"])
    }

    fn requires(&self) -> BTreeSet<String> {
        capabilities([PARCELS.name()])
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits> {
        let mut edits = Edits::new();
        let Some(parcels) = ctx.blackboard().get(PARCELS) else {
            return Ok(edits);
        };

        let mut rng = ctx.rng("buildings");
        let exclude = BTreeSet::new();
        let mut placed = 0;
        for parcel in parcels {
            if rng.gen::<f64>() > self.density {
                continue;
            }
            let (width, height) = (parcel.width(), parcel.height());
            let candidates = ctx
                .api()
                .features()
                .query(&self.tags, &exclude, Some((width, height)), None);
            let Some(blueprint) = candidates.choose(&mut rng) else {
                continue;
            };

            let origin = Vec3::new(
                parcel.min.x + (width - blueprint.w()) / 2,
                parcel.min.y + (height - blueprint.h()) / 2,
                ctx.area().min.z,
            );
            edits.merge(blueprint.stamp(origin, ctx.tiles(), ctx.world_seed(), None)?);
            placed += 1;
        }
        debug!("Placed {placed} of {} parcels in {}", parcels.len(), ctx.area());
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProceduralInterface;
    use crate::features::{legend, Blueprint, FeatureRegistry};
    use delve_world::Realm;

    fn features() -> FeatureRegistry {
        let mut features = FeatureRegistry::new();
        features
            .register(
                Blueprint::new("hut", ["####", "#..#", "####"], legend([('#', "wall"), ('.', "floor")]))
                    .unwrap()
                    .with_tags(["house"]),
            )
            .unwrap();
        features
            .register(
                Blueprint::new("manor", ["#".repeat(20)], legend([('#', "wall")]))
                    .unwrap()
                    .with_tags(["house"]),
            )
            .unwrap();
        features
    }

    #[test]
    fn test_layout_fits_inside_area() {
        let stage = SimpleRoomParcels::default();
        let area = Aabb::new(Vec3::ZERO, Vec3::new(28, 14, 1));
        let parcels = stage.layout(area);

        // Columns at 0, 10, 20 and rows at 0, 8.
        assert_eq!(parcels.len(), 6);
        assert_eq!(parcels[1].min, Vec3::xy(10, 0));
        assert_eq!(parcels[3].min, Vec3::xy(0, 8));
        assert!(parcels.iter().all(|p| p.max.x <= 28 && p.max.y <= 14));
    }

    #[test]
    fn test_layout_too_small() {
        let stage = SimpleRoomParcels::default();
        assert!(stage.layout(Aabb::new(Vec3::ZERO, Vec3::new(7, 40, 1))).is_empty());
        assert!(SimpleRoomParcels::new((0, 4), 1).is_err());
    }

    #[test]
    fn test_place_buildings_centers_blueprint() {
        let features = features();
        let mut realm = Realm::new();
        let area = Aabb::new(Vec3::ZERO, Vec3::new(8, 6, 1));
        let mut ctx = GenContext::new(area, 5, ProceduralInterface::new(&mut realm, &features)).unwrap();

        SimpleRoomParcels::default().apply(&mut ctx).unwrap();
        let edits = PlaceBuildings::new(["house"]).with_density(1.0).apply(&mut ctx).unwrap();

        // Only the hut fits an 8x6 parcel; its 4x3 footprint starts at (2, 1).
        assert_eq!(edits.tiles.len(), 12);
        let min_x = edits.tiles.iter().map(|t| t.pos.x).min();
        let min_y = edits.tiles.iter().map(|t| t.pos.y).min();
        assert_eq!((min_x, min_y), (Some(2), Some(1)));
    }

    #[test]
    fn test_zero_density_places_nothing() {
        let features = features();
        let mut realm = Realm::new();
        let area = Aabb::new(Vec3::ZERO, Vec3::new(64, 64, 1));
        let mut ctx = GenContext::new(area, 5, ProceduralInterface::new(&mut realm, &features)).unwrap();
        SimpleRoomParcels::default().apply(&mut ctx).unwrap();

        let edits = PlaceBuildings::new(["house"]).with_density(0.0).apply(&mut ctx).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_no_parcels_is_noop() {
        let features = features();
        let mut realm = Realm::new();
        let area = Aabb::new(Vec3::ZERO, Vec3::new(8, 8, 1));
        let mut ctx = GenContext::new(area, 5, ProceduralInterface::new(&mut realm, &features)).unwrap();
        assert!(PlaceBuildings::new(["house"]).apply(&mut ctx).unwrap().is_empty());
    }
}
