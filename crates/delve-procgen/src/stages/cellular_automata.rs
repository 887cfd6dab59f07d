//! Cellular automata smoothing.

use std::collections::BTreeSet;

use delve_common::{Aabb, Vec3};
use delve_world::{Edits, TileId};

use crate::context::GenContext;
use crate::error::GenResult;
use crate::stage::{capabilities, Stage};

/// Smooths committed terrain with the 8-neighbour wall-count rule.
///
/// Each iteration reads only the previous iteration's state. A cell becomes
/// wall when at least `wall_threshold` neighbours are walls, otherwise
/// floor. Neighbours outside the area count as walls, except on the first
/// iteration with `read_from_realm`, where they are read from the world.
#[derive(Debug, Clone)]
pub struct CellularAutomata {
    wall: String,
    floor: String,
    iterations: usize,
    wall_threshold: usize,
    read_from_realm: bool,
}

impl CellularAutomata {
    /// Creates the stage with 4 iterations and a threshold of 5.
    pub fn new(wall: impl Into<String>, floor: impl Into<String>) -> Self {
        Self {
            wall: wall.into(),
            floor: floor.into(),
            iterations: 4,
            wall_threshold: 5,
            read_from_realm: false,
        }
    }

    /// Sets the iteration count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the neighbour count needed for a wall.
    #[must_use]
    pub fn with_wall_threshold(mut self, wall_threshold: usize) -> Self {
        self.wall_threshold = wall_threshold;
        self
    }

    /// Reads out-of-area neighbours from the world on the first iteration.
    #[must_use]
    pub fn with_read_from_realm(mut self, read_from_realm: bool) -> Self {
        self.read_from_realm = read_from_realm;
        self
    }
}

/// Row-major tile grid over an area's x/y extent.
struct Grid {
    area: Aabb,
    cells: Vec<TileId>,
}

impl Grid {
    fn get(&self, x: i32, y: i32) -> Option<TileId> {
        if x < self.area.min.x || x >= self.area.max.x || y < self.area.min.y || y >= self.area.max.y {
            return None;
        }
        let index = (y - self.area.min.y) * self.area.width() + (x - self.area.min.x);
        self.cells.get(index as usize).copied()
    }
}

impl Stage for CellularAutomata {
    fn id(&self) -> &str {
        "cellular_automata"
    }

    fn provides(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn requires(&self) -> BTreeSet<String> {
        capabilities(["terrain"])
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits> {
        let wall = ctx.tile_id(&self.wall)?;
        let floor = ctx.tile_id(&self.floor)?;
        let area = ctx.area();
        let z = area.min.z;

        let mut current = Grid {
            area,
            cells: area.iter_xy().map(|(x, y)| ctx.api().read_tile(Vec3::new(x, y, z))).collect(),
        };

        for iteration in 0..self.iterations {
            let from_realm = self.read_from_realm && iteration == 0;
            let cells = area
                .iter_xy()
                .map(|(x, y)| {
                    let mut walls = 0;
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if dx == 0 && dy == 0 {
                                continue;
                            }
                            let (nx, ny) = (x + dx, y + dy);
                            let neighbour = current.get(nx, ny).unwrap_or_else(|| {
                                if from_realm {
                                    ctx.api().read_tile(Vec3::new(nx, ny, z))
                                } else {
                                    wall
                                }
                            });
                            if neighbour == wall {
                                walls += 1;
                            }
                        }
                    }
                    if walls >= self.wall_threshold {
                        wall
                    } else {
                        floor
                    }
                })
                .collect();
            current = Grid { area, cells };
        }

        let mut edits = Edits::new();
        for ((x, y), tile) in area.iter_xy().zip(current.cells) {
            edits.add_tile(Vec3::new(x, y, z), tile);
        }
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProceduralInterface;
    use crate::features::FeatureRegistry;
    use delve_world::Realm;

    fn run(stage: &CellularAutomata, realm: &mut Realm, area: Aabb) -> Edits {
        let features = FeatureRegistry::new();
        let mut ctx = GenContext::new(area, 0, ProceduralInterface::new(realm, &features)).unwrap();
        stage.apply(&mut ctx).unwrap()
    }

    fn fill(realm: &mut Realm, area: Aabb, tile: TileId) {
        let mut edits = Edits::new();
        for (x, y) in area.iter_xy() {
            edits.add_tile(Vec3::xy(x, y), tile);
        }
        assert!(realm.commit(&edits).is_clean());
    }

    #[test]
    fn test_isolated_wall_becomes_floor() {
        let mut realm = Realm::new();
        let wall = realm.tiles().id("wall").unwrap();
        let floor = realm.tiles().id("floor").unwrap();
        let area = Aabb::new(Vec3::ZERO, Vec3::new(5, 5, 1));
        fill(&mut realm, area, floor);
        realm.write_tile(Vec3::xy(2, 2), wall).unwrap();

        let stage = CellularAutomata::new("wall", "floor")
            .with_iterations(1)
            .with_wall_threshold(4);
        let edits = run(&stage, &mut realm, area);

        assert_eq!(edits.tiles.len(), 25);
        let centre = edits.tiles.iter().find(|t| t.pos == Vec3::xy(2, 2)).unwrap();
        assert_eq!(centre.tile, floor);
        // Corners see five out-of-area walls.
        let corner = edits.tiles.iter().find(|t| t.pos == Vec3::xy(0, 0)).unwrap();
        assert_eq!(corner.tile, wall);
        // A cell next to the centre only counts the centre, read from the previous state.
        let beside = edits.tiles.iter().find(|t| t.pos == Vec3::xy(2, 1)).unwrap();
        assert_eq!(beside.tile, floor);
    }

    #[test]
    fn test_read_from_realm_on_first_iteration() {
        let mut realm = Realm::new();
        let wall = realm.tiles().id("wall").unwrap();
        let floor = realm.tiles().id("floor").unwrap();
        // Floor everywhere around, so out-of-area neighbours are floor, not wall.
        fill(&mut realm, Aabb::new(Vec3::xy(-1, -1), Vec3::new(4, 4, 1)), floor);
        let area = Aabb::new(Vec3::ZERO, Vec3::new(3, 3, 1));

        let walls_outside = CellularAutomata::new("wall", "floor")
            .with_iterations(1)
            .with_wall_threshold(3);
        let corner = |edits: &Edits| edits.tiles.iter().find(|t| t.pos == Vec3::ZERO).map(|t| t.tile);
        assert_eq!(corner(&run(&walls_outside, &mut realm, area)), Some(wall));

        let realm_outside = walls_outside.with_read_from_realm(true);
        assert_eq!(corner(&run(&realm_outside, &mut realm, area)), Some(floor));
    }

    #[test]
    fn test_zero_iterations_copies_state() {
        let mut realm = Realm::new();
        let area = Aabb::new(Vec3::ZERO, Vec3::new(2, 2, 1));
        let stage = CellularAutomata::new("wall", "floor").with_iterations(0);
        let edits = run(&stage, &mut realm, area);
        assert!(edits.tiles.iter().all(|t| t.tile == realm.void_tile()));
    }
}
