//! Built-in generation stages.

mod buildings;
mod cellular_automata;
mod noise_terrain;
mod scatter;

pub use buildings::{PlaceBuildings, SimpleRoomParcels};
pub use cellular_automata::CellularAutomata;
pub use noise_terrain::NoiseTerrain;
pub use scatter::ScatterSpawns;
