//! World errors.

use delve_common::GeometryError;
use thiserror::Error;

use crate::tiles::TileId;

/// World and chunk errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Tile name not present in the registry
    #[error("Unknown tile name '{0}'")]
    UnknownTile(String),

    /// Tile id not present in the registry
    #[error("Unknown tile id {0}")]
    UnknownTileId(TileId),

    /// Tile id registered twice
    #[error("Tile ID {0} already registered")]
    DuplicateTileId(TileId),

    /// Tile name registered twice
    #[error("Tile name '{0}' already registered")]
    DuplicateTileName(String),

    /// No tile ids left to assign
    #[error("Tile id space exhausted")]
    TileIdsExhausted,

    /// Coordinate conversion failed
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
