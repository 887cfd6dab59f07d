//! Error types shared by every Delve crate.

use thiserror::Error;

use crate::coords::{LocalCoord, Vec3};

/// Geometry and coordinate errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A box with `min >= max` on some axis
    #[error("Invalid AABB: min {min} must be less than max {max}")]
    InvalidAabb {
        /// Inclusive lower corner
        min: Vec3,
        /// Exclusive upper corner
        max: Vec3,
    },

    /// Non-positive chunk dimensions
    #[error("Invalid chunk dimensions: size {size}, depth {depth}")]
    InvalidChunkDims {
        /// Requested edge length
        size: i32,
        /// Requested depth
        depth: i32,
    },

    /// A local coordinate outside its chunk
    #[error("Local coordinates {local:?} out of bounds for chunk {size}x{size}x{depth}")]
    LocalOutOfBounds {
        /// Offending local coordinate
        local: LocalCoord,
        /// Chunk edge length
        size: i32,
        /// Chunk depth
        depth: i32,
    },
}

/// Result type alias for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
