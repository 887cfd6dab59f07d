//! # Delve Common
//!
//! Common types and utilities shared by the Delve world generator.
//!
//! This crate provides:
//! - Spatial primitives (`Vec3`, `Aabb`)
//! - Chunk coordinate math (world, chunk, local)
//! - Stable identifiers and deterministic GUID derivation
//! - Geometry error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod hash;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::hash::*;
    pub use crate::ids::*;
}

pub use prelude::*;
