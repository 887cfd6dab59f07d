//! # Delve World
//!
//! World management for the Delve world generator.
//!
//! This crate handles:
//! - Tile definitions and lookup
//! - Chunk storage with deferred entity spawns
//! - Atomic, chunk-scoped application of generation edits
//! - Materializing spawns into live entities as chunks activate

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod activation;
pub mod chunk;
pub mod edits;
pub mod entities;
pub mod error;
pub mod realm;
pub mod tiles;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::activation::*;
    pub use crate::chunk::*;
    pub use crate::edits::*;
    pub use crate::entities::*;
    pub use crate::error::*;
    pub use crate::realm::*;
    pub use crate::tiles::*;
}

pub use prelude::*;
