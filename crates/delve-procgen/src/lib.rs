//! # Delve Procgen
//!
//! Deterministic, staged world generation and chunk streaming.
//!
//! This crate provides:
//! - `GenContext` with per-area, per-namespace RNG streams
//! - A typed blackboard for stage-to-stage data
//! - The `Stage` trait and a dependency-checked `Pipeline`
//! - ASCII blueprints and a tag-indexed feature registry
//! - Built-in terrain, smoothing, parcel, building and scatter stages
//! - `ChunkManager`, which caches generated regions and activates chunks
//!   around an observer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod blackboard;
pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod lru;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod stream;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::blackboard::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::error::*;
    pub use crate::features::*;
    pub use crate::lru::*;
    pub use crate::pipeline::*;
    pub use crate::stage::*;
    pub use crate::stages::*;
    pub use crate::stream::*;
}

pub use prelude::*;
