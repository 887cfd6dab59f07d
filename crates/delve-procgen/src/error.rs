//! Generation and streaming errors.

use delve_common::GeometryError;
use delve_world::WorldError;
use thiserror::Error;

/// Errors raised by generation pipelines, blueprints and streaming.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    /// Degenerate or inverted area
    #[error("Invalid area: {0}")]
    InvalidArea(#[from] GeometryError),

    /// Streaming radius below zero
    #[error("Interest radius must be non-negative, got {0}")]
    NegativeRadius(i32),

    /// Two stages share an id
    #[error("Duplicate stage id '{0}'")]
    DuplicateStage(String),

    /// A stage requires capabilities no earlier stage provides
    #[error("Stage '{stage}' requires {missing:?} but only {available:?} are provided by earlier stages")]
    UnsatisfiedDependency {
        /// Offending stage id
        stage: String,
        /// Capabilities nobody provides
        missing: Vec<String>,
        /// Capabilities provided so far
        available: Vec<String>,
    },

    /// Blueprint id already registered
    #[error("Blueprint '{0}' already registered")]
    DuplicateBlueprint(String),

    /// Blueprint failed structural validation
    #[error("Malformed blueprint '{id}': {reason}")]
    MalformedBlueprint {
        /// Blueprint id
        id: String,
        /// What is wrong
        reason: String,
    },

    /// Blueprint legend names a tile the registry does not know
    #[error("Blueprint '{blueprint}' maps glyph '{glyph}' at ({x}, {y}) to unknown tile '{tile}'")]
    UnknownBlueprintTile {
        /// Blueprint id
        blueprint: String,
        /// Unresolved tile name
        tile: String,
        /// Legend glyph
        glyph: char,
        /// Blueprint-local column
        x: i32,
        /// Blueprint-local row
        y: i32,
    },

    /// Stage or streaming configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// World-level failure
    #[error("World error: {0}")]
    World(#[from] WorldError),
}

/// Result type for generation operations.
pub type GenResult<T> = Result<T, GenError>;
