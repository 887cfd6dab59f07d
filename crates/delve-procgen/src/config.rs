//! Streaming configuration.

use serde::{Deserialize, Serialize};

use crate::error::{GenError, GenResult};

/// Tunables for the chunk streaming manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Tiles added on each x/y side of a request before snapping
    pub expansion_buffer: i32,
    /// Chunk edge length; must match the realm's storage
    pub chunk_size: i32,
    /// Grid that generation bounds are snapped to
    pub grid_snap_size: i32,
    /// Maximum number of generated regions remembered
    pub max_cached_regions: usize,
    /// Fraction of `max_cached_regions` at which eviction starts
    pub cleanup_threshold: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            expansion_buffer: 16,
            chunk_size: 32,
            grid_snap_size: 64,
            max_cached_regions: 1000,
            cleanup_threshold: 0.8,
        }
    }
}

impl StreamingConfig {
    /// Rejects values the streaming manager cannot work with.
    pub fn validate(&self) -> GenResult<()> {
        if self.expansion_buffer < 0 {
            return Err(GenError::InvalidConfig(format!(
                "expansion_buffer must be non-negative, got {}",
                self.expansion_buffer
            )));
        }
        if self.chunk_size <= 0 {
            return Err(GenError::InvalidConfig(format!(
                "chunk_size must be positive, got {}",
                self.chunk_size
            )));
        }
        if self.grid_snap_size <= 0 {
            return Err(GenError::InvalidConfig(format!(
                "grid_snap_size must be positive, got {}",
                self.grid_snap_size
            )));
        }
        if self.max_cached_regions == 0 {
            return Err(GenError::InvalidConfig("max_cached_regions must be positive".into()));
        }
        if !(self.cleanup_threshold > 0.0 && self.cleanup_threshold <= 1.0) {
            return Err(GenError::InvalidConfig(format!(
                "cleanup_threshold must be in (0, 1], got {}",
                self.cleanup_threshold
            )));
        }
        Ok(())
    }

    /// Cache size at which eviction runs.
    #[must_use]
    pub fn cleanup_trigger(&self) -> usize {
        (self.max_cached_regions as f64 * self.cleanup_threshold) as usize
    }

    /// Cache size eviction reduces to.
    #[must_use]
    pub const fn cleanup_target(&self) -> usize {
        self.max_cached_regions / 2
    }
}
