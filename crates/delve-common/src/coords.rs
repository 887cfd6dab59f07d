//! Coordinate types for world, chunk, and local positions.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, GeometryResult};

/// Default chunk edge length in tiles.
pub const CHUNK_SIZE: i32 = 32;

/// Default chunk depth (z extent) in tiles.
pub const CHUNK_DEPTH: i32 = 1;

/// Integer 3D vector for world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate (layer)
    pub z: i32,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a new vector.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector on the z = 0 layer.
    #[must_use]
    pub const fn xy(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aabb {
    /// Inclusive lower corner
    pub min: Vec3,
    /// Exclusive upper corner
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box without validating it.
    ///
    /// Use [`Aabb::try_new`] for boxes that come from callers.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a box, rejecting inverted or empty extents on any axis.
    pub fn try_new(min: Vec3, max: Vec3) -> GeometryResult<Self> {
        let aabb = Self { min, max };
        aabb.validate()?;
        Ok(aabb)
    }

    /// Returns an error if the box is empty on any axis.
    pub fn validate(&self) -> GeometryResult<()> {
        if self.is_degenerate() {
            return Err(GeometryError::InvalidAabb {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Whether `min >= max` on any axis.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y || self.min.z >= self.max.z
    }

    /// Extent along x.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.max.x.saturating_sub(self.min.x)
    }

    /// Extent along y.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.max.y.saturating_sub(self.min.y)
    }

    /// Extent along z.
    #[must_use]
    pub const fn depth(&self) -> i32 {
        self.max.z.saturating_sub(self.min.z)
    }

    /// Iterates `(x, y)` row by row over the x/y footprint.
    pub fn iter_xy(&self) -> impl Iterator<Item = (i32, i32)> {
        let (min, max) = (self.min, self.max);
        (min.y..max.y).flat_map(move |y| (min.x..max.x).map(move |x| (x, y)))
    }

    /// Iterates every position, z-major then row by row.
    pub fn iter_xyz(&self) -> impl Iterator<Item = Vec3> {
        let (min, max) = (self.min, self.max);
        (min.z..max.z).flat_map(move |z| {
            (min.y..max.y).flat_map(move |y| (min.x..max.x).map(move |x| Vec3::new(x, y, z)))
        })
    }

    /// Grows the box by `n` on every side in x and y. Z is left untouched.
    /// Bounds saturate at the `i32` range.
    #[must_use]
    pub const fn expand(&self, n: i32) -> Self {
        Self {
            min: Vec3::new(
                self.min.x.saturating_sub(n),
                self.min.y.saturating_sub(n),
                self.min.z,
            ),
            max: Vec3::new(
                self.max.x.saturating_add(n),
                self.max.y.saturating_add(n),
                self.max.z,
            ),
        }
    }

    /// Whether `pos` lies inside the box.
    #[must_use]
    pub const fn contains(&self, pos: Vec3) -> bool {
        self.min.x <= pos.x
            && pos.x < self.max.x
            && self.min.y <= pos.y
            && pos.y < self.max.y
            && self.min.z <= pos.z
            && pos.z < self.max.z
    }

    /// Whether the two boxes share at least one position.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({}, {})", self.min, self.max)
    }
}

/// Chunk key (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    /// X coordinate in chunk space
    pub cx: i32,
    /// Y coordinate in chunk space
    pub cy: i32,
    /// Z coordinate in chunk space
    pub cz: i32,
}

impl ChunkKey {
    /// Creates a new chunk key.
    #[must_use]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.cx, self.cy, self.cz)
    }
}

/// Local coordinate within a chunk, each axis in `[0, size)` / `[0, depth)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalCoord {
    /// X coordinate within chunk
    pub lx: i32,
    /// Y coordinate within chunk
    pub ly: i32,
    /// Z coordinate within chunk
    pub lz: i32,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(lx: i32, ly: i32, lz: i32) -> Self {
        Self { lx, ly, lz }
    }
}

/// Chunk dimensions used for all coordinate conversions of one realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDims {
    /// Edge length in x and y
    pub size: i32,
    /// Extent in z
    pub depth: i32,
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self {
            size: CHUNK_SIZE,
            depth: CHUNK_DEPTH,
        }
    }
}

impl ChunkDims {
    /// Creates chunk dimensions. Both values must be positive.
    pub fn new(size: i32, depth: i32) -> GeometryResult<Self> {
        if size <= 0 || depth <= 0 {
            return Err(GeometryError::InvalidChunkDims { size, depth });
        }
        Ok(Self { size, depth })
    }

    /// Number of tiles stored per chunk.
    #[must_use]
    pub const fn volume(self) -> usize {
        (self.size as usize) * (self.size as usize) * (self.depth as usize)
    }

    /// Chunk key containing a world position (floor division).
    #[must_use]
    pub const fn key_of(self, pos: Vec3) -> ChunkKey {
        ChunkKey {
            cx: pos.x.div_euclid(self.size),
            cy: pos.y.div_euclid(self.size),
            cz: pos.z.div_euclid(self.depth),
        }
    }

    /// Converts a world position into its chunk key and local offset.
    #[must_use]
    pub const fn world_to_chunk(self, pos: Vec3) -> (ChunkKey, LocalCoord) {
        let key = self.key_of(pos);
        let local = LocalCoord {
            lx: pos.x.rem_euclid(self.size),
            ly: pos.y.rem_euclid(self.size),
            lz: pos.z.rem_euclid(self.depth),
        };
        (key, local)
    }

    /// Converts a chunk key and local offset back into world space.
    pub fn chunk_to_world(self, key: ChunkKey, local: LocalCoord) -> GeometryResult<Vec3> {
        self.check_local(local)?;
        Ok(Vec3::new(
            key.cx * self.size + local.lx,
            key.cy * self.size + local.ly,
            key.cz * self.depth + local.lz,
        ))
    }

    /// Flat index of a local coordinate: `lz * size² + ly * size + lx`.
    pub fn local_index(self, local: LocalCoord) -> GeometryResult<usize> {
        self.check_local(local)?;
        let size = self.size as usize;
        Ok(local.lz as usize * size * size + local.ly as usize * size + local.lx as usize)
    }

    /// World-space bounds of a chunk, clipped to the `i32` range.
    #[must_use]
    pub const fn chunk_bounds(self, key: ChunkKey) -> Aabb {
        let min = Vec3::new(
            key.cx.saturating_mul(self.size),
            key.cy.saturating_mul(self.size),
            key.cz.saturating_mul(self.depth),
        );
        Aabb::new(
            min,
            Vec3::new(
                min.x.saturating_add(self.size),
                min.y.saturating_add(self.size),
                min.z.saturating_add(self.depth),
            ),
        )
    }

    /// All chunk keys whose bounds overlap `area`.
    #[must_use]
    pub fn keys_overlapping(self, area: &Aabb) -> Vec<ChunkKey> {
        if area.is_degenerate() {
            return Vec::new();
        }
        let lo = self.key_of(area.min);
        let hi = self.key_of(Vec3::new(area.max.x - 1, area.max.y - 1, area.max.z - 1));
        let mut keys = Vec::new();
        for cz in lo.cz..=hi.cz {
            for cy in lo.cy..=hi.cy {
                for cx in lo.cx..=hi.cx {
                    keys.push(ChunkKey::new(cx, cy, cz));
                }
            }
        }
        keys
    }

    fn check_local(self, local: LocalCoord) -> GeometryResult<()> {
        let in_bounds = (0..self.size).contains(&local.lx)
            && (0..self.size).contains(&local.ly)
            && (0..self.depth).contains(&local.lz);
        if in_bounds {
            Ok(())
        } else {
            Err(GeometryError::LocalOutOfBounds {
                local,
                size: self.size,
                depth: self.depth,
            })
        }
    }
}
