//! Coordinate types for chunk, tile, cell, and pixel positions.
//!
//! The world is a square grid of chunks; each chunk is a square grid of
//! tiles; each tile is `tile_size` pixels on a side. Tile and chunk
//! coordinates are signed so that positions left of or above the origin
//! still map to a well-defined (if out-of-world) chunk.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the tile at this chunk's top-left corner.
    #[must_use]
    pub const fn origin_tile(self, chunk_size: u32) -> TileCoord {
        TileCoord {
            x: self.x * chunk_size as i32,
            y: self.y * chunk_size as i32,
        }
    }

    /// Returns the pixel position of this chunk's top-left corner.
    #[must_use]
    pub fn world_origin(self, chunk_size: u32, tile_size: u32) -> WorldPos {
        let span = chunk_size as f32 * tile_size as f32;
        WorldPos::new(self.x as f32 * span, self.y as f32 * span)
    }

    /// Returns the global tile addressed by a cell of this chunk.
    #[must_use]
    pub const fn tile_at(self, cell: CellCoord, chunk_size: u32) -> TileCoord {
        let origin = self.origin_tile(chunk_size);
        TileCoord {
            x: origin.x + cell.x as i32,
            y: origin.y + cell.y as i32,
        }
    }

    /// Checks whether the chunk lies inside a square world of `chunk_count` chunks.
    #[must_use]
    pub const fn is_within(self, chunk_count: u32) -> bool {
        let count = chunk_count as i64;
        self.x >= 0 && self.y >= 0 && (self.x as i64) < count && (self.y as i64) < count
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Global tile coordinate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i32,
    /// Y coordinate in tile space
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the tile containing a pixel position.
    #[must_use]
    pub fn from_world_pos(pos: WorldPos, tile_size: u32) -> Self {
        let size = tile_size as f32;
        Self {
            x: (pos.x / size).floor() as i32,
            y: (pos.y / size).floor() as i32,
        }
    }

    /// Converts to the chunk containing this tile.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            y: self.y.div_euclid(size),
        }
    }

    /// Converts to the cell coordinate local to the containing chunk.
    #[must_use]
    pub const fn to_cell_coord(self, chunk_size: u32) -> CellCoord {
        let size = chunk_size as i32;
        CellCoord {
            x: self.x.rem_euclid(size) as u32,
            y: self.y.rem_euclid(size) as u32,
        }
    }

    /// Returns the pixel position of the tile's centre.
    #[must_use]
    pub fn center(self, tile_size: u32) -> WorldPos {
        let size = tile_size as f32;
        WorldPos::new(
            self.x as f32 * size + size / 2.0,
            self.y as f32 * size + size / 2.0,
        )
    }
}

/// Cell coordinate local to a chunk (0 to chunk_size-1 on each axis).
///
/// Cells are the key used by persisted change records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct CellCoord {
    /// X coordinate within chunk
    pub x: u32,
    /// Y coordinate within chunk
    pub y: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Checks whether the cell addresses a tile inside a chunk of the given size.
    #[must_use]
    pub const fn is_within(self, chunk_size: u32) -> bool {
        self.x < chunk_size && self.y < chunk_size
    }

    /// Converts to linear index for array access.
    #[must_use]
    pub const fn to_index(self, chunk_size: u32) -> usize {
        (self.y as usize) * (chunk_size as usize) + (self.x as usize)
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_index(index: usize, chunk_size: u32) -> Self {
        let size = chunk_size as usize;
        Self {
            x: (index % size) as u32,
            y: (index / size) as u32,
        }
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Position in world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct WorldPos {
    /// X position in pixels
    pub x: f32,
    /// Y position in pixels
    pub y: f32,
}

impl WorldPos {
    /// Creates a new world position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the distance to another position.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Checks that both components are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for WorldPos {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}
