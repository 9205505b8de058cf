//! Pixel, tile, and chunk conversions derived from a world configuration.

use tessera_common::{ChunkCoord, TileCoord, WorldPos};

use crate::config::WorldConfig;

impl WorldConfig {
    /// Tile containing a pixel position.
    #[must_use]
    pub fn pixel_to_tile(&self, pos: WorldPos) -> TileCoord {
        TileCoord::from_world_pos(pos, self.tile_size)
    }

    /// Pixel position of a tile's centre.
    #[must_use]
    pub fn tile_to_pixel(&self, tile: TileCoord) -> WorldPos {
        tile.center(self.tile_size)
    }

    /// Chunk containing a pixel position.
    #[must_use]
    pub fn chunk_of_pixel(&self, pos: WorldPos) -> ChunkCoord {
        self.pixel_to_tile(pos).to_chunk_coord(self.chunk_size)
    }

    /// Chunk containing a tile.
    #[must_use]
    pub const fn tile_to_chunk(&self, tile: TileCoord) -> ChunkCoord {
        tile.to_chunk_coord(self.chunk_size)
    }

    /// Top-left corner of a chunk, in pixels.
    #[must_use]
    pub fn chunk_to_pixel(&self, chunk: ChunkCoord) -> WorldPos {
        chunk.world_origin(self.chunk_size, self.tile_size)
    }

    /// Centre of the starting chunk, in pixels.
    #[must_use]
    pub fn start_position(&self) -> WorldPos {
        let span = self.chunk_pixel_size();
        WorldPos::new(
            self.starting_chunk.x as f32 * span + span / 2.0,
            self.starting_chunk.y as f32 * span + span / 2.0,
        )
    }

    /// Checks whether a pixel position lies outside the world square.
    #[must_use]
    pub fn is_out_of_bounds(&self, pos: WorldPos) -> bool {
        let size = self.world_pixel_size();
        pos.x < 0.0 || pos.x >= size || pos.y < 0.0 || pos.y >= size
    }

    /// Wraps a position that has stepped off one edge onto the opposite edge.
    ///
    /// Positions are expected to be at most one world width outside.
    #[must_use]
    pub fn wrap(&self, pos: WorldPos) -> WorldPos {
        let size = self.world_pixel_size();
        let wrap_axis = |v: f32| {
            if v < 0.0 {
                size + v
            } else if v >= size {
                v - size
            } else {
                v
            }
        };
        WorldPos::new(wrap_axis(pos.x), wrap_axis(pos.y))
    }

    /// Seconds needed to cross the world at `traversal_speed`, rounded.
    #[must_use]
    pub fn traversal_time_secs(&self) -> u32 {
        if self.traversal_speed <= 0.0 {
            return 0;
        }
        (self.world_pixel_size() / self.traversal_speed).round() as u32
    }
}
