//! Chunk data structure and procedural generation.

use std::time::SystemTime;

use tessera_common::{CellCoord, ChunkCoord, TileCoord, WorldPos};
use tracing::debug;

use crate::biome::{BiomeLabel, BiomeMap};
use crate::config::WorldConfig;
use crate::entity::{EntityCatalog, EntityKind, PlacedEntity};
use crate::hashing::{simple_hash, tile_key};
use crate::placement::PlacementPolicy;

/// A single tile of background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Global tile coordinate
    pub coord: TileCoord,
    /// Seeded hash driving background variation
    pub hash: u32,
}

impl Tile {
    /// Checks whether the renderer draws a background patch on this tile.
    #[must_use]
    pub const fn has_patch(&self, biome: BiomeLabel) -> bool {
        biome.has_patch(self.hash)
    }
}

/// A generated chunk of the world.
///
/// Chunks are never serialized: dropping one discards it, and reloading
/// regenerates it from the seed plus the persisted overlay.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: ChunkCoord,
    chunk_size: u32,
    tile_size: u32,
    world_origin: WorldPos,
    biome: BiomeLabel,
    tiles: Vec<Tile>,
    entities: Vec<PlacedEntity>,
    generated_at: SystemTime,
}

impl Chunk {
    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the chunk edge in tiles.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Returns the tile edge in pixels.
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Returns the pixel position of the top-left corner.
    #[must_use]
    pub const fn world_origin(&self) -> WorldPos {
        self.world_origin
    }

    /// Returns the chunk's biome.
    #[must_use]
    pub const fn biome(&self) -> BiomeLabel {
        self.biome
    }

    /// Returns the tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Returns the entities in generation order.
    #[must_use]
    pub fn entities(&self) -> &[PlacedEntity] {
        &self.entities
    }

    /// Mutable access for overlay reconciliation.
    pub(crate) fn entities_mut(&mut self) -> &mut Vec<PlacedEntity> {
        &mut self.entities
    }

    /// Returns when this chunk was generated.
    #[must_use]
    pub const fn generated_at(&self) -> SystemTime {
        self.generated_at
    }

    /// Checks whether the chunk lies outside the world and holds nothing.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Returns a tile by local cell.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<&Tile> {
        if !cell.is_within(self.chunk_size) {
            return None;
        }
        self.tiles.get(cell.to_index(self.chunk_size))
    }

    /// Returns the pixel centre of a local cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> WorldPos {
        self.coord.tile_at(cell, self.chunk_size).center(self.tile_size)
    }

    /// Returns the local cell a tile falls in, if it belongs to this chunk.
    #[must_use]
    pub fn cell_of(&self, tile: TileCoord) -> Option<CellCoord> {
        (tile.to_chunk_coord(self.chunk_size) == self.coord)
            .then(|| tile.to_cell_coord(self.chunk_size))
    }

    /// Iterates the entities standing in a cell.
    pub fn entities_at(&self, cell: CellCoord) -> impl Iterator<Item = &PlacedEntity> + '_ {
        self.entities
            .iter()
            .filter(move |e| self.cell_of(e.tile) == Some(cell))
    }

    /// Iterates the entities drawn upright regardless of camera rotation.
    pub fn fixed_angle_entities(&self) -> impl Iterator<Item = &PlacedEntity> + '_ {
        self.entities.iter().filter(|e| e.is_fixed_angle())
    }
}

/// Deterministic chunk generator over a borrowed world state.
pub struct ChunkGenerator<'a> {
    config: &'a WorldConfig,
    biomes: &'a BiomeMap,
    catalog: &'a EntityCatalog,
    policy: PlacementPolicy,
}

impl<'a> ChunkGenerator<'a> {
    /// Creates a generator for the current seed.
    #[must_use]
    pub fn new(config: &'a WorldConfig, biomes: &'a BiomeMap, catalog: &'a EntityCatalog) -> Self {
        Self {
            config,
            biomes,
            catalog,
            policy: PlacementPolicy::new(config.seed),
        }
    }

    /// Generates a chunk from the seed alone, without any overlay.
    ///
    /// Chunks outside the world square are void: no tiles, no entities.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> Chunk {
        let config = self.config;
        let size = config.chunk_size;
        let mut chunk = Chunk {
            coord,
            chunk_size: size,
            tile_size: config.tile_size,
            world_origin: coord.world_origin(size, config.tile_size),
            biome: self.biomes.label_or_default(coord),
            tiles: Vec::new(),
            entities: Vec::new(),
            generated_at: SystemTime::now(),
        };

        if !coord.is_within(config.chunk_count) {
            debug!("Chunk {coord} is outside the world, generating void");
            return chunk;
        }

        chunk.tiles.reserve((size as usize) * (size as usize));
        let origin = coord.origin_tile(size);
        for local_y in 0..size as i32 {
            for local_x in 0..size as i32 {
                let tile = TileCoord::new(origin.x + local_x, origin.y + local_y);
                chunk.tiles.push(Tile {
                    coord: tile,
                    hash: simple_hash(&tile_key(config.seed, tile.x, tile.y)),
                });
                self.place_entities(tile, &mut chunk.entities);
            }
        }

        let start = config.start_position();
        let start_tile = config.pixel_to_tile(start);
        if start_tile.to_chunk_coord(size) == coord {
            chunk.entities.push(PlacedEntity::new(
                EntityKind::StartMarker,
                start_tile,
                start,
                self.catalog.get(EntityKind::StartMarker),
            ));
        }

        debug!(
            "Generated chunk {coord} ({}): {} entities",
            chunk.biome,
            chunk.entities.len()
        );
        chunk
    }

    fn place_entities(&self, tile: TileCoord, out: &mut Vec<PlacedEntity>) {
        let center = tile.center(self.config.tile_size);
        for (kind, profile) in &self.config.placement_profiles {
            if self.policy.should_place(tile.x, tile.y, profile) {
                out.push(PlacedEntity::new(*kind, tile, center, self.catalog.get(*kind)));
            }
        }
    }
}
