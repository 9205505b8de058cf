//! Chunk cache with visibility-driven lifecycle.
//!
//! Chunks are created the first frame they become visible and dropped the
//! first frame they are not. There is no retention beyond the visible set:
//! a chunk that leaves and re-enters view is regenerated and re-overlaid.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use tessera_common::{ChunkCoord, OverlayError, WorldId, WorldPos};
use tracing::{debug, warn};

use crate::biome::BiomeMap;
use crate::chunk::{Chunk, ChunkGenerator};
use crate::config::WorldConfig;
use crate::entity::EntityCatalog;
use crate::overlay::{self, ChangeSource};

/// Camera view in world pixels: a centre plus the visible extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    /// View centre
    pub center: WorldPos,
    /// Visible width in world pixels (viewport width divided by zoom)
    pub width: f32,
    /// Visible height in world pixels
    pub height: f32,
}

impl ViewRect {
    /// Creates a view rectangle.
    #[must_use]
    pub const fn new(center: WorldPos, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.center.x - self.width / 2.0
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.center.x + self.width / 2.0
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.center.y - self.height / 2.0
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.center.y + self.height / 2.0
    }
}

/// Inclusive rectangle of chunk coordinates touched by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleSet {
    min: ChunkCoord,
    max: ChunkCoord,
}

impl VisibleSet {
    /// Creates a set covering `min..=max` on both axes.
    #[must_use]
    pub const fn new(min: ChunkCoord, max: ChunkCoord) -> Self {
        Self { min, max }
    }

    /// Smallest corner.
    #[must_use]
    pub const fn min(&self) -> ChunkCoord {
        self.min
    }

    /// Largest corner.
    #[must_use]
    pub const fn max(&self) -> ChunkCoord {
        self.max
    }

    /// Checks whether a chunk is in the set.
    #[must_use]
    pub const fn contains(&self, coord: ChunkCoord) -> bool {
        coord.x >= self.min.x && coord.x <= self.max.x && coord.y >= self.min.y && coord.y <= self.max.y
    }

    /// Number of chunks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as usize;
        span(self.min.x, self.max.x) * span(self.min.y, self.max.y)
    }

    /// Checks whether the set holds no chunk.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the chunks row by row.
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| ChunkCoord::new(x, y)))
    }
}

/// Chunks overlapped by a view, camera rotation ignored.
///
/// View edges are floored to tiles, then tiles are floored to chunks, so a
/// view edge lying exactly on a chunk boundary includes the next chunk.
#[must_use]
pub fn visible_chunks(config: &WorldConfig, view: &ViewRect) -> VisibleSet {
    let tile_size = config.tile_size as f32;
    let to_chunk = |px: f32| {
        let tile = (px / tile_size).floor() as i32;
        tile.div_euclid(config.chunk_size as i32)
    };
    VisibleSet::new(
        ChunkCoord::new(to_chunk(view.left()), to_chunk(view.top())),
        ChunkCoord::new(to_chunk(view.right()), to_chunk(view.bottom())),
    )
}

/// In-world chunks within a Chebyshev radius of a pixel position.
#[must_use]
pub fn chunks_in_radius(config: &WorldConfig, pos: WorldPos, radius: u32) -> Vec<ChunkCoord> {
    let center = config.chunk_of_pixel(pos);
    let r = radius as i32;
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let coord = ChunkCoord::new(center.x.saturating_add(dx), center.y.saturating_add(dy));
            if coord.is_within(config.chunk_count) {
                out.push(coord);
            }
        }
    }
    out
}

/// Builds chunks: procedural generation followed by the stored overlay.
pub struct ChunkLoader<'a> {
    generator: ChunkGenerator<'a>,
    catalog: &'a EntityCatalog,
    changes: Option<(&'a dyn ChangeSource, WorldId)>,
}

impl<'a> ChunkLoader<'a> {
    /// Creates a loader that only generates.
    #[must_use]
    pub fn new(config: &'a WorldConfig, biomes: &'a BiomeMap, catalog: &'a EntityCatalog) -> Self {
        Self {
            generator: ChunkGenerator::new(config, biomes, catalog),
            catalog,
            changes: None,
        }
    }

    /// Reconciles every built chunk with a world's stored changes.
    #[must_use]
    pub fn with_changes(mut self, source: &'a dyn ChangeSource, world_id: WorldId) -> Self {
        self.changes = Some((source, world_id));
        self
    }

    /// Generates a chunk and applies its overlay.
    ///
    /// A failed fetch leaves procedural content in place; a malformed record
    /// fails the whole chunk.
    pub fn build(&self, coord: ChunkCoord) -> Result<Chunk, OverlayError> {
        let mut chunk = self.generator.generate(coord);
        if chunk.is_void() {
            return Ok(chunk);
        }

        if let Some((source, world_id)) = self.changes {
            match source.get_chunk_changes(world_id, coord) {
                Ok(changes) => overlay::apply(&mut chunk, &changes, self.catalog)?,
                Err(e) => {
                    warn!("Change fetch for chunk {coord} failed, keeping procedural content: {e}");
                },
            }
        }
        Ok(chunk)
    }
}

/// Chunk lifecycle counters for the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStoreStats {
    /// Chunks currently cached
    pub loaded: usize,
    /// Chunks generated since the store was created
    pub generated: u64,
    /// Chunks dropped by pruning or eviction
    pub evicted: u64,
    /// Loads aborted by a malformed overlay
    pub failed: u64,
}

/// Chunk cache keyed by chunk coordinate.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: AHashMap<ChunkCoord, Chunk>,
    generated: u64,
    evicted: u64,
    failed: u64,
}

impl ChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached chunk, building and inserting it on a miss.
    pub fn load(&mut self, coord: ChunkCoord, loader: &ChunkLoader<'_>) -> Result<&Chunk, OverlayError> {
        match self.chunks.entry(coord) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => match loader.build(coord) {
                Ok(chunk) => {
                    self.generated += 1;
                    debug!("Loaded chunk {coord}");
                    Ok(&*entry.insert(chunk))
                },
                Err(e) => {
                    self.failed += 1;
                    Err(e)
                },
            },
        }
    }

    /// Loads every chunk of a visible set.
    ///
    /// A chunk that fails is skipped and reported; the others still load.
    pub fn load_visible(
        &mut self,
        visible: &VisibleSet,
        loader: &ChunkLoader<'_>,
    ) -> Vec<(ChunkCoord, OverlayError)> {
        let mut failures = Vec::new();
        for coord in visible.iter() {
            if let Err(e) = self.load(coord, loader) {
                warn!("Skipping chunk {coord}: {e}");
                failures.push((coord, e));
            }
        }
        failures
    }

    /// Drops every chunk outside `keep`, returning how many were dropped.
    pub fn prune(&mut self, keep: &VisibleSet) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|coord, _| keep.contains(*coord));
        let dropped = before - self.chunks.len();
        if dropped > 0 {
            self.evicted += dropped as u64;
            debug!("Pruned {dropped} chunks, {} remain", self.chunks.len());
        }
        dropped
    }

    /// Drops a single chunk so the next load rebuilds it.
    pub fn evict(&mut self, coord: ChunkCoord) -> bool {
        let removed = self.chunks.remove(&coord).is_some();
        if removed {
            self.evicted += 1;
            debug!("Evicted chunk {coord}");
        }
        removed
    }

    /// Drops every chunk.
    pub fn clear(&mut self) {
        self.evicted += self.chunks.len() as u64;
        self.chunks.clear();
    }

    /// Returns a cached chunk.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Checks whether a chunk is cached.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of cached chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Checks whether no chunk is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterates cached chunks in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Iterates cached chunks of a visible set, row by row.
    pub fn visible<'s>(&'s self, visible: &VisibleSet) -> impl Iterator<Item = &'s Chunk> + 's {
        let set = *visible;
        set.iter().filter_map(move |coord| self.chunks.get(&coord))
    }

    /// Returns a snapshot of the lifecycle counters.
    #[must_use]
    pub fn stats(&self) -> ChunkStoreStats {
        ChunkStoreStats {
            loaded: self.chunks.len(),
            generated: self.generated,
            evicted: self.evicted,
            failed: self.failed,
        }
    }
}
