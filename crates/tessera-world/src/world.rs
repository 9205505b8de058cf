//! The world facade and its per-frame pipeline.
//!
//! A frame runs `begin_frame` (visible set, chunk loads, collision rebuild),
//! then any number of `resolve_move` calls, then `fixed_angle_draw_order`
//! for rendering, then `end_frame` (prune). Each stage reads what the
//! previous one produced; nothing else touches the chunk store.

use serde::Serialize;
use tessera_common::{ChunkCoord, ConfigError, OverlayError, WorldId, WorldPos};
use tracing::{debug, info};

use crate::biome::BiomeMap;
use crate::chunk::Chunk;
use crate::collision::{CollisionConfig, CollisionIndex, CollisionStats, MoveResult};
use crate::config::WorldConfig;
use crate::depth::{sort_fixed_angle, ScreenProjector};
use crate::entity::{EntityCatalog, PlacedEntity};
use crate::overlay::ChangeSource;
use crate::store::{
    chunks_in_radius, visible_chunks, ChunkLoader, ChunkStore, ChunkStoreStats, ViewRect,
    VisibleSet,
};

/// Summary of the chunk work done by `begin_frame`.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Chunks in the visible set
    pub visible: usize,
    /// Chunks generated this frame
    pub generated: u64,
    /// Chunks that failed to load, with the reason
    pub failures: Vec<(ChunkCoord, OverlayError)>,
}

/// A world-space line segment of the tile grid overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    /// Start point
    pub start: WorldPos,
    /// End point
    pub end: WorldPos,
}

/// Snapshot of world dimensions and cache state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldInfo {
    /// World edge in pixels
    pub pixel_size: f32,
    /// World edge in tiles
    pub tiles_per_edge: u32,
    /// Tile edge in pixels
    pub tile_size: u32,
    /// World seed
    pub seed: u64,
    /// World edge in chunks
    pub chunk_count: u32,
    /// Chunk edge in tiles
    pub chunk_size: u32,
    /// Chunks currently cached
    pub loaded_chunks: usize,
}

impl std::fmt::Display for WorldInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "World size: {0}x{0} px", self.pixel_size)?;
        writeln!(f, "Tiles: {0}x{0} at {1} px", self.tiles_per_edge, self.tile_size)?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(
            f,
            "Chunks: {0}x{0} of {1} tiles",
            self.chunk_count, self.chunk_size
        )?;
        write!(f, "Loaded chunks: {}", self.loaded_chunks)
    }
}

/// A running world: configuration, generated chunks, and collision state.
pub struct World {
    config: WorldConfig,
    biomes: BiomeMap,
    catalog: EntityCatalog,
    store: ChunkStore,
    collision: CollisionIndex,
    changes: Option<(Box<dyn ChangeSource>, WorldId)>,
    visible: Option<VisibleSet>,
    show_grid: bool,
}

impl World {
    /// Builds a world from a configuration and entity catalog.
    pub fn new(config: WorldConfig, catalog: EntityCatalog) -> Result<Self, ConfigError> {
        Self::with_collision(config, catalog, CollisionConfig::default())
    }

    /// Builds a world with explicit collision settings.
    pub fn with_collision(
        config: WorldConfig,
        catalog: EntityCatalog,
        collision: CollisionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let collision = CollisionIndex::new(collision)?;
        let biomes = BiomeMap::build(&config);
        info!(
            "World initialised: seed {}, {}x{} chunks of {} tiles",
            config.seed, config.chunk_count, config.chunk_count, config.chunk_size
        );
        Ok(Self {
            config,
            biomes,
            catalog,
            store: ChunkStore::new(),
            collision,
            changes: None,
            visible: None,
            show_grid: false,
        })
    }

    /// Reconciles chunks with a persisted world's stored changes from now on.
    ///
    /// Already cached chunks keep their content until they are reloaded.
    pub fn attach_change_source(&mut self, world_id: WorldId, source: Box<dyn ChangeSource>) {
        info!("Attached change source for {world_id}");
        self.changes = Some((source, world_id));
    }

    /// Re-initialises with a new configuration: biomes are rebuilt and every
    /// cached chunk is dropped.
    pub fn init(&mut self, config: WorldConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.biomes = BiomeMap::build(&config);
        self.config = config;
        self.reset_caches();
        info!("World re-initialised with seed {}", self.config.seed);
        Ok(())
    }

    /// Changes the seed. Every cached chunk is dropped; biomes are kept.
    pub fn set_seed(&mut self, seed: u64) -> Result<(), ConfigError> {
        self.config = self.config.with_seed(seed)?;
        self.reset_caches();
        info!("World seed set to {seed}, chunk cache cleared");
        Ok(())
    }

    fn reset_caches(&mut self) {
        self.store.clear();
        self.collision.clear();
        self.visible = None;
    }

    /// Current seed.
    #[must_use]
    pub const fn get_seed(&self) -> u64 {
        self.config.seed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Biome classification.
    #[must_use]
    pub const fn biomes(&self) -> &BiomeMap {
        &self.biomes
    }

    /// Returns a chunk, loading it if needed.
    pub fn load(&mut self, coord: ChunkCoord) -> Result<&Chunk, OverlayError> {
        let loader = Self::loader(&self.config, &self.biomes, &self.catalog, self.changes.as_ref());
        self.store.load(coord, &loader)
    }

    /// Drops and reloads a chunk, picking up changes stored since it loaded.
    pub fn refresh_chunk(&mut self, coord: ChunkCoord) -> Result<&Chunk, OverlayError> {
        self.store.evict(coord);
        self.load(coord)
    }

    fn loader<'a>(
        config: &'a WorldConfig,
        biomes: &'a BiomeMap,
        catalog: &'a EntityCatalog,
        changes: Option<&'a (Box<dyn ChangeSource>, WorldId)>,
    ) -> ChunkLoader<'a> {
        let loader = ChunkLoader::new(config, biomes, catalog);
        match changes {
            Some((source, world_id)) => loader.with_changes(&**source, *world_id),
            None => loader,
        }
    }

    /// Starts a frame: loads every chunk the view touches and rebuilds the
    /// collision grid over every cached chunk.
    ///
    /// Chunks left over from the previous frame are still cached until
    /// `end_frame` prunes them, so they stay solid for this frame's moves.
    pub fn begin_frame(&mut self, view: &ViewRect) -> FrameReport {
        let visible = visible_chunks(&self.config, view);
        let generated_before = self.store.stats().generated;

        let loader = Self::loader(&self.config, &self.biomes, &self.catalog, self.changes.as_ref());
        let failures = self.store.load_visible(&visible, &loader);
        self.collision.rebuild(self.store.iter());
        self.visible = Some(visible);

        FrameReport {
            visible: visible.len(),
            generated: self.store.stats().generated - generated_before,
            failures,
        }
    }

    /// Resolves a circular mover against this frame's collision grid.
    #[must_use]
    pub fn resolve_move(&self, start: WorldPos, end: WorldPos, radius: f32) -> MoveResult {
        self.collision.resolve_move(start, end, radius)
    }

    /// Fixed-angle entities of the visible chunks, in draw order.
    pub fn fixed_angle_draw_order<P>(&self, projector: &P, reference_angle: f32) -> Vec<&PlacedEntity>
    where
        P: ScreenProjector + ?Sized,
    {
        let Some(visible) = self.visible else {
            return Vec::new();
        };
        let entities = self
            .store
            .visible(&visible)
            .flat_map(|chunk| chunk.fixed_angle_entities());
        sort_fixed_angle(entities, projector, reference_angle)
    }

    /// Ends a frame: drops every chunk outside the frame's visible set.
    pub fn end_frame(&mut self) -> usize {
        let Some(visible) = self.visible else {
            return 0;
        };
        let dropped = self.store.prune(&visible);
        debug!("Frame ended with {} chunks loaded", self.store.len());
        dropped
    }

    /// The visible set of the current frame.
    #[must_use]
    pub const fn visible_set(&self) -> Option<VisibleSet> {
        self.visible
    }

    /// A cached chunk.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.store.get(coord)
    }

    /// Number of cached chunks.
    #[must_use]
    pub fn chunk_count_loaded(&self) -> usize {
        self.store.len()
    }

    /// Chunk lifecycle counters.
    #[must_use]
    pub fn chunk_stats(&self) -> ChunkStoreStats {
        self.store.stats()
    }

    /// Collision grid counters.
    #[must_use]
    pub fn collision_stats(&self) -> CollisionStats {
        self.collision.stats()
    }

    /// Mutable access to the collision settings.
    pub fn collision_mut(&mut self) -> &mut CollisionIndex {
        &mut self.collision
    }

    /// In-world chunks within `radius` chunks of a pixel position.
    #[must_use]
    pub fn chunks_in_radius(&self, pos: WorldPos, radius: u32) -> Vec<ChunkCoord> {
        chunks_in_radius(&self.config, pos, radius)
    }

    /// Flips the tile grid overlay, returning the new state.
    pub fn toggle_grid_overlay(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        info!("Grid overlay {}", if self.show_grid { "on" } else { "off" });
        self.show_grid
    }

    /// Whether the tile grid overlay is shown.
    #[must_use]
    pub const fn grid_overlay_visible(&self) -> bool {
        self.show_grid
    }

    /// Tile grid lines covering a view, snapped outward to tile edges.
    ///
    /// Lines span the view exactly; vertical lines come first.
    #[must_use]
    pub fn grid_lines(&self, view: &ViewRect) -> Vec<GridLine> {
        let tile = self.config.tile_size as f32;
        let (left, right, top, bottom) = (view.left(), view.right(), view.top(), view.bottom());
        if ![left, right, top, bottom].iter().all(|v| v.is_finite()) {
            return Vec::new();
        }

        let steps = |lo: f32, hi: f32| {
            let first = (lo / tile).floor() as i64;
            let last = (hi / tile).ceil() as i64;
            (first..=last).map(move |i| i as f32 * tile)
        };

        let vertical = steps(left, right).map(|x| GridLine {
            start: WorldPos::new(x, top),
            end: WorldPos::new(x, bottom),
        });
        let horizontal = steps(top, bottom).map(|y| GridLine {
            start: WorldPos::new(left, y),
            end: WorldPos::new(right, y),
        });
        vertical.chain(horizontal).collect()
    }

    /// Dimensions and cache state.
    #[must_use]
    pub fn world_info(&self) -> WorldInfo {
        WorldInfo {
            pixel_size: self.config.world_pixel_size(),
            tiles_per_edge: self.config.tiles_per_edge(),
            tile_size: self.config.tile_size,
            seed: self.config.seed,
            chunk_count: self.config.chunk_count,
            chunk_size: self.config.chunk_size,
            loaded_chunks: self.store.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::entity::EntityKind;
    use crate::overlay::{MemoryChangeStore, PersistedEntity};
    use tessera_common::CellCoord;

    struct Flat;

    impl ScreenProjector for Flat {
        fn world_to_screen(&self, pos: WorldPos, _reference_angle: f32) -> (f32, f32) {
            (pos.x, pos.y)
        }
    }

    fn world() -> World {
        let config = WorldConfig::new(12345, 16, 32, 4, 0.5).expect("valid config");
        World::new(config, EntityCatalog::new()).expect("valid world")
    }

    /// View covering exactly chunks (0,0) to (1,1).
    fn home_view() -> ViewRect {
        ViewRect::new(WorldPos::new(256.0, 256.0), 512.0, 512.0)
    }

    #[test]
    fn test_frame_pipeline_loads_and_prunes() {
        let mut world = world();
        let report = world.begin_frame(&home_view());
        assert_eq!(report.visible, 4);
        assert_eq!(report.generated, 4);
        assert!(report.failures.is_empty());
        assert_eq!(world.chunk_count_loaded(), 4);
        assert_eq!(world.end_frame(), 0);

        let far = ViewRect::new(WorldPos::new(1800.0, 1800.0), 100.0, 100.0);
        let report = world.begin_frame(&far);
        assert_eq!(report.visible, 1);
        assert_eq!(world.chunk_count_loaded(), 5);
        assert_eq!(world.end_frame(), 4);
        assert_eq!(world.chunk_count_loaded(), 1);
        assert!(world.chunk(ChunkCoord::new(3, 3)).is_some());
    }

    #[test]
    fn test_collision_uses_frame_chunks() {
        let mut world = world();
        world.begin_frame(&home_view());
        let stats = world.collision_stats();
        assert!(stats.colliding > 0);
        assert!(stats.total >= stats.colliding);

        // seed 12345 puts a tree on tile (3, 0), centre (112, 16)
        let start = WorldPos::new(112.0, 80.0);
        let blocked = world.resolve_move(start, WorldPos::new(112.0, 20.0), 10.0);
        assert!(blocked.blocked);
        assert_eq!(blocked.pos, start);
    }

    #[test]
    fn test_collision_keeps_previous_frame_chunks_until_pruned() {
        let mut world = world();
        world.begin_frame(&home_view());
        world.end_frame();

        let far = ViewRect::new(WorldPos::new(1800.0, 1800.0), 100.0, 100.0);
        world.begin_frame(&far);
        let start = WorldPos::new(112.0, 80.0);
        let target = WorldPos::new(112.0, 20.0);
        assert!(world.resolve_move(start, target, 10.0).blocked);

        world.end_frame();
        world.begin_frame(&far);
        assert!(!world.resolve_move(start, target, 10.0).blocked);
    }

    #[test]
    fn test_set_seed_clears_cache_and_keeps_biomes() {
        let mut world = world();
        world.begin_frame(&home_view());
        let before = world.chunk(ChunkCoord::new(0, 0)).map(|c| c.tiles().to_vec());

        world.set_seed(999).expect("valid seed");
        assert_eq!(world.get_seed(), 999);
        assert_eq!(world.chunk_count_loaded(), 0);
        assert_eq!(world.collision_stats(), CollisionStats::default());
        assert_eq!(world.biomes().plains_limit(), 2);

        let after = world.load(ChunkCoord::new(0, 0)).expect("loads").tiles().to_vec();
        assert_ne!(before, Some(after));
        assert!(world.set_seed(u64::MAX).is_err());
        assert_eq!(world.get_seed(), 999);
    }

    #[test]
    fn test_init_rebuilds_biomes() {
        let mut world = world();
        world.load(ChunkCoord::new(0, 0)).expect("loads");
        let config = WorldConfig::new(1, 16, 32, 8, 0.25).expect("valid config");
        world.init(config).expect("valid config");
        assert_eq!(world.biomes().plains_limit(), 2);
        assert_eq!(world.biomes().len(), 64);
        assert_eq!(world.chunk_count_loaded(), 0);
    }

    #[test]
    fn test_stored_change_reaches_loaded_chunk() {
        let mut world = world();
        let id = WorldId::from_raw(11);
        let store = Rc::new(RefCell::new(MemoryChangeStore::new()));
        world.attach_change_source(id, Box::new(Rc::clone(&store)));

        let origin = ChunkCoord::new(0, 0);
        let cell = CellCoord::new(5, 5);
        assert_eq!(world.load(origin).expect("loads").entities_at(cell).count(), 0);

        store.borrow_mut().add_entity_to_cell(
            id,
            origin,
            cell,
            PersistedEntity::plain(EntityKind::WoodBlock),
        );
        // cached chunk is untouched until refreshed
        assert_eq!(world.load(origin).expect("loads").entities_at(cell).count(), 0);

        let chunk = world.refresh_chunk(origin).expect("reloads");
        let kinds: Vec<_> = chunk.entities_at(cell).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntityKind::WoodBlock]);
    }

    #[test]
    fn test_fixed_angle_draw_order_covers_visible_trees() {
        let mut world = world();
        assert!(world.fixed_angle_draw_order(&Flat, 0.0).is_empty());

        world.begin_frame(&home_view());
        let order = world.fixed_angle_draw_order(&Flat, 0.0);
        assert!(!order.is_empty());
        assert!(order.iter().all(|e| e.kind == EntityKind::Tree));
        assert!(order
            .windows(2)
            .all(|pair| pair[0].world_pos.y <= pair[1].world_pos.y));
    }

    #[test]
    fn test_grid_overlay_lines() {
        let mut world = world();
        assert!(world.toggle_grid_overlay());
        assert!(world.grid_overlay_visible());

        let view = ViewRect::new(WorldPos::new(50.0, 40.0), 60.0, 40.0);
        let lines = world.grid_lines(&view);
        // x from 20 to 80 -> 0, 32, 64, 96; y from 20 to 60 -> 0, 32, 64
        assert_eq!(lines.len(), 7);
        assert_eq!(
            lines[0],
            GridLine {
                start: WorldPos::new(0.0, 20.0),
                end: WorldPos::new(0.0, 60.0),
            }
        );
        assert_eq!(lines[6].start, WorldPos::new(20.0, 64.0));
        assert!(!world.toggle_grid_overlay());
    }

    #[test]
    fn test_world_info() {
        let mut world = world();
        world.load(ChunkCoord::new(1, 1)).expect("loads");
        let info = world.world_info();
        assert_eq!(info.pixel_size, 2048.0);
        assert_eq!(info.tiles_per_edge, 64);
        assert_eq!(info.loaded_chunks, 1);
        let text = info.to_string();
        assert!(text.contains("Seed: 12345"));
        assert!(text.contains("Chunks: 4x4 of 16 tiles"));
    }

    #[test]
    fn test_chunks_in_radius_uses_world_bounds() {
        let world = world();
        assert_eq!(world.chunks_in_radius(WorldPos::new(2040.0, 2040.0), 2).len(), 9);
    }
}
