//! Broad-phase circular collision over a uniform spatial grid.
//!
//! The index is rebuilt from scratch every frame from the loaded chunks and
//! never patched incrementally. Movement is rejection-only: a blocked move
//! stays at its start position, there is no sliding along obstacles.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tessera_common::{ConfigError, TileCoord, WorldPos};
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::entity::{EntityKind, PlacedEntity};

/// Default grid cell edge in pixels.
pub const DEFAULT_GRID_SIZE: f32 = 64.0;

/// Collision system settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// When false every move passes
    pub enabled: bool,
    /// Grid cell edge in pixels
    pub grid_size: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl CollisionConfig {
    /// Checks the grid size is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.grid_size.is_finite() || self.grid_size <= 0.0 {
            return Err(ConfigError::InvalidGridSize(self.grid_size));
        }
        Ok(())
    }
}

/// Snapshot of a collidable entity taken at rebuild time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBody {
    /// Entity kind
    pub kind: EntityKind,
    /// Tile the entity stands on
    pub tile: TileCoord,
    /// Collision centre
    pub pos: WorldPos,
    /// Collision radius
    pub radius: f32,
}

impl CollisionBody {
    fn from_entity(entity: &PlacedEntity) -> Self {
        Self {
            kind: entity.kind,
            tile: entity.tile,
            pos: entity.world_pos,
            radius: entity.collision_radius,
        }
    }

    /// Checks whether a circle overlaps this body.
    #[must_use]
    pub fn overlaps(&self, center: WorldPos, radius: f32) -> bool {
        center.distance(self.pos) < radius + self.radius
    }
}

/// Outcome of a movement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    /// Where the mover ends up
    pub pos: WorldPos,
    /// Whether the move was rejected
    pub blocked: bool,
}

/// Collision index counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollisionStats {
    /// Entities scanned by the last rebuild
    pub total: usize,
    /// Collidable entities indexed by the last rebuild
    pub colliding: usize,
    /// Occupied grid cells
    pub grid_cells: usize,
}

/// Uniform grid of collidable bodies keyed by `(floor(x/grid), floor(y/grid))`.
#[derive(Debug, Clone, Default)]
pub struct CollisionIndex {
    config: CollisionConfig,
    grid: AHashMap<(i32, i32), Vec<CollisionBody>>,
    scanned: usize,
    indexed: usize,
    max_radius: f32,
}

impl CollisionIndex {
    /// Creates an empty index.
    pub fn new(config: CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "Collision index ready: grid {}px, enabled {}",
            config.grid_size, config.enabled
        );
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn config(&self) -> CollisionConfig {
        self.config
    }

    /// Enables or disables move rejection.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        info!(
            "Collision detection {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Flips move rejection, returning the new state.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.config.enabled);
        self.config.enabled
    }

    /// Changes the grid cell size. Takes effect at the next rebuild.
    pub fn set_grid_size(&mut self, grid_size: f32) -> Result<(), ConfigError> {
        let config = CollisionConfig {
            grid_size,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        self.clear();
        Ok(())
    }

    fn cell_of(&self, pos: WorldPos) -> (i32, i32) {
        let grid = self.config.grid_size;
        ((pos.x / grid).floor() as i32, (pos.y / grid).floor() as i32)
    }

    /// Empties the grid.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.scanned = 0;
        self.indexed = 0;
        self.max_radius = 0.0;
    }

    /// Rebuilds the grid from every collidable entity of the given chunks.
    ///
    /// Entities with a non-finite position or radius are skipped.
    pub fn rebuild<'c>(&mut self, chunks: impl IntoIterator<Item = &'c Chunk>) {
        self.clear();
        for chunk in chunks {
            for entity in chunk.entities() {
                self.scanned += 1;
                if !entity.collidable
                    || !entity.world_pos.is_finite()
                    || !entity.collision_radius.is_finite()
                {
                    continue;
                }
                let body = CollisionBody::from_entity(entity);
                self.max_radius = self.max_radius.max(body.radius);
                let key = self.cell_of(body.pos);
                self.grid.entry(key).or_default().push(body);
                self.indexed += 1;
            }
        }
        debug!(
            "Rebuilt collision grid: {} collidable of {} entities in {} cells",
            self.indexed,
            self.scanned,
            self.grid.len()
        );
    }

    /// Returns every body whose circle overlaps the query circle.
    ///
    /// Scans the 3x3 grid neighbourhood of the centre, widened only when the
    /// query radius plus the largest indexed radius exceeds one cell. A
    /// non-finite query finds nothing.
    #[must_use]
    pub fn query_circle(&self, center: WorldPos, radius: f32) -> Vec<CollisionBody> {
        if !center.is_finite() || !radius.is_finite() || self.grid.is_empty() {
            return Vec::new();
        }

        let reach = ((radius.max(0.0) + self.max_radius) / self.config.grid_size).ceil();
        let ring = reach.max(1.0);
        let span = 2.0 * f64::from(ring) + 1.0;
        let candidates: Box<dyn Iterator<Item = &CollisionBody> + '_> =
            if span * span > self.grid.len() as f64 {
                Box::new(self.grid.values().flatten())
            } else {
                let ring = ring as i32;
                let (cx, cy) = self.cell_of(center);
                Box::new(
                    (cy.saturating_sub(ring)..=cy.saturating_add(ring))
                        .flat_map(move |gy| {
                            (cx.saturating_sub(ring)..=cx.saturating_add(ring)).map(move |gx| (gx, gy))
                        })
                        .filter_map(|key| self.grid.get(&key))
                        .flatten(),
                )
            };

        candidates
            .filter(|body| body.overlaps(center, radius))
            .copied()
            .collect()
    }

    /// Checks whether a circle touches any body.
    #[must_use]
    pub fn is_blocked(&self, center: WorldPos, radius: f32) -> bool {
        !self.query_circle(center, radius).is_empty()
    }

    /// Moves a circle from `start` to `end` unless the destination overlaps a body.
    #[must_use]
    pub fn resolve_move(&self, start: WorldPos, end: WorldPos, radius: f32) -> MoveResult {
        if self.config.enabled && self.is_blocked(end, radius) {
            debug!(
                "Movement blocked from ({}, {}) to ({}, {})",
                start.x, start.y, end.x, end.y
            );
            return MoveResult {
                pos: start,
                blocked: true,
            };
        }
        MoveResult {
            pos: end,
            blocked: false,
        }
    }

    /// Returns the index counters.
    #[must_use]
    pub fn stats(&self) -> CollisionStats {
        CollisionStats {
            total: self.scanned,
            colliding: self.indexed,
            grid_cells: self.grid.len(),
        }
    }
}
