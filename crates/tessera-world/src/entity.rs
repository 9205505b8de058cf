//! Placed entities and the per-kind entity catalog.
//!
//! Entities are plain data. Rendering dispatches on [`EntityKind`]; nothing
//! here carries draw callbacks.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tessera_common::{StoreError, TileCoord, WorldPos};

/// Closed set of entity kinds the world knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Decorative grass tuft
    Grass,
    /// Tree (fixed-angle, collidable)
    Tree,
    /// Rock (collidable)
    Rock,
    /// Player-placed wood block
    WoodBlock,
    /// "X" marker at the world's starting position
    StartMarker,
}

impl EntityKind {
    /// Kinds produced by procedural placement, in placement order.
    pub const PROCEDURAL: [Self; 3] = [Self::Grass, Self::Tree, Self::Rock];

    /// Returns the kind's stable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Tree => "tree",
            Self::Rock => "rock",
            Self::WoodBlock => "wood_block",
            Self::StartMarker => "start_marker",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Default physical and render properties of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityDefaults {
    /// Whether the entity blocks movement
    pub collidable: bool,
    /// Collision circle radius in pixels
    pub collision_radius: f32,
    /// Screen angle in degrees when rendered upright regardless of camera rotation
    pub fixed_screen_angle: Option<f32>,
    /// Draw offset from the base position in pixels
    pub render_offset: (f32, f32),
    /// Nominal sprite size in pixels
    pub size: f32,
}

impl EntityDefaults {
    /// Built-in defaults for a kind.
    #[must_use]
    pub const fn builtin(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Grass => Self {
                collidable: false,
                collision_radius: 0.0,
                fixed_screen_angle: None,
                render_offset: (0.0, 0.0),
                size: 32.0,
            },
            EntityKind::Tree => Self {
                collidable: true,
                collision_radius: 12.0,
                fixed_screen_angle: Some(0.0),
                render_offset: (0.0, -40.0),
                size: 48.0,
            },
            EntityKind::Rock => Self {
                collidable: true,
                collision_radius: 8.0,
                fixed_screen_angle: None,
                render_offset: (0.0, 0.0),
                size: 20.0,
            },
            EntityKind::WoodBlock => Self {
                collidable: true,
                collision_radius: 16.0,
                fixed_screen_angle: None,
                render_offset: (0.0, 0.0),
                size: 32.0,
            },
            EntityKind::StartMarker => Self {
                collidable: false,
                collision_radius: 0.0,
                fixed_screen_angle: None,
                render_offset: (0.0, 0.0),
                size: 36.0,
            },
        }
    }
}

/// Lookup of per-kind defaults, seeded with the built-in values.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    overrides: AHashMap<EntityKind, EntityDefaults>,
}

impl EntityCatalog {
    /// Creates a catalog holding only built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the defaults for a kind.
    pub fn set(&mut self, kind: EntityKind, defaults: EntityDefaults) {
        self.overrides.insert(kind, defaults);
    }

    /// Returns the defaults for a kind.
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> EntityDefaults {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| EntityDefaults::builtin(kind))
    }
}

/// Custom appearance stored with a modified entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Sprite size in pixels
    pub size: f32,
    /// Upright screen angle in degrees
    pub fixed_screen_angle: f32,
    /// Horizontal draw offset in pixels
    pub draw_offset_x: f32,
    /// Vertical draw offset in pixels
    pub draw_offset_y: f32,
    /// Encoded custom image, if the player supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_image_data: Option<String>,
}

impl ImageConfig {
    /// Checks that every numeric field is usable by the renderer.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(StoreError::InvalidImageConfig(format!(
                "size must be positive, got {}",
                self.size
            )));
        }
        if !self.fixed_screen_angle.is_finite() {
            return Err(StoreError::InvalidImageConfig(
                "fixedScreenAngle must be finite".into(),
            ));
        }
        if !self.draw_offset_x.is_finite() || !self.draw_offset_y.is_finite() {
            return Err(StoreError::InvalidImageConfig(
                "draw offsets must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Metadata attached to an entity by the persistence overlay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Appearance override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    /// Unix time in milliseconds of the modification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification_time: Option<u64>,
    /// Who made the modification ("player", "system", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An entity instance living in a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedEntity {
    /// Entity kind
    pub kind: EntityKind,
    /// Base position in world pixels (also the collision centre)
    pub world_pos: WorldPos,
    /// Tile the entity stands on
    pub tile: TileCoord,
    /// Whether the entity blocks movement
    pub collidable: bool,
    /// Collision circle radius in pixels
    pub collision_radius: f32,
    /// Upright screen angle in degrees, for fixed-angle entities
    pub fixed_screen_angle: Option<f32>,
    /// Draw offset from `world_pos`, used only for rendering
    pub render_offset: (f32, f32),
    /// Overlay metadata, present only on overridden entities
    pub metadata: Option<EntityMetadata>,
}

impl PlacedEntity {
    /// Creates an entity from catalog defaults.
    #[must_use]
    pub fn new(kind: EntityKind, tile: TileCoord, world_pos: WorldPos, defaults: EntityDefaults) -> Self {
        Self {
            kind,
            world_pos,
            tile,
            collidable: defaults.collidable,
            collision_radius: defaults.collision_radius,
            fixed_screen_angle: defaults.fixed_screen_angle,
            render_offset: defaults.render_offset,
            metadata: None,
        }
    }

    /// Attaches overlay metadata, applying any appearance override.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EntityMetadata) -> Self {
        if let Some(image) = &metadata.image_config {
            self.fixed_screen_angle = Some(image.fixed_screen_angle);
            self.render_offset = (image.draw_offset_x, image.draw_offset_y);
        }
        self.metadata = Some(metadata);
        self
    }

    /// Checks whether the entity is drawn upright regardless of camera rotation.
    #[must_use]
    pub const fn is_fixed_angle(&self) -> bool {
        self.fixed_screen_angle.is_some()
    }

    /// Returns the position the renderer draws at.
    #[must_use]
    pub fn render_pos(&self) -> WorldPos {
        WorldPos::new(
            self.world_pos.x + self.render_offset.0,
            self.world_pos.y + self.render_offset.1,
        )
    }
}
