//! Rotating 2D camera that follows the player.
//!
//! The view rotates with the player's heading; fixed-angle sprites are drawn
//! upright against that rotation, so their depth order is taken from the
//! rotated screen Y.

use tessera_common::WorldPos;
use tessera_world::{ScreenProjector, ViewRect};

use crate::config::{MAX_ZOOM, MIN_ZOOM};

/// 2D camera for viewing the world.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world pixels (center of view)
    pub position: WorldPos,
    /// Zoom level (1.0 = 1:1 pixel mapping)
    pub zoom: f32,
    /// View rotation in radians
    pub rotation: f32,
    /// Viewport size in screen pixels (width, height)
    pub viewport_size: (u32, u32),
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl Camera {
    /// Creates a camera at the origin with the given viewport size.
    #[must_use]
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: WorldPos::new(0.0, 0.0),
            zoom: 1.0,
            rotation: 0.0,
            viewport_size: (viewport_width, viewport_height),
        }
    }

    /// Centers the camera on a world position.
    pub fn center_on(&mut self, pos: WorldPos) {
        self.position = pos;
    }

    /// Set zoom level directly (clamped).
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom in/out by factor (clamped).
    pub fn zoom_by(&mut self, factor: f32) {
        self.set_zoom(self.zoom * factor);
    }

    /// Visible world area as an axis-aligned rectangle, rotation ignored.
    #[must_use]
    pub fn view_bounds(&self) -> ViewRect {
        ViewRect::new(
            self.position,
            self.viewport_size.0 as f32 / self.zoom,
            self.viewport_size.1 as f32 / self.zoom,
        )
    }
}

impl ScreenProjector for Camera {
    fn world_to_screen(&self, pos: WorldPos, reference_angle: f32) -> (f32, f32) {
        let dx = pos.x - self.position.x;
        let dy = pos.y - self.position.y;
        let (sin, cos) = (-reference_angle).sin_cos();
        let rx = dx * cos - dy * sin;
        let ry = dx * sin + dy * cos;
        (
            rx * self.zoom + self.viewport_size.0 as f32 / 2.0,
            ry * self.zoom + self.viewport_size.1 as f32 / 2.0,
        )
    }
}
