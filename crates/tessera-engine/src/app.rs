//! Headless application loop.
//!
//! Drives the world through the per-frame pipeline with a player walking a
//! slowly turning path, the camera following and rotating with it.

use anyhow::Result;
use std::time::{Duration, Instant};
use tessera_common::{WorldId, WorldPos};
use tessera_world::{EntityCatalog, World, WorldInfo};
use tracing::{debug, info};

use crate::camera::Camera;
use crate::changes::load_changes;
use crate::config::EngineConfig;

/// Player state advanced by the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    /// Position in world pixels
    pub pos: WorldPos,
    /// Heading in radians
    pub heading: f32,
}

/// Totals gathered over a run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RunSummary {
    /// Frames simulated
    pub frames: u32,
    /// Moves rejected by collision
    pub blocked_moves: u32,
    /// Chunk loads that failed
    pub failed_chunks: usize,
    /// Largest fixed-angle draw list seen
    pub max_fixed_angle: usize,
    /// Final player position
    pub final_pos: (f32, f32),
}

/// Application state.
pub struct TesseraApp {
    config: EngineConfig,
    world: World,
    camera: Camera,
    player: Player,
    frame_time: Duration,
}

impl TesseraApp {
    /// Builds the world and places the player at the start position.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let mut world =
            World::with_collision(config.world.clone(), EntityCatalog::new(), config.collision)?;

        if let Some(path) = &config.changes_file {
            let world_id = WorldId::from_raw(config.world_id);
            let store = load_changes(path, world_id)?;
            world.attach_change_source(world_id, Box::new(store));
        }
        if config.show_grid {
            world.toggle_grid_overlay();
        }

        let start = world.config().start_position();
        let mut camera = Camera::new(config.viewport_width, config.viewport_height);
        camera.set_zoom(config.zoom);
        camera.center_on(start);

        Ok(Self {
            config,
            world,
            camera,
            player: Player {
                pos: start,
                heading: 0.0,
            },
            frame_time: Duration::ZERO,
        })
    }

    /// The world being driven.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Current player state.
    pub fn player(&self) -> Player {
        self.player
    }

    /// Runs one frame of the pipeline.
    pub fn step(&mut self, summary: &mut RunSummary) {
        let frame_start = Instant::now();

        let view = self.camera.view_bounds();
        // the store already logs each failure
        let report = self.world.begin_frame(&view);
        summary.failed_chunks += report.failures.len();

        let speed = self.world.config().traversal_speed;
        let step = speed * self.config.frame_dt;
        let target = WorldPos::new(
            self.player.pos.x + self.player.heading.cos() * step,
            self.player.pos.y + self.player.heading.sin() * step,
        );
        let result = self
            .world
            .resolve_move(self.player.pos, target, self.config.player_radius);
        if result.blocked {
            summary.blocked_moves += 1;
            // turn away from the obstacle
            self.player.heading += std::f32::consts::FRAC_PI_2;
        } else {
            self.player.pos = result.pos;
        }
        if self.world.config().is_out_of_bounds(self.player.pos) {
            self.player.pos = self.world.config().wrap(self.player.pos);
        }
        self.player.heading += self.config.turn_rate;

        self.camera.center_on(self.player.pos);
        self.camera.rotation = self.player.heading;

        let draw_order = self
            .world
            .fixed_angle_draw_order(&self.camera, self.camera.rotation);
        summary.max_fixed_angle = summary.max_fixed_angle.max(draw_order.len());
        if self.world.grid_overlay_visible() {
            debug!("Grid overlay: {} lines", self.world.grid_lines(&view).len());
        }

        let dropped = self.world.end_frame();
        summary.frames += 1;
        self.frame_time += frame_start.elapsed();

        if summary.frames % 60 == 0 {
            let stats = self.world.collision_stats();
            debug!(
                "Frame {}: {} chunks loaded ({dropped} dropped), {} collidable in {} cells",
                summary.frames,
                self.world.chunk_count_loaded(),
                stats.colliding,
                stats.grid_cells
            );
        }
    }

    /// Runs the configured number of frames.
    pub fn run_frames(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        for _ in 0..self.config.frames {
            self.step(&mut summary);
        }
        summary.final_pos = (self.player.pos.x, self.player.pos.y);
        summary
    }

    /// World dimensions and cache state.
    pub fn world_info(&self) -> WorldInfo {
        self.world.world_info()
    }

    /// Mean wall time per frame so far.
    pub fn mean_frame_time(&self, frames: u32) -> Duration {
        if frames == 0 {
            return Duration::ZERO;
        }
        self.frame_time / frames
    }
}

/// Runs the application to completion.
pub fn run(config: EngineConfig) -> Result<()> {
    let mut app = TesseraApp::new(config)?;
    info!("{}", app.world_info());

    let summary = app.run_frames();
    let chunk_stats = app.world().chunk_stats();
    info!(
        "Ran {} frames: {} blocked moves, {} chunks generated, {} evicted, mean frame {:?}",
        summary.frames,
        summary.blocked_moves,
        chunk_stats.generated,
        chunk_stats.evicted,
        app.mean_frame_time(summary.frames)
    );
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
