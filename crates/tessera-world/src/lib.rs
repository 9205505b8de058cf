//! # Tessera World
//!
//! Chunked 2D tile world engine.
//!
//! This crate handles:
//! - Seeded hashing and per-tile entity placement
//! - Biome classification and chunk generation
//! - Visibility-driven chunk caching
//! - Reconciling stored player changes with generated chunks
//! - Broad-phase collision and fixed-angle draw ordering

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod chunk;
pub mod collision;
pub mod config;
pub mod depth;
pub mod entity;
pub mod geometry;
pub mod hashing;
pub mod overlay;
pub mod placement;
pub mod store;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::biome::*;
    pub use crate::chunk::*;
    pub use crate::collision::*;
    pub use crate::config::*;
    pub use crate::depth::*;
    pub use crate::entity::*;
    pub use crate::overlay::{
        ChangeSource, CellChangeRecord, ChunkChanges, MemoryChangeStore, PersistedEntity,
    };
    pub use crate::placement::*;
    pub use crate::store::*;
    pub use crate::world::*;
}

pub use prelude::*;
