//! Error types for Tessera.

use thiserror::Error;

/// Top-level error type for Tessera operations.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence overlay errors
    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    /// Change store errors
    #[error("Change store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while validating world configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Seed cannot be reproduced exactly by the placement hash key
    #[error("Seed {seed} exceeds maximum of {max}")]
    SeedOutOfRange {
        /// Rejected seed
        seed: u64,
        /// Largest accepted seed
        max: u64,
    },

    /// Chunk size of zero tiles
    #[error("Chunk size must be at least one tile")]
    ZeroChunkSize,

    /// Tile size of zero pixels
    #[error("Tile size must be at least one pixel")]
    ZeroTileSize,

    /// World without chunks
    #[error("Chunk count must be at least one")]
    ZeroChunkCount,

    /// Chunk edge too large to generate
    #[error("Chunk size {chunk_size} exceeds maximum of {max} tiles")]
    ChunkSizeTooLarge {
        /// Rejected chunk size
        chunk_size: u32,
        /// Largest accepted chunk size
        max: u32,
    },

    /// World edge too large for the biome map
    #[error("Chunk count {chunk_count} exceeds maximum of {max}")]
    ChunkCountTooLarge {
        /// Rejected chunk count
        chunk_count: u32,
        /// Largest accepted chunk count
        max: u32,
    },

    /// Plains fraction outside [0, 1]
    #[error("Biome plains fraction {0} is outside [0, 1]")]
    InvalidBiomeFraction(f64),

    /// Malformed placement profile
    #[error("Invalid placement profile '{label}': {reason}")]
    InvalidProfile {
        /// Profile label
        label: String,
        /// What is wrong with it
        reason: String,
    },

    /// Collision grid cell size not positive
    #[error("Collision grid size must be positive, got {0}")]
    InvalidGridSize(f32),
}

/// Errors raised while reconciling stored cell changes with a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// Change record addresses a cell outside the chunk
    #[error("Cell ({cell_x}, {cell_y}) is outside chunk ({chunk_x}, {chunk_y}) of size {chunk_size}")]
    CellOutOfBounds {
        /// Chunk X coordinate
        chunk_x: i32,
        /// Chunk Y coordinate
        chunk_y: i32,
        /// Offending cell X
        cell_x: u32,
        /// Offending cell Y
        cell_y: u32,
        /// Tiles per chunk edge
        chunk_size: u32,
    },
}

/// Errors raised by a cell change store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Store could not answer the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Image configuration rejected by validation
    #[error("Invalid image configuration: {0}")]
    InvalidImageConfig(String),
}

/// Result type alias for Tessera operations.
pub type TesseraResult<T> = Result<T, TesseraError>;
