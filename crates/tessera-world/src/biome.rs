//! Per-chunk biome classification.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tessera_common::ChunkCoord;
use tracing::info;

use crate::config::WorldConfig;

/// Biome label assigned to a whole chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomeLabel {
    /// Grassland
    #[default]
    Plains,
    /// Sand
    Desert,
}

impl BiomeLabel {
    /// Returns the biome's stable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plains => "plains",
            Self::Desert => "desert",
        }
    }

    /// Checks whether a tile hash gets a background patch in this biome.
    ///
    /// Plains darken every fourth hash bucket, desert lightens every third.
    #[must_use]
    pub const fn has_patch(self, tile_hash: u32) -> bool {
        match self {
            Self::Plains => tile_hash % 4 == 0,
            Self::Desert => tile_hash % 3 == 0,
        }
    }
}

impl std::fmt::Display for BiomeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Chunk coordinate to biome mapping, built once per world init.
#[derive(Debug, Clone, Default)]
pub struct BiomeMap {
    labels: AHashMap<ChunkCoord, BiomeLabel>,
    plains_limit: u32,
}

impl BiomeMap {
    /// Classifies every in-world chunk: columns west of
    /// `floor(chunk_count * biome_plains_fraction)` are plains, the rest desert.
    #[must_use]
    pub fn build(config: &WorldConfig) -> Self {
        let count = config.chunk_count;
        let plains_limit = (f64::from(count) * config.biome_plains_fraction).floor() as u32;

        let mut labels = AHashMap::with_capacity((count as usize) * (count as usize));
        for y in 0..count {
            for x in 0..count {
                let label = if x < plains_limit {
                    BiomeLabel::Plains
                } else {
                    BiomeLabel::Desert
                };
                labels.insert(ChunkCoord::new(x as i32, y as i32), label);
            }
        }

        info!(
            "Biome classification complete: {} chunks, plains below x={}",
            labels.len(),
            plains_limit
        );

        Self {
            labels,
            plains_limit,
        }
    }

    /// Returns the label of an in-world chunk.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<BiomeLabel> {
        self.labels.get(&coord).copied()
    }

    /// Returns the label of any chunk, defaulting to plains outside the world.
    #[must_use]
    pub fn label_or_default(&self, coord: ChunkCoord) -> BiomeLabel {
        self.get(coord).unwrap_or_default()
    }

    /// First chunk column classified as desert.
    #[must_use]
    pub const fn plains_limit(&self) -> u32 {
        self.plains_limit
    }

    /// Number of classified chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Checks whether no chunk is classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
