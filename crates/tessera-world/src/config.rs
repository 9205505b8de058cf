//! World configuration and entity placement profiles.
//!
//! A configuration is validated once, when the world is built; generation
//! never re-checks it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_common::{ChunkCoord, ConfigError};

use crate::entity::EntityKind;

/// Largest seed whose decimal form the placement key reproduces exactly.
pub const MAX_SEED: u64 = (1 << 53) - 1;

/// Default world seed.
pub const DEFAULT_SEED: u64 = 12345;

/// Largest chunk edge in tiles; a chunk holds `chunk_size²` tiles.
pub const MAX_CHUNK_SIZE: u32 = 512;

/// Largest world edge in chunks; the biome map holds `chunk_count²` entries.
pub const MAX_CHUNK_COUNT: u32 = 1024;

/// Default chunk edge in tiles.
pub const DEFAULT_CHUNK_SIZE: u32 = 64;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// Default world edge in chunks.
pub const DEFAULT_CHUNK_COUNT: u32 = 64;

/// Hash-driven spawn parameters for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementProfile {
    /// Chance before variation
    pub base_chance: f64,
    /// Added to the seed before hashing, decorrelating kinds
    pub hash_salt: i64,
    /// Modulus applied to the hash for the variation term
    pub variation_mod: i64,
    /// Divisor scaling the variation term
    pub variation_div: f64,
    /// Lower clamp of the effective chance
    pub min_chance: f64,
    /// Upper clamp of the effective chance
    pub max_chance: f64,
    /// Label mixed into the hash key
    pub label: String,
}

impl PlacementProfile {
    /// Default grass profile.
    #[must_use]
    pub fn grass() -> Self {
        Self {
            base_chance: 0.01,
            hash_salt: 0,
            variation_mod: 200,
            variation_div: 1000.0,
            min_chance: 0.01,
            max_chance: 1.0,
            label: "grass".into(),
        }
    }

    /// Default tree profile.
    #[must_use]
    pub fn tree() -> Self {
        Self {
            base_chance: 0.025,
            hash_salt: 10_000,
            variation_mod: 150,
            variation_div: 1000.0,
            min_chance: 0.01,
            max_chance: 0.04,
            label: "tree".into(),
        }
    }

    /// Default rock profile.
    #[must_use]
    pub fn rock() -> Self {
        Self {
            base_chance: 0.015,
            hash_salt: 20_000,
            variation_mod: 100,
            variation_div: 1000.0,
            min_chance: 0.005,
            max_chance: 0.025,
            label: "rock".into(),
        }
    }

    /// Checks the profile can produce a well-defined chance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidProfile {
            label: self.label.clone(),
            reason: reason.to_string(),
        };

        if self.label.is_empty() {
            return Err(invalid("label must not be empty"));
        }
        if self.variation_mod <= 0 {
            return Err(invalid("variation_mod must be positive"));
        }
        if !self.variation_div.is_finite() || self.variation_div == 0.0 {
            return Err(invalid("variation_div must be finite and non-zero"));
        }
        if ![self.base_chance, self.min_chance, self.max_chance]
            .iter()
            .all(|c| c.is_finite())
        {
            return Err(invalid("chances must be finite"));
        }
        if self.min_chance > self.max_chance {
            return Err(invalid("min_chance exceeds max_chance"));
        }
        Ok(())
    }
}

/// Parameters fixed for the lifetime of a world instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed
    pub seed: u64,
    /// Tiles per chunk edge
    pub chunk_size: u32,
    /// Pixels per tile edge
    pub tile_size: u32,
    /// Chunks per world edge (the world is square)
    pub chunk_count: u32,
    /// Fraction of the world width, from the west edge, that is plains
    pub biome_plains_fraction: f64,
    /// Chunk holding the starting position
    pub starting_chunk: ChunkCoord,
    /// Player speed in pixels per second used for traversal estimates
    pub traversal_speed: f32,
    /// Spawn parameters per procedural entity kind
    pub placement_profiles: BTreeMap<EntityKind, PlacementProfile>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let placement_profiles = BTreeMap::from([
            (EntityKind::Grass, PlacementProfile::grass()),
            (EntityKind::Tree, PlacementProfile::tree()),
            (EntityKind::Rock, PlacementProfile::rock()),
        ]);

        Self {
            seed: DEFAULT_SEED,
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            chunk_count: DEFAULT_CHUNK_COUNT,
            biome_plains_fraction: 0.5,
            starting_chunk: ChunkCoord::new(0, 0),
            traversal_speed: 200.0,
            placement_profiles,
        }
    }
}

impl WorldConfig {
    /// Creates a validated configuration with the default placement profiles.
    pub fn new(
        seed: u64,
        chunk_size: u32,
        tile_size: u32,
        chunk_count: u32,
        biome_plains_fraction: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            seed,
            chunk_size,
            tile_size,
            chunk_count,
            biome_plains_fraction,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with a different seed, validated.
    pub fn with_seed(&self, seed: u64) -> Result<Self, ConfigError> {
        let config = Self {
            seed,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with a replaced placement profile, validated.
    pub fn with_profile(
        &self,
        kind: EntityKind,
        profile: PlacementProfile,
    ) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        config.placement_profiles.insert(kind, profile);
        config.validate()?;
        Ok(config)
    }

    /// Checks every invariant generation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed > MAX_SEED {
            return Err(ConfigError::SeedOutOfRange {
                seed: self.seed,
                max: MAX_SEED,
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if self.chunk_count == 0 {
            return Err(ConfigError::ZeroChunkCount);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSizeTooLarge {
                chunk_size: self.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        if self.chunk_count > MAX_CHUNK_COUNT {
            return Err(ConfigError::ChunkCountTooLarge {
                chunk_count: self.chunk_count,
                max: MAX_CHUNK_COUNT,
            });
        }
        if !(0.0..=1.0).contains(&self.biome_plains_fraction) {
            return Err(ConfigError::InvalidBiomeFraction(
                self.biome_plains_fraction,
            ));
        }
        for profile in self.placement_profiles.values() {
            profile.validate()?;
        }
        Ok(())
    }

    /// World edge in tiles.
    #[must_use]
    pub const fn tiles_per_edge(&self) -> u32 {
        self.chunk_count * self.chunk_size
    }

    /// Chunk edge in pixels.
    #[must_use]
    pub fn chunk_pixel_size(&self) -> f32 {
        self.chunk_size as f32 * self.tile_size as f32
    }

    /// World edge in pixels.
    #[must_use]
    pub fn world_pixel_size(&self) -> f32 {
        self.chunk_count as f32 * self.chunk_pixel_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.placement_profiles.len(), 3);
        assert_eq!(config.world_pixel_size(), 131_072.0);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert_eq!(
            WorldConfig::new(1, 0, 32, 8, 0.5),
            Err(ConfigError::ZeroChunkSize)
        );
        assert_eq!(
            WorldConfig::new(1, 64, 0, 8, 0.5),
            Err(ConfigError::ZeroTileSize)
        );
        assert_eq!(
            WorldConfig::new(1, 64, 32, 0, 0.5),
            Err(ConfigError::ZeroChunkCount)
        );
    }

    #[test]
    fn test_rejects_out_of_range_seed() {
        let result = WorldConfig::new(MAX_SEED + 1, 64, 32, 8, 0.5);
        assert!(matches!(result, Err(ConfigError::SeedOutOfRange { .. })));
        assert!(WorldConfig::new(MAX_SEED, 64, 32, 8, 0.5).is_ok());
    }

    #[test]
    fn test_rejects_bad_fraction() {
        assert!(matches!(
            WorldConfig::new(1, 64, 32, 8, 1.5),
            Err(ConfigError::InvalidBiomeFraction(_))
        ));
        assert!(WorldConfig::new(1, 64, 32, 8, f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_oversized_chunk_count() {
        assert_eq!(
            WorldConfig::new(1, 1, 32, 46_340, 0.5),
            Err(ConfigError::ChunkCountTooLarge {
                chunk_count: 46_340,
                max: MAX_CHUNK_COUNT,
            })
        );
        assert!(WorldConfig::new(1, 1, 32, MAX_CHUNK_COUNT, 0.5).is_ok());
    }

    #[test]
    fn test_rejects_oversized_chunk_size() {
        assert_eq!(
            WorldConfig::new(1, 46_340, 32, 1, 0.5),
            Err(ConfigError::ChunkSizeTooLarge {
                chunk_size: 46_340,
                max: MAX_CHUNK_SIZE,
            })
        );
        assert!(WorldConfig::new(1, MAX_CHUNK_SIZE, 32, 1, 0.5).is_ok());
    }

    #[test]
    fn test_largest_world_fits_tile_range() {
        let config = WorldConfig::new(1, MAX_CHUNK_SIZE, 32, MAX_CHUNK_COUNT, 0.5)
            .expect("valid config");
        assert!(u64::from(config.tiles_per_edge()) <= i32::MAX as u64);
    }

    #[test]
    fn test_rejects_malformed_profile() {
        let config = WorldConfig::default();

        let mut zero_mod = PlacementProfile::tree();
        zero_mod.variation_mod = 0;
        assert!(config.with_profile(EntityKind::Tree, zero_mod).is_err());

        let mut inverted = PlacementProfile::rock();
        inverted.min_chance = 0.5;
        inverted.max_chance = 0.1;
        assert!(config.with_profile(EntityKind::Rock, inverted).is_err());

        let mut unlabeled = PlacementProfile::grass();
        unlabeled.label.clear();
        assert!(config.with_profile(EntityKind::Grass, unlabeled).is_err());
    }

    #[test]
    fn test_with_seed_keeps_other_fields() {
        let config = WorldConfig::new(7, 16, 32, 4, 0.25).expect("valid config");
        let reseeded = config.with_seed(99).expect("valid seed");
        assert_eq!(reseeded.seed, 99);
        assert_eq!(reseeded.chunk_size, 16);
        assert_eq!(reseeded.biome_plains_fraction, 0.25);
    }

    #[test]
    fn test_profiles_iterate_in_placement_order() {
        let config = WorldConfig::default();
        let kinds: Vec<_> = config.placement_profiles.keys().copied().collect();
        assert_eq!(kinds, EntityKind::PROCEDURAL.to_vec());
    }
}
