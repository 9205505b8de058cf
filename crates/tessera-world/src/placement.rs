//! Hash-driven entity placement.
//!
//! One avalanche hash per (kind, tile) feeds both the chance variation and
//! the uniform draw. The two are correlated; seeds only reproduce the same
//! world if that stays exactly so.

use crate::config::PlacementProfile;
use crate::hashing::{avalanche_hash, placement_key};

/// Decides where procedural entities spawn for a given seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPolicy {
    seed: u64,
}

impl PlacementPolicy {
    /// Creates a policy for a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Returns the seed this policy places for.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    fn hash(&self, tile_x: i32, tile_y: i32, profile: &PlacementProfile) -> u32 {
        let salted = (self.seed as i64).wrapping_add(profile.hash_salt);
        avalanche_hash(&placement_key(salted, &profile.label, tile_x, tile_y))
    }

    /// Effective spawn chance for a kind at a tile.
    #[must_use]
    pub fn chance(&self, tile_x: i32, tile_y: i32, profile: &PlacementProfile) -> f64 {
        Self::chance_for_hash(self.hash(tile_x, tile_y, profile), profile)
    }

    fn chance_for_hash(hash: u32, profile: &PlacementProfile) -> f64 {
        let modulus = profile.variation_mod;
        let bucket = i64::from(hash) % modulus - modulus.div_euclid(2);
        let variation = bucket as f64 / profile.variation_div;
        (profile.base_chance + variation)
            .min(profile.max_chance)
            .max(profile.min_chance)
    }

    /// Decides whether a kind spawns at a tile.
    #[must_use]
    pub fn should_place(&self, tile_x: i32, tile_y: i32, profile: &PlacementProfile) -> bool {
        let hash = self.hash(tile_x, tile_y, profile);
        let chance = Self::chance_for_hash(hash, profile);
        let draw = f64::from(hash % 1000) / 1000.0;
        draw < chance
    }
}
