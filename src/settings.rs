//! Runtime configuration
//!
//! Loaded from JSON; every field is optional and falls back to the defaults
//! below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Result, SimError};

/// Pre-allocated and maximum entity counts for one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSizing {
    pub initial: usize,
    /// 0 = unbounded
    pub max: usize,
}

impl PoolSizing {
    pub const fn new(initial: usize, max: usize) -> Self {
        Self { initial, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Loop ===
    /// Simulation step in seconds
    pub fixed_delta: f64,
    /// Per-frame clamp on wall-clock time in seconds
    pub max_delta: f64,
    /// Blend rendering between the last two snapshots
    pub interpolate: bool,

    // === Levels ===
    pub start_level: u32,
    /// Wrap to level 1 after the last level instead of ending the run
    pub loop_levels: bool,

    // === Simulation ===
    /// RNG seed; identical seeds and inputs replay identically
    pub seed: u64,
    pub tile_size: f32,
    pub player_lives: u32,
    pub bullet_pool: PoolSizing,
    pub enemy_pool: PoolSizing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fixed_delta: FIXED_DELTA,
            max_delta: MAX_DELTA,
            interpolate: true,

            start_level: 1,
            loop_levels: false,

            seed: 0x7a4b_a7e1,
            tile_size: TILE_SIZE,
            player_lives: PLAYER_LIVES,
            bullet_pool: PoolSizing::new(BULLET_POOL_INITIAL, BULLET_POOL_MAX),
            enemy_pool: PoolSizing::new(ENEMY_POOL_INITIAL, ENEMY_POOL_MAX),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(SimError::InvalidSettings(reason.to_string()));

        if !(self.fixed_delta.is_finite() && self.fixed_delta > 0.0) {
            return invalid("fixed_delta must be positive");
        }
        if !self.max_delta.is_finite() || self.max_delta < self.fixed_delta {
            return invalid("max_delta must be at least fixed_delta");
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return invalid("tile_size must be positive");
        }
        if self.start_level == 0 {
            return invalid("start_level is 1-based");
        }
        if self.player_lives == 0 {
            return invalid("player_lives must be at least 1");
        }
        for (name, pool) in [("bullet_pool", self.bullet_pool), ("enemy_pool", self.enemy_pool)] {
            if pool.max != 0 && pool.initial > pool.max {
                return Err(SimError::InvalidSettings(format!(
                    "{name}: initial {} exceeds max {}",
                    pool.initial, pool.max
                )));
            }
        }
        Ok(())
    }
}
