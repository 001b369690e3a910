//! Tank Arena - a tile-based tank battle simulation kernel
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, grid collision, levels, world step)
//! - `game_loop`: Fixed-timestep driver with interpolated rendering
//! - `settings`: Runtime configuration
//! - `error`: Error taxonomy shared by every layer

pub mod error;
pub mod game_loop;
pub mod settings;
pub mod sim;

pub use error::{Result, SimError};
pub use game_loop::{Clock, GameLoop, InputEvent, ManualClock, Renderer, SystemClock};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const FIXED_DELTA: f64 = 1.0 / 60.0;
    /// Clamp on wall-clock time per frame to prevent a spiral of death
    pub const MAX_DELTA: f64 = 0.1;
    /// Accumulator slack so that k small frames and one big frame step alike
    pub const STEP_EPSILON: f64 = 1e-9;

    /// Speeds are authored in pixels per frame at this rate
    pub const REFERENCE_FPS: f32 = 60.0;
    /// Rendered tile size in pixels
    pub const TILE_SIZE: f32 = 33.0;

    /// Player tank
    pub const PLAYER_SPEED: f32 = 6.0;
    pub const PLAYER_LIVES: u32 = 3;

    /// Bullets
    pub const BULLET_SPEED: f32 = 12.0;
    pub const BULLET_BASE_SIZE: f32 = 8.0;
    pub const BULLET_SIZE_PER_POWER: f32 = 2.0;
    pub const MAX_POWER_LEVEL: u8 = 3;

    /// Enemy AI
    pub const ENEMY_DECISION_INTERVAL: f32 = 1.0;
    pub const ENEMY_TURN_CHANCE: f64 = 0.7;
    pub const ENEMY_STOP_CHANCE: f64 = 0.3;
    pub const ENEMY_FIRE_RANGE: f32 = 400.0;
    pub const ENEMY_SNAP_FIRE_CHANCE: f64 = 0.1;
    /// Upper bound of the random head start on a new enemy's fire timer
    pub const ENEMY_FIRE_HEAD_START: f32 = 2.0;

    /// Pool sizing (initial, max)
    pub const BULLET_POOL_INITIAL: usize = 20;
    pub const BULLET_POOL_MAX: usize = 100;
    pub const ENEMY_POOL_INITIAL: usize = 4;
    pub const ENEMY_POOL_MAX: usize = 20;
}
