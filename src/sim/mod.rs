//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (pool order for updates, entity id for snapshots)
//! - No rendering, clock or platform dependencies

pub mod bullet;
pub mod collision;
pub mod direction;
pub mod entities;
pub mod grid;
pub mod level;
pub mod level_manager;
pub mod pool;
pub mod snapshot;
pub mod state;
pub mod tank;
pub mod tick;

pub use bullet::{Bullet, BulletSpawn};
pub use collision::{CollisionModel, CollisionResult, TankBody, TankRef};
pub use direction::Direction;
pub use entities::EntitySet;
pub use grid::{GridBounds, GridPos, Rect, TileCell, TileDamage, TileGrid, TileKind};
pub use level::{Difficulty, Level, LevelInfo, LevelPack, LevelSource, PowerUpKind};
pub use level_manager::{Advance, FailReason, LevelCounters, LevelEvent, LevelManager, LevelOutcome};
pub use pool::{ObjectPool, PoolHandle, PoolStats, Poolable};
pub use snapshot::{EntityView, Snapshot, SpriteKind};
pub use state::{GamePhase, PhaseEvent, StateMachine};
pub use tank::{EnemyKind, Side, Tank, TankKind, TankSpawn};
pub use tick::{PlayerCommand, StepOutcome, World};
