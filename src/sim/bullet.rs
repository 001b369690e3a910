//! Bullet entity

use glam::Vec2;

use super::direction::Direction;
use super::grid::Rect;
use super::pool::Poolable;
use super::tank::Side;
use crate::consts::*;

/// Arguments for firing a bullet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletSpawn {
    pub id: u32,
    /// Centre pixel position
    pub pos: Vec2,
    pub direction: Direction,
    pub owner: Side,
    /// Id of the tank that fired it
    pub shooter: u32,
    pub power_level: u8,
}

/// Projectile flying in a straight cardinal line
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u32,
    /// Centre pixel position
    pub pos: Vec2,
    pub direction: Direction,
    /// Pixels per reference frame
    pub speed: f32,
    pub owner: Side,
    pub shooter: u32,
    pub power_level: u8,
    /// Side length in pixels, grows with power level
    pub size: f32,
    active: bool,
}

impl Bullet {
    pub fn dormant() -> Self {
        Self {
            id: 0,
            pos: Vec2::ZERO,
            direction: Direction::Up,
            speed: BULLET_SPEED,
            owner: Side::Player,
            shooter: 0,
            power_level: 0,
            size: BULLET_BASE_SIZE,
            active: false,
        }
    }

    /// Move along the facing direction for `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.direction.unit() * self.speed * dt * REFERENCE_FPS;
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, self.size)
    }

    pub fn is_out_of_bounds(&self, map_size: Vec2) -> bool {
        self.pos.x < 0.0 || self.pos.y < 0.0 || self.pos.x >= map_size.x || self.pos.y >= map_size.y
    }
}

impl Poolable for Bullet {
    type Args = BulletSpawn;

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn reset(&mut self, spawn: BulletSpawn) {
        self.id = spawn.id;
        self.pos = spawn.pos;
        self.direction = spawn.direction;
        self.speed = BULLET_SPEED;
        self.owner = spawn.owner;
        self.shooter = spawn.shooter;
        self.power_level = spawn.power_level.min(MAX_POWER_LEVEL);
        self.size = BULLET_BASE_SIZE + BULLET_SIZE_PER_POWER * self.power_level as f32;
    }
}
