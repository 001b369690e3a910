//! Tank entity (player and pooled enemies)

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::grid::{GridBounds, GridPos, Rect};
use super::pool::Poolable;
use crate::consts::*;

/// Which team an entity fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

/// Enemy tank archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    #[default]
    Basic,
    Fast,
    Power,
    Armor,
}

/// Per-archetype tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankStats {
    /// Pixels per reference frame (1/60 s)
    pub speed: f32,
    /// Hits needed to destroy
    pub armor: u8,
    /// Seconds between shots
    pub fire_rate: f32,
    /// Score awarded for destroying it
    pub points: u32,
}

impl EnemyKind {
    pub fn stats(self) -> TankStats {
        match self {
            EnemyKind::Basic => TankStats {
                speed: 2.0,
                armor: 1,
                fire_rate: 0.5,
                points: 100,
            },
            EnemyKind::Fast => TankStats {
                speed: 4.0,
                armor: 1,
                fire_rate: 0.3,
                points: 200,
            },
            EnemyKind::Power => TankStats {
                speed: 1.0,
                armor: 2,
                fire_rate: 0.8,
                points: 300,
            },
            EnemyKind::Armor => TankStats {
                speed: 1.5,
                armor: 4,
                fire_rate: 0.6,
                points: 400,
            },
        }
    }
}

/// Player or enemy of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TankKind {
    Player,
    Enemy(EnemyKind),
}

impl TankKind {
    pub fn side(self) -> Side {
        match self {
            TankKind::Player => Side::Player,
            TankKind::Enemy(_) => Side::Enemy,
        }
    }

    pub fn stats(self) -> TankStats {
        match self {
            TankKind::Player => TankStats {
                speed: PLAYER_SPEED,
                armor: 1,
                fire_rate: 0.0,
                points: 0,
            },
            TankKind::Enemy(kind) => kind.stats(),
        }
    }
}

/// Arguments for (re)spawning a tank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankSpawn {
    pub id: u32,
    pub kind: TankKind,
    pub cell: GridPos,
    pub direction: Direction,
    pub bounds: GridBounds,
    pub tile_size: f32,
}

/// A grid-locked tank
#[derive(Debug, Clone)]
pub struct Tank {
    pub id: u32,
    pub kind: TankKind,
    pub cell: GridPos,
    /// Top-left pixel position
    pub pos: Vec2,
    pub direction: Direction,
    /// Sprite rotation in degrees, follows `direction`
    pub arc: f32,
    pub bounds: GridBounds,
    /// Animation cursor, advanced on every step attempt
    pub anim_frame: u32,
    pub armor: u8,
    pub speed: f32,
    pub fire_rate: f32,
    pub points: u32,
    /// Weapon level 0-3
    pub power_level: u8,
    pub max_bullets: usize,
    /// Seconds until the next tile step is allowed
    pub move_cooldown: f32,
    pub fire_timer: f32,
    pub decision_timer: f32,
    /// Enemy AI intent to keep driving
    pub moving: bool,
    active: bool,
}

impl Tank {
    /// Pool factory: an inactive tank with placeholder fields
    pub fn dormant() -> Self {
        Self {
            id: 0,
            kind: TankKind::Enemy(EnemyKind::Basic),
            cell: GridPos::default(),
            pos: Vec2::ZERO,
            direction: Direction::Down,
            arc: Direction::Down.arc_degrees(),
            bounds: GridBounds::default(),
            anim_frame: 0,
            armor: 0,
            speed: 0.0,
            fire_rate: 0.0,
            points: 0,
            power_level: 0,
            max_bullets: 1,
            move_cooldown: 0.0,
            fire_timer: 0.0,
            decision_timer: 0.0,
            moving: false,
            active: false,
        }
    }

    /// A live tank built from spawn arguments
    pub fn spawned(spawn: TankSpawn) -> Self {
        let mut tank = Self::dormant();
        tank.set_active(true);
        tank.reset(spawn);
        tank
    }

    pub fn side(&self) -> Side {
        self.kind.side()
    }

    /// Turn to face `direction`. Returns true if the facing changed.
    pub fn face(&mut self, direction: Direction) -> bool {
        if direction == self.direction {
            return false;
        }
        self.direction = direction;
        self.arc = direction.arc_degrees();
        true
    }

    /// Seconds needed to cross one tile at this tank's speed
    pub fn move_interval(&self, tile_size: f32) -> f32 {
        if self.speed <= 0.0 {
            return f32::INFINITY;
        }
        tile_size / (self.speed * REFERENCE_FPS)
    }

    /// The next cell in the facing direction, if inside the movement bounds
    pub fn proposed_cell(&self) -> Option<GridPos> {
        let (dcol, drow) = self.direction.grid_delta();
        let next = self.cell.offset(dcol, drow);
        self.bounds.contains(next).then_some(next)
    }

    /// Commit a step to `cell`
    pub fn move_to(&mut self, cell: GridPos, tile_size: f32) {
        self.cell = cell;
        self.pos = cell.to_pixel(tile_size);
        self.move_cooldown = self.move_interval(tile_size);
    }

    pub fn rect(&self, tile_size: f32) -> Rect {
        Rect::new(self.pos, Vec2::splat(tile_size))
    }

    pub fn center(&self, tile_size: f32) -> Vec2 {
        self.pos + Vec2::splat(tile_size / 2.0)
    }

    /// Apply one hit. Returns true if the tank is destroyed.
    pub fn take_damage(&mut self) -> bool {
        self.armor = self.armor.saturating_sub(1);
        self.armor == 0
    }

    /// Raise the weapon level; level 2+ allows two bullets in flight
    pub fn upgrade_weapon(&mut self) {
        self.power_level = (self.power_level + 1).min(MAX_POWER_LEVEL);
        if self.power_level >= 2 {
            self.max_bullets = 2;
        }
    }

    pub fn reset_weapon(&mut self) {
        self.power_level = 0;
        self.max_bullets = 1;
    }
}

impl Poolable for Tank {
    type Args = TankSpawn;

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn reset(&mut self, spawn: TankSpawn) {
        let stats = spawn.kind.stats();
        self.id = spawn.id;
        self.kind = spawn.kind;
        self.cell = spawn.cell;
        self.pos = spawn.cell.to_pixel(spawn.tile_size);
        self.direction = spawn.direction;
        self.arc = spawn.direction.arc_degrees();
        self.bounds = spawn.bounds;
        self.anim_frame = 0;
        self.armor = stats.armor;
        self.speed = stats.speed;
        self.fire_rate = stats.fire_rate;
        self.points = stats.points;
        self.power_level = 0;
        self.max_bullets = 1;
        self.move_cooldown = 0.0;
        self.fire_timer = 0.0;
        self.decision_timer = 0.0;
        self.moving = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(kind: TankKind) -> TankSpawn {
        TankSpawn {
            id: 1,
            kind,
            cell: GridPos::new(2, 3),
            direction: Direction::Up,
            bounds: GridBounds {
                min: GridPos::new(0, 0),
                max: GridPos::new(4, 4),
            },
            tile_size: TILE_SIZE,
        }
    }

    #[test]
    fn test_reset_applies_spawn() {
        let tank = Tank::spawned(spawn(TankKind::Enemy(EnemyKind::Armor)));
        assert!(tank.is_active());
        assert_eq!(tank.armor, 4);
        assert_eq!(tank.points, 400);
        assert_eq!(tank.pos, Vec2::new(2.0 * TILE_SIZE, 3.0 * TILE_SIZE));
        assert_eq!(tank.arc, 270.0);
        assert_eq!(tank.side(), Side::Enemy);
    }

    #[test]
    fn test_face_updates_arc() {
        let mut tank = Tank::spawned(spawn(TankKind::Player));
        assert!(!tank.face(Direction::Up));
        assert!(tank.face(Direction::Left));
        assert_eq!(tank.arc, 180.0);
    }

    #[test]
    fn test_proposed_cell_respects_bounds() {
        let mut tank = Tank::spawned(spawn(TankKind::Player));
        assert_eq!(tank.proposed_cell(), Some(GridPos::new(2, 2)));
        tank.cell = GridPos::new(2, 0);
        assert_eq!(tank.proposed_cell(), None);
    }

    #[test]
    fn test_weapon_upgrade_caps_at_three() {
        let mut tank = Tank::spawned(spawn(TankKind::Player));
        for _ in 0..5 {
            tank.upgrade_weapon();
        }
        assert_eq!(tank.power_level, 3);
        assert_eq!(tank.max_bullets, 2);
        tank.reset_weapon();
        assert_eq!(tank.max_bullets, 1);
    }

    #[test]
    fn test_take_damage_counts_armor() {
        let mut tank = Tank::spawned(spawn(TankKind::Enemy(EnemyKind::Power)));
        assert!(!tank.take_damage());
        assert!(tank.take_damage());
    }

    #[test]
    fn test_move_interval_from_speed() {
        let tank = Tank::spawned(spawn(TankKind::Enemy(EnemyKind::Basic)));
        let expected = TILE_SIZE / (2.0 * REFERENCE_FPS);
        assert!((tank.move_interval(TILE_SIZE) - expected).abs() < 1e-6);
    }
}
