//! Entity set: the player tank, pooled enemies and pooled bullets
//!
//! Holds per-level counters too, since they change together with the
//! entities (a destroyed enemy is a released tank plus a score bump).

use super::bullet::{Bullet, BulletSpawn};
use super::collision::{TankBody, TankRef};
use super::direction::Direction;
use super::grid::{GridBounds, GridPos};
use super::level::Level;
use super::level_manager::LevelCounters;
use super::pool::{ObjectPool, PoolHandle, Poolable};
use super::tank::{EnemyKind, Side, Tank, TankKind, TankSpawn};
use crate::error::Result;
use crate::settings::PoolSizing;

#[derive(Debug, Clone)]
pub struct EntitySet {
    pub player: Tank,
    pub lives: u32,
    pub enemies: ObjectPool<Tank>,
    pub bullets: ObjectPool<Bullet>,
    pub score: u32,
    /// Enemies still queued for this level
    pub enemies_to_spawn: u32,
    pub enemies_destroyed: u32,
    pub base_destroyed: bool,
    pub spawn_timer: f32,
    player_spawn: TankSpawn,
    next_id: u32,
}

impl EntitySet {
    pub fn new(bullet_pool: PoolSizing, enemy_pool: PoolSizing) -> Self {
        Self {
            player: Tank::dormant(),
            lives: 0,
            enemies: ObjectPool::new("enemy", Tank::dormant, enemy_pool.initial, enemy_pool.max),
            bullets: ObjectPool::new(
                "bullet",
                Bullet::dormant,
                bullet_pool.initial,
                bullet_pool.max,
            ),
            score: 0,
            enemies_to_spawn: 0,
            enemies_destroyed: 0,
            base_destroyed: false,
            spawn_timer: 0.0,
            player_spawn: TankSpawn {
                id: 0,
                kind: TankKind::Player,
                cell: GridPos::default(),
                direction: Direction::default(),
                bounds: GridBounds::default(),
                tile_size: crate::consts::TILE_SIZE,
            },
            next_id: 1,
        }
    }

    /// Allocate a fresh entity id (stable ordering key for snapshots)
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Start a new run: score and lives back to their initial values
    pub fn reset_session(&mut self, lives: u32) {
        self.clear();
        self.lives = lives;
        self.score = 0;
        self.next_id = 1;
    }

    /// Deactivate everything
    pub fn clear(&mut self) {
        self.player.set_active(false);
        self.enemies.clear();
        self.bullets.clear();
    }

    /// Place entities for `level`. Score and lives carry over.
    pub fn load_level(&mut self, level: &Level, bounds: GridBounds, tile_size: f32) {
        self.clear();
        self.enemies.shrink();
        self.bullets.shrink();

        self.enemies_to_spawn = level.enemies.total;
        self.enemies_destroyed = 0;
        self.base_destroyed = false;
        // First enemy arrives on the first step
        self.spawn_timer = level.enemies.spawn_interval;

        let id = self.next_id();
        self.player_spawn = TankSpawn {
            id,
            kind: TankKind::Player,
            cell: level.player_start.cell(),
            direction: level.player_start.direction,
            bounds,
            tile_size,
        };
        self.respawn_player();
    }

    /// Put the player back at the level start with a fresh weapon
    pub fn respawn_player(&mut self) {
        self.player.set_active(true);
        self.player.reset(self.player_spawn);
    }

    /// Spawn an enemy at `cell`, facing down
    pub fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        cell: GridPos,
        tile_size: f32,
    ) -> Result<PoolHandle> {
        let id = self.next_id();
        let handle = self.enemies.acquire(TankSpawn {
            id,
            kind: TankKind::Enemy(kind),
            cell,
            direction: Direction::Down,
            bounds: self.player_spawn.bounds,
            tile_size,
        })?;
        self.enemies_to_spawn = self.enemies_to_spawn.saturating_sub(1);
        log::debug!("enemy {} ({:?}) spawned at ({}, {})", id, kind, cell.col, cell.row);
        Ok(handle)
    }

    /// Fire from `shooter` unless its bullet allowance is used up
    ///
    /// Returns whether a bullet was created.
    pub fn fire(&mut self, shooter: &Tank, tile_size: f32) -> Result<bool> {
        if self.bullets_in_flight(shooter.id) >= shooter.max_bullets {
            return Ok(false);
        }
        let id = self.next_id();
        self.bullets.acquire(BulletSpawn {
            id,
            pos: shooter.center(tile_size),
            direction: shooter.direction,
            owner: shooter.side(),
            shooter: shooter.id,
            power_level: shooter.power_level,
        })?;
        Ok(true)
    }

    pub fn bullets_in_flight(&self, shooter: u32) -> usize {
        self.bullets
            .iter_active()
            .filter(|(_, bullet)| bullet.shooter == shooter)
            .count()
    }

    /// Collision footprints of every live tank, player first
    pub fn bodies(&self, tile_size: f32) -> Vec<TankBody> {
        let player = self.player.is_active().then(|| TankBody {
            target: TankRef::Player,
            id: self.player.id,
            side: Side::Player,
            rect: self.player.rect(tile_size),
        });
        let enemies = self.enemies.iter_active().map(|(handle, tank)| TankBody {
            target: TankRef::Enemy(handle),
            id: tank.id,
            side: Side::Enemy,
            rect: tank.rect(tile_size),
        });
        player.into_iter().chain(enemies).collect()
    }

    /// Is any live tank standing on `cell`?
    pub fn is_occupied(&self, cell: GridPos) -> bool {
        (self.player.is_active() && self.player.cell == cell)
            || self.enemies.iter_active().any(|(_, tank)| tank.cell == cell)
    }

    pub fn enemies_remaining(&self) -> u32 {
        self.enemies_to_spawn + self.enemies.active_count() as u32
    }

    pub fn counters(&self) -> LevelCounters {
        LevelCounters {
            enemies_to_spawn: self.enemies_to_spawn,
            enemies_on_field: self.enemies.active_count() as u32,
            player_lives: self.lives,
            base_destroyed: self.base_destroyed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TILE_SIZE;
    use crate::sim::level::tests::arena;

    fn loaded() -> EntitySet {
        let level = arena(1);
        let bounds = level.build_grid().unwrap().bounds();
        let mut set = EntitySet::new(PoolSizing::new(2, 4), PoolSizing::new(1, 2));
        set.reset_session(3);
        set.load_level(&level, bounds, TILE_SIZE);
        set
    }

    #[test]
    fn test_load_level_places_player() {
        let set = loaded();
        assert!(set.player.is_active());
        assert_eq!(set.player.cell, GridPos::new(2, 4));
        assert_eq!(set.enemies_to_spawn, 2);
        assert_eq!(set.counters().player_lives, 3);
    }

    #[test]
    fn test_fire_respects_bullet_allowance() {
        let mut set = loaded();
        let player = set.player.clone();
        assert!(set.fire(&player, TILE_SIZE).unwrap());
        assert!(!set.fire(&player, TILE_SIZE).unwrap());

        set.player.upgrade_weapon();
        set.player.upgrade_weapon();
        let player = set.player.clone();
        assert!(set.fire(&player, TILE_SIZE).unwrap());
        assert_eq!(set.bullets_in_flight(player.id), 2);
    }

    #[test]
    fn test_spawn_enemy_updates_counters() {
        let mut set = loaded();
        let handle = set.spawn_enemy(EnemyKind::Fast, GridPos::new(0, 0), TILE_SIZE).unwrap();
        assert_eq!(set.enemies_to_spawn, 1);
        assert_eq!(set.enemies_remaining(), 2);
        assert!(set.is_occupied(GridPos::new(0, 0)));
        assert_eq!(set.enemies.get(handle).unwrap().direction, Direction::Down);

        let bodies = set.bodies(TILE_SIZE);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].target, TankRef::Player);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut set = loaded();
        let a = set.next_id();
        let b = set.next_id();
        assert!(b > a);
        assert!(a > set.player.id);
    }
}
