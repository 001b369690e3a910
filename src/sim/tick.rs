//! Fixed timestep simulation step
//!
//! `World` owns the entity set, the collision model and the level manager and
//! advances them together, one constant-size step at a time. A step runs in a
//! fixed order: player, enemies, bullets, spawning, level evaluation. Level
//! transitions complete inside the step that triggers them.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{CollisionModel, CollisionResult, TankRef};
use super::direction::Direction;
use super::entities::EntitySet;
use super::grid::{GridPos, TileGrid};
use super::level::{LevelSource, PowerUpKind};
use super::level_manager::{Advance, FailReason, LevelManager, LevelOutcome};
use super::pool::Poolable;
use super::snapshot::{EntityView, Snapshot, SpriteKind};
use super::tank::{Tank, TankKind};
use crate::consts::*;
use crate::error::{Result, SimError};
use crate::settings::Settings;

/// Player intent, latched from input events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerCommand {
    /// Held movement direction, `None` when stopped
    pub direction: Option<Direction>,
    /// One-shot, cleared by the next step
    pub fire: bool,
}

/// What a step did to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The level was cleared and level `n` is now loaded
    LevelChanged(u32),
    Victory,
    Defeat(FailReason),
}

#[derive(Debug)]
pub struct World {
    entities: EntitySet,
    collision: CollisionModel,
    levels: LevelManager,
    rng: Pcg32,
    seed: u64,
    tile_size: f32,
    start_level: u32,
    player_lives: u32,
    command: PlayerCommand,
    tick: u64,
}

impl World {
    pub fn new(settings: &Settings, source: Box<dyn LevelSource>) -> Self {
        Self {
            entities: EntitySet::new(settings.bullet_pool, settings.enemy_pool),
            collision: CollisionModel::new(
                TileGrid::default(),
                GridPos::default(),
                settings.tile_size,
            ),
            levels: LevelManager::new(source, settings.loop_levels),
            rng: Pcg32::seed_from_u64(settings.seed),
            seed: settings.seed,
            tile_size: settings.tile_size,
            start_level: settings.start_level,
            player_lives: settings.player_lives,
            command: PlayerCommand::default(),
            tick: 0,
        }
    }

    /// Reset score, lives and RNG, then load the start level
    pub fn begin_session(&mut self) -> Result<()> {
        self.levels.reset();
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.tick = 0;
        self.command = PlayerCommand::default();
        self.entities.reset_session(self.player_lives);
        self.levels.start_level(self.start_level)?;
        self.load_current_level()
    }

    pub fn end_session(&mut self) {
        self.levels.teardown();
        self.entities.clear();
        self.command = PlayerCommand::default();
    }

    fn load_current_level(&mut self) -> Result<()> {
        let Some(level) = self.levels.current_level() else {
            return Err(SimError::UnknownLevel(self.levels.current_number()));
        };
        let grid = level.build_grid()?;
        let bounds = grid.bounds();
        self.collision = CollisionModel::new(grid, level.base_position.cell(), self.tile_size);
        self.entities.load_level(level, bounds, self.tile_size);
        Ok(())
    }

    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntitySet {
        &mut self.entities
    }

    pub fn collision(&self) -> &CollisionModel {
        &self.collision
    }

    pub fn levels(&self) -> &LevelManager {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut LevelManager {
        &mut self.levels
    }

    pub fn command_mut(&mut self) -> &mut PlayerCommand {
        &mut self.command
    }

    /// Steps run since the session began
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Advance the simulation by one fixed step
    ///
    /// Only fatal errors are returned; recoverable anomalies are logged and
    /// skipped for this step.
    pub fn step(&mut self, dt: f32) -> Result<StepOutcome> {
        if !self.levels.is_in_progress() {
            return Ok(StepOutcome::Continue);
        }
        self.tick += 1;

        self.update_player(dt)?;
        self.update_enemies(dt)?;
        self.update_bullets(dt)?;
        self.spawn_enemies(dt)?;
        self.levels.tick(dt);

        self.resolve_level()
    }

    fn update_player(&mut self, dt: f32) -> Result<()> {
        let fire = std::mem::take(&mut self.command.fire);
        if !self.entities.player.is_active() {
            return Ok(());
        }

        let tile = self.tile_size;
        let bodies = self.entities.bodies(tile);
        let player = &mut self.entities.player;
        player.move_cooldown = (player.move_cooldown - dt).max(0.0);

        if let Some(direction) = self.command.direction {
            // Turning and stepping happen in the same step
            player.face(direction);
            if player.move_cooldown <= 0.0 {
                player.anim_frame = player.anim_frame.wrapping_add(1);
                if let Some(target) = player.proposed_cell() {
                    if !self.collision.check_tank_move(player.id, target, &bodies).is_blocking() {
                        player.move_to(target, tile);
                    }
                }
            }
        }

        if fire {
            let shooter = self.entities.player.clone();
            self.entities.fire(&shooter, tile)?;
        }
        Ok(())
    }

    fn update_enemies(&mut self, dt: f32) -> Result<()> {
        let tile = self.tile_size;
        let player = &self.entities.player;
        let target = player.is_active().then(|| player.center(tile));

        for handle in self.entities.enemies.active_handles() {
            let bodies = self.entities.bodies(tile);
            let Some(tank) = self.entities.enemies.get_mut(handle) else {
                continue;
            };
            tank.fire_timer += dt;
            tank.decision_timer += dt;
            tank.move_cooldown = (tank.move_cooldown - dt).max(0.0);

            if tank.decision_timer > ENEMY_DECISION_INTERVAL || !tank.moving {
                if self.rng.random_bool(ENEMY_TURN_CHANCE) {
                    turn_randomly(tank, &mut self.rng);
                }
                tank.moving = self.rng.random::<f64>() > ENEMY_STOP_CHANCE;
                tank.decision_timer = 0.0;
            }

            if tank.moving && tank.move_cooldown <= 0.0 {
                tank.anim_frame = tank.anim_frame.wrapping_add(1);
                let open = tank.proposed_cell().filter(|&cell| {
                    !self
                        .collision
                        .check_tank_move(tank.id, cell, &bodies)
                        .is_blocking()
                });
                match open {
                    Some(cell) => tank.move_to(cell, tile),
                    None => turn_randomly(tank, &mut self.rng),
                }
            }

            if tank.fire_timer > tank.fire_rate && should_fire(tank, target, tile, &mut self.rng) {
                tank.fire_timer = 0.0;
                let shooter = tank.clone();
                self.entities.fire(&shooter, tile)?;
            }
        }
        Ok(())
    }

    fn update_bullets(&mut self, dt: f32) -> Result<()> {
        let tile = self.tile_size;
        let map = self.collision.map_size();
        let mut bodies = self.entities.bodies(tile);

        for handle in self.entities.bullets.active_handles() {
            let Some(bullet) = self.entities.bullets.get_mut(handle) else {
                continue;
            };
            bullet.advance(dt);
            if bullet.is_out_of_bounds(map) {
                self.entities.bullets.release(handle);
                continue;
            }

            let hit = match self.collision.check_bullet(bullet, &bodies) {
                Ok(hit) => hit,
                Err(err) if !err.is_fatal() => {
                    log::warn!("{err}; treating as no hit this step");
                    CollisionResult::None
                }
                Err(err) => return Err(err),
            };

            match hit {
                CollisionResult::None => {}
                CollisionResult::Wall { cell, .. } => {
                    self.collision.strike(cell);
                    self.entities.bullets.release(handle);
                }
                CollisionResult::Base { cell } => {
                    log::info!("base at ({}, {}) destroyed", cell.col, cell.row);
                    self.entities.base_destroyed = true;
                    self.entities.bullets.release(handle);
                }
                CollisionResult::Tank { target } => {
                    self.entities.bullets.release(handle);
                    if self.hit_tank(target) {
                        bodies = self.entities.bodies(tile);
                    }
                }
            }
        }
        Ok(())
    }

    /// Damage a tank. Returns true if the set of tank bodies changed.
    fn hit_tank(&mut self, target: TankRef) -> bool {
        match target {
            TankRef::Player => {
                let entities = &mut self.entities;
                entities.lives = entities.lives.saturating_sub(1);
                if entities.lives > 0 {
                    log::info!("player hit, {} lives left", entities.lives);
                    entities.respawn_player();
                } else {
                    log::info!("player destroyed");
                    entities.player.set_active(false);
                }
                true
            }
            TankRef::Enemy(handle) => {
                let Some(tank) = self.entities.enemies.get_mut(handle) else {
                    return false;
                };
                if !tank.take_damage() {
                    return false;
                }
                let points = tank.points;
                self.entities.enemies.release(handle);
                self.entities.score += points;
                self.entities.enemies_destroyed += 1;

                if let Some(power_up) = self.levels.roll_power_up(&mut self.rng) {
                    self.apply_power_up(power_up);
                }
                true
            }
        }
    }

    fn apply_power_up(&mut self, power_up: PowerUpKind) {
        log::debug!("power-up {power_up:?}");
        match power_up {
            PowerUpKind::Star => self.entities.player.upgrade_weapon(),
            PowerUpKind::Tank => self.entities.lives += 1,
            PowerUpKind::Grenade => {
                let handles = self.entities.enemies.active_handles();
                for handle in &handles {
                    self.entities.enemies.release(*handle);
                }
                self.entities.enemies_destroyed += handles.len() as u32;
            }
            other => log::debug!("power-up {other:?} has no effect"),
        }
    }

    fn spawn_enemies(&mut self, dt: f32) -> Result<()> {
        let Some(level) = self.levels.current_level() else {
            return Ok(());
        };
        let policy = &level.enemies;
        let entities = &mut self.entities;
        entities.spawn_timer += dt;
        if entities.spawn_timer < policy.spawn_interval {
            return Ok(());
        }
        // Each interval gets one spawn attempt, used or not
        entities.spawn_timer = 0.0;

        if entities.enemies_to_spawn == 0
            || entities.enemies.active_count() as u32 >= policy.max_on_field
        {
            return Ok(());
        }

        let free: Vec<GridPos> = policy
            .spawn_points
            .iter()
            .map(|point| point.cell())
            .filter(|&cell| !entities.is_occupied(cell))
            .collect();
        if free.is_empty() {
            return Ok(());
        }

        let cell = free[self.rng.random_range(0..free.len())];
        let kind = self.levels.select_enemy_kind(&mut self.rng);
        let handle = entities.spawn_enemy(kind, cell, self.tile_size)?;
        if let Some(tank) = entities.enemies.get_mut(handle) {
            tank.fire_timer = self.rng.random_range(0.0..ENEMY_FIRE_HEAD_START);
        }
        Ok(())
    }

    fn resolve_level(&mut self) -> Result<StepOutcome> {
        match self.levels.evaluate(self.entities.counters()) {
            LevelOutcome::InProgress => Ok(StepOutcome::Continue),
            LevelOutcome::Failed(reason) => {
                self.levels.fail_level(reason);
                Ok(StepOutcome::Defeat(reason))
            }
            LevelOutcome::Complete => {
                self.levels.complete_level();
                match self.levels.advance()? {
                    Advance::Loaded(number) => {
                        self.load_current_level()?;
                        Ok(StepOutcome::LevelChanged(number))
                    }
                    Advance::RunComplete => Ok(StepOutcome::Victory),
                }
            }
        }
    }

    /// Copy the render-relevant state, entities sorted by id
    pub fn snapshot(&self) -> Snapshot {
        let tile = self.tile_size;
        let tank_view = |tank: &Tank| EntityView {
            id: tank.id,
            kind: match tank.kind {
                TankKind::Player => SpriteKind::PlayerTank,
                TankKind::Enemy(kind) => SpriteKind::EnemyTank(kind),
            },
            pos: tank.pos,
            direction: tank.direction,
            arc: tank.arc,
            size: tile,
            anim_frame: tank.anim_frame,
        };

        let player = self.entities.player.is_active().then(|| tank_view(&self.entities.player));
        let enemies = self.entities.enemies.iter_active().map(|(_, tank)| tank_view(tank));
        let bullets = self.entities.bullets.iter_active().map(|(_, bullet)| EntityView {
            id: bullet.id,
            kind: SpriteKind::Bullet(bullet.owner),
            pos: bullet.pos,
            direction: bullet.direction,
            arc: bullet.direction.arc_degrees(),
            size: bullet.size,
            anim_frame: 0,
        });

        let mut entities: Vec<EntityView> =
            player.into_iter().chain(enemies).chain(bullets).collect();
        entities.sort_by_key(|view| view.id);

        Snapshot {
            tick: self.tick,
            level: self.levels.current_number(),
            score: self.entities.score,
            lives: self.entities.lives,
            enemies_remaining: self.entities.enemies_remaining(),
            tiles: self.collision.tile_ids(),
            entities,
        }
    }
}

/// Face one of the three other directions
fn turn_randomly(tank: &mut Tank, rng: &mut Pcg32) {
    let options: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|&dir| dir != tank.direction)
        .collect();
    tank.face(options[rng.random_range(0..options.len())]);
}

/// Fire when the player is in range and either in the line of the barrel or a
/// snap-shot roll succeeds
fn should_fire(tank: &Tank, target: Option<Vec2>, tile: f32, rng: &mut Pcg32) -> bool {
    let Some(target) = target else {
        return false;
    };
    let center = tank.center(tile);
    if center.distance(target) > ENEMY_FIRE_RANGE {
        return false;
    }
    Direction::toward(center, target) == tank.direction || rng.random_bool(ENEMY_SNAP_FIRE_CHANCE)
}
