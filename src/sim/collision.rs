//! Tile-grid collision model
//!
//! Movement is grid-locked and cardinal, so every query is a rectangle
//! against the cells it covers plus the other tanks' rectangles. The first
//! blocking result wins; there is no partial movement.
//!
//! `CollisionModel` owns the `TileGrid` and is the only code path allowed to
//! damage tiles.

use std::rc::Rc;

use glam::Vec2;

use super::bullet::Bullet;
use super::grid::{GridPos, Rect, TileDamage, TileGrid, TileKind};
use super::pool::PoolHandle;
use super::tank::Side;
use crate::error::{Result, SimError};

/// Which tank a collision refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TankRef {
    Player,
    Enemy(PoolHandle),
}

/// A tank's collision footprint for the current step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankBody {
    pub target: TankRef,
    pub id: u32,
    pub side: Side,
    pub rect: Rect,
}

/// Outcome of one collision query. Produced fresh, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionResult {
    None,
    Wall { cell: GridPos, destructible: bool },
    Tank { target: TankRef },
    Base { cell: GridPos },
}

impl CollisionResult {
    pub fn is_blocking(&self) -> bool {
        !matches!(self, CollisionResult::None)
    }
}

#[derive(Debug, Clone)]
pub struct CollisionModel {
    grid: TileGrid,
    base: GridPos,
    tile_size: f32,
    /// Tile id rows shared with snapshots, rebuilt when a tile is destroyed
    tile_ids: Rc<Vec<Vec<u16>>>,
}

impl CollisionModel {
    pub fn new(grid: TileGrid, base: GridPos, tile_size: f32) -> Self {
        let tile_ids = Rc::new(grid.tile_ids());
        Self {
            grid,
            base,
            tile_size,
            tile_ids,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Current tile ids, row by row
    pub fn tile_ids(&self) -> Rc<Vec<Vec<u16>>> {
        Rc::clone(&self.tile_ids)
    }

    pub fn base(&self) -> GridPos {
        self.base
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Map size in pixels
    pub fn map_size(&self) -> Vec2 {
        self.grid.pixel_size(self.tile_size)
    }

    pub fn is_passable(&self, cell: GridPos) -> bool {
        cell != self.base && self.grid.get(cell).is_some_and(|c| c.is_passable())
    }

    /// Classify a single cell
    fn cell_result(&self, cell: GridPos) -> CollisionResult {
        let Some(tile) = self.grid.get(cell) else {
            // Outside the grid behaves like an indestructible wall
            return CollisionResult::Wall {
                cell,
                destructible: false,
            };
        };
        if cell == self.base || tile.kind == TileKind::Base {
            return CollisionResult::Base { cell };
        }
        if !tile.is_passable() {
            return CollisionResult::Wall {
                cell,
                destructible: tile.destructible,
            };
        }
        CollisionResult::None
    }

    /// Can tank `mover` step into `target`?
    ///
    /// `bodies` holds every live tank, the mover included (it is skipped by id).
    pub fn check_tank_move(
        &self,
        mover: u32,
        target: GridPos,
        bodies: &[TankBody],
    ) -> CollisionResult {
        let rect = Rect::new(target.to_pixel(self.tile_size), Vec2::splat(self.tile_size));

        for cell in rect.cells(self.tile_size) {
            let result = self.cell_result(cell);
            if result.is_blocking() {
                return result;
            }
        }

        bodies
            .iter()
            .find(|body| body.id != mover && body.rect.overlaps(&rect))
            .map_or(CollisionResult::None, |body| CollisionResult::Tank {
                target: body.target,
            })
    }

    /// What does `bullet` hit at its current position?
    ///
    /// The base is checked first, then walls, then opposing tanks. A bullet
    /// overlapping more than one opposing tank is reported as
    /// [`SimError::CollisionAmbiguity`].
    pub fn check_bullet(&self, bullet: &Bullet, bodies: &[TankBody]) -> Result<CollisionResult> {
        let rect = bullet.rect();
        let cells = rect.cells(self.tile_size);

        let mut wall = CollisionResult::None;
        for &cell in &cells {
            match self.cell_result(cell) {
                base @ CollisionResult::Base { .. } => return Ok(base),
                hit @ CollisionResult::Wall { .. } if !wall.is_blocking() => wall = hit,
                _ => {}
            }
        }
        if wall.is_blocking() {
            return Ok(wall);
        }

        let mut hits = bodies
            .iter()
            .filter(|body| body.side != bullet.owner && body.rect.overlaps(&rect));
        let Some(first) = hits.next() else {
            return Ok(CollisionResult::None);
        };
        let extra = hits.count();
        if extra > 0 {
            return Err(SimError::CollisionAmbiguity {
                bullet: bullet.id,
                targets: extra + 1,
            });
        }
        Ok(CollisionResult::Tank {
            target: first.target,
        })
    }

    /// Apply a bullet hit to `cell`
    pub fn strike(&mut self, cell: GridPos) -> TileDamage {
        let damage = self.grid.damage(cell);
        if damage == TileDamage::Destroyed {
            log::debug!("tile ({}, {}) destroyed", cell.col, cell.row);
            self.tile_ids = Rc::new(self.grid.tile_ids());
        }
        damage
    }
}
