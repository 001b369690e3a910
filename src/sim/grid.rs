//! Tile grid and grid-space geometry
//!
//! The grid is a fixed `cols × rows` row-major array. Only cell kind and
//! health change during a session, and only through the collision model.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Slack used when mapping a rectangle's far edge to a cell, so that a
/// rectangle ending exactly on a tile boundary does not claim the next cell
const EDGE_EPSILON: f32 = 0.001;

/// Health of a freshly loaded brick
pub const BRICK_HEALTH: u8 = 1;

/// A cell address. Signed so that out-of-grid cells can be named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub col: i32,
    pub row: i32,
}

impl GridPos {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Top-left pixel of this cell
    pub fn to_pixel(self, tile_size: f32) -> Vec2 {
        Vec2::new(self.col as f32 * tile_size, self.row as f32 * tile_size)
    }

    pub fn offset(self, dcol: i32, drow: i32) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }
}

/// Inclusive movement bounds in grid space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridBounds {
    pub min: GridPos,
    pub max: GridPos,
}

impl GridBounds {
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.col >= self.min.col
            && pos.col <= self.max.col
            && pos.row >= self.min.row
            && pos.row <= self.max.row
    }
}

/// Axis-aligned rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    /// Square of side `size` centred on `center`
    pub fn centered(center: Vec2, size: f32) -> Self {
        Self::new(center - Vec2::splat(size / 2.0), Vec2::splat(size))
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size / 2.0
    }

    /// Strict overlap: rectangles sharing only an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x
            && other.min.x < a_max.x
            && self.min.y < b_max.y
            && other.min.y < a_max.y
    }

    /// Cells this rectangle overlaps, row-major
    pub fn cells(&self, tile_size: f32) -> Vec<GridPos> {
        let max = self.max();
        let first_col = (self.min.x / tile_size).floor() as i32;
        let first_row = (self.min.y / tile_size).floor() as i32;
        let last_col = ((max.x - EDGE_EPSILON) / tile_size).floor() as i32;
        let last_row = ((max.y - EDGE_EPSILON) / tile_size).floor() as i32;

        let mut cells = Vec::new();
        for row in first_row..=last_row.max(first_row) {
            for col in first_col..=last_col.max(first_col) {
                cells.push(GridPos::new(col, row));
            }
        }
        cells
    }
}

/// Tile types, keyed by their sprite-sheet ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Empty,
    /// Destructible wall
    Brick,
    /// Indestructible wall
    Steel,
    /// Impassable, stops bullets too
    Water,
    /// Conceals tanks, passable
    Grass,
    /// Slippery, passable
    Ice,
    /// The eagle
    Base,
    /// Unknown id, treated as passable decoration
    Other(u16),
}

impl TileKind {
    pub fn from_id(id: u16) -> Self {
        match id {
            0 => TileKind::Empty,
            55 => TileKind::Brick,
            60 => TileKind::Steel,
            74 => TileKind::Water,
            78 => TileKind::Grass,
            100 => TileKind::Ice,
            102 => TileKind::Base,
            other => TileKind::Other(other),
        }
    }

    pub fn id(self) -> u16 {
        match self {
            TileKind::Empty => 0,
            TileKind::Brick => 55,
            TileKind::Steel => 60,
            TileKind::Water => 74,
            TileKind::Grass => 78,
            TileKind::Ice => 100,
            TileKind::Base => 102,
            TileKind::Other(id) => id,
        }
    }

    pub fn is_passable(self) -> bool {
        !matches!(
            self,
            TileKind::Brick | TileKind::Steel | TileKind::Water | TileKind::Base
        )
    }
}

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCell {
    pub kind: TileKind,
    pub destructible: bool,
    /// Remaining hits for destructible cells
    pub health: Option<u8>,
}

impl TileCell {
    pub fn from_kind(kind: TileKind) -> Self {
        let destructible = kind == TileKind::Brick;
        Self {
            kind,
            destructible,
            health: destructible.then_some(BRICK_HEALTH),
        }
    }

    pub fn is_passable(&self) -> bool {
        self.kind.is_passable()
    }
}

/// Result of a hit on a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileDamage {
    /// Health reached zero; the cell is now empty
    Destroyed,
    Damaged { remaining: u8 },
    Indestructible,
    OutOfBounds,
}

/// Owned, bounds-checked tile grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileGrid {
    cols: usize,
    rows: usize,
    cells: Vec<TileCell>,
}

impl TileGrid {
    /// Build from rows of tile ids. Rows must be non-empty and equally long.
    pub fn from_rows(rows: &[Vec<u16>]) -> Result<Self, String> {
        let Some(first) = rows.first() else {
            return Err("grid has no rows".to_string());
        };
        let cols = first.len();
        if cols == 0 {
            return Err("grid has no columns".to_string());
        }

        let mut cells = Vec::with_capacity(cols * rows.len());
        for (row, ids) in rows.iter().enumerate() {
            if ids.len() != cols {
                return Err(format!(
                    "row {} has {} columns, expected {}",
                    row,
                    ids.len(),
                    cols
                ));
            }
            cells.extend(ids.iter().map(|&id| TileCell::from_kind(TileKind::from_id(id))));
        }

        Ok(Self {
            cols,
            rows: rows.len(),
            cells,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid size in pixels
    pub fn pixel_size(&self, tile_size: f32) -> Vec2 {
        Vec2::new(self.cols as f32 * tile_size, self.rows as f32 * tile_size)
    }

    /// Bounds covering the whole grid
    pub fn bounds(&self) -> GridBounds {
        GridBounds {
            min: GridPos::new(0, 0),
            max: GridPos::new(self.cols as i32 - 1, self.rows as i32 - 1),
        }
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if pos.col < 0 || pos.row < 0 {
            return None;
        }
        let (col, row) = (pos.col as usize, pos.row as usize);
        (col < self.cols && row < self.rows).then_some(row * self.cols + col)
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.index(pos).is_some()
    }

    pub fn get(&self, pos: GridPos) -> Option<&TileCell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// Tile ids, row by row (for renderers and tests)
    pub fn tile_ids(&self) -> Vec<Vec<u16>> {
        self.cells
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(|cell| cell.kind.id()).collect())
            .collect()
    }

    /// Apply one hit. Only the collision model calls this.
    pub(super) fn damage(&mut self, pos: GridPos) -> TileDamage {
        let Some(index) = self.index(pos) else {
            return TileDamage::OutOfBounds;
        };
        let cell = &mut self.cells[index];
        if !cell.destructible {
            return TileDamage::Indestructible;
        }

        let remaining = cell.health.unwrap_or(1).saturating_sub(1);
        if remaining == 0 {
            *cell = TileCell::from_kind(TileKind::Empty);
            TileDamage::Destroyed
        } else {
            cell.health = Some(remaining);
            TileDamage::Damaged { remaining }
        }
    }
}
