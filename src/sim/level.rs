//! Level records and level sources
//!
//! Levels are plain serde data in the camelCase JSON layout used by the
//! level files. Optional fields fall back to the stock defaults.

use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::grid::{GridPos, TileGrid};
use super::tank::EnemyKind;
use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

/// Grid coordinate as written in level files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn cell(self) -> GridPos {
        GridPos::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStart {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub direction: Direction,
}

impl PlayerStart {
    pub fn cell(self) -> GridPos {
        GridPos::new(self.x, self.y)
    }
}

/// One row of the weighted enemy table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyWeight {
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnemyPolicy {
    /// Enemies spawned over the whole level
    pub total: u32,
    pub max_on_field: u32,
    pub spawn_points: Vec<Coord>,
    pub types: Vec<EnemyWeight>,
    /// Seconds between spawns
    pub spawn_interval: f32,
}

impl Default for EnemyPolicy {
    fn default() -> Self {
        Self {
            total: 20,
            max_on_field: 4,
            spawn_points: Vec::new(),
            types: Vec::new(),
            spawn_interval: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    Helmet,
    Star,
    Tank,
    Shovel,
    Clock,
    Grenade,
    Medal,
}

/// Drop chance in percent, rolled when an enemy is destroyed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpChance {
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    pub chance: f32,
}

/// One playable level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Rows of tile ids
    pub grid: Vec<Vec<u16>>,
    pub player_start: PlayerStart,
    pub base_position: Coord,
    #[serde(default)]
    pub enemies: EnemyPolicy,
    /// Seconds, 0 = no limit
    #[serde(default)]
    pub time_limit: f32,
    #[serde(default)]
    pub powerups: Vec<PowerUpChance>,
}

impl Level {
    fn malformed(&self, reason: impl Into<String>) -> SimError {
        SimError::MalformedLevel {
            level: self.id,
            reason: reason.into(),
        }
    }

    /// Build the tile grid, checking every position the level references
    pub fn build_grid(&self) -> Result<TileGrid> {
        let grid = TileGrid::from_rows(&self.grid).map_err(|reason| self.malformed(reason))?;

        if !grid.contains(self.player_start.cell()) {
            return Err(self.malformed(format!(
                "player start ({}, {}) is outside the grid",
                self.player_start.x, self.player_start.y
            )));
        }
        if !grid.contains(self.base_position.cell()) {
            return Err(self.malformed(format!(
                "base ({}, {}) is outside the grid",
                self.base_position.x, self.base_position.y
            )));
        }
        if let Some(point) = self.enemies.spawn_points.iter().find(|p| !grid.contains(p.cell())) {
            return Err(self.malformed(format!(
                "spawn point ({}, {}) is outside the grid",
                point.x, point.y
            )));
        }
        Ok(grid)
    }

    /// Structural checks beyond the grid itself
    pub fn validate(&self) -> Result<()> {
        self.build_grid()?;
        if self.enemies.total > 0 && self.enemies.spawn_points.is_empty() {
            return Err(self.malformed("enemies configured without spawn points"));
        }
        if self.enemies.total > 0 && self.enemies.max_on_field == 0 {
            return Err(self.malformed("maxOnField must be at least 1"));
        }
        if !is_non_negative(self.enemies.spawn_interval) {
            return Err(self.malformed("spawnInterval must be non-negative"));
        }
        if self.enemies.types.iter().any(|t| !is_non_negative(t.weight)) {
            return Err(self.malformed("enemy weights must be non-negative"));
        }
        if !is_non_negative(self.time_limit) {
            return Err(self.malformed("timeLimit must be non-negative"));
        }
        Ok(())
    }
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

/// Summary used by level select screens
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub id: u32,
    pub name: String,
    pub difficulty: Difficulty,
    pub enemy_count: u32,
    pub time_limit: f32,
}

impl From<&Level> for LevelInfo {
    fn from(level: &Level) -> Self {
        Self {
            id: level.id,
            name: level.name.clone(),
            difficulty: level.difficulty,
            enemy_count: level.enemies.total,
            time_limit: level.time_limit,
        }
    }
}

/// Read-only supplier of levels, numbered from 1
pub trait LevelSource: std::fmt::Debug {
    fn level(&self, number: u32) -> Option<Level>;

    fn level_count(&self) -> u32;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackMeta {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

/// Levels loaded from a JSON pack: `{ "levels": [...], "meta": {...} }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelPack {
    pub levels: Vec<Level>,
    #[serde(default)]
    pub meta: PackMeta,
}

impl LevelPack {
    /// Parse and validate every level
    pub fn from_json(json: &str) -> Result<Self> {
        let pack: LevelPack = serde_json::from_str(json)?;
        for level in &pack.levels {
            level.validate()?;
        }
        Ok(pack)
    }

    pub fn from_levels(levels: Vec<Level>) -> Self {
        Self {
            levels,
            meta: PackMeta::default(),
        }
    }
}

impl LevelSource for LevelPack {
    fn level(&self, number: u32) -> Option<Level> {
        let index = number.checked_sub(1)? as usize;
        self.levels.get(index).cloned()
    }

    fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small arena used across simulation tests
    ///
    /// ```text
    /// . . . . .
    /// . B . S .
    /// . . . . .
    /// . B B B .
    /// . . P B E
    /// ```
    pub(crate) fn arena(id: u32) -> Level {
        Level {
            id,
            name: format!("Arena {id}"),
            difficulty: Difficulty::Easy,
            grid: vec![
                vec![0, 0, 0, 0, 0],
                vec![0, 55, 0, 60, 0],
                vec![0, 0, 0, 0, 0],
                vec![0, 55, 55, 55, 0],
                vec![0, 0, 0, 55, 102],
            ],
            player_start: PlayerStart {
                x: 2,
                y: 4,
                direction: Direction::Up,
            },
            base_position: Coord { x: 4, y: 4 },
            enemies: EnemyPolicy {
                total: 2,
                max_on_field: 1,
                spawn_points: vec![Coord { x: 0, y: 0 }, Coord { x: 4, y: 0 }],
                types: vec![EnemyWeight {
                    kind: EnemyKind::Basic,
                    weight: 1.0,
                }],
                spawn_interval: 1.0,
            },
            time_limit: 0.0,
            powerups: Vec::new(),
        }
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let json = r#"{
            "id": 3,
            "grid": [[0, 0], [0, 102]],
            "playerStart": {"x": 0, "y": 1, "direction": "w"},
            "basePosition": {"x": 1, "y": 1}
        }"#;
        let level: Level = serde_json::from_str(json).unwrap();
        assert_eq!(level.enemies.total, 20);
        assert_eq!(level.enemies.max_on_field, 4);
        assert_eq!(level.enemies.spawn_interval, 3.0);
        assert_eq!(level.time_limit, 0.0);
        assert_eq!(level.difficulty, Difficulty::Normal);
        assert_eq!(level.player_start.direction, Direction::Up);
        assert!(level.powerups.is_empty());
    }

    #[test]
    fn test_pack_parses_camel_case() {
        let json = r#"{
            "levels": [{
                "id": 1,
                "name": "Level 1",
                "difficulty": "hard",
                "grid": [[0, 0, 0], [0, 0, 102]],
                "playerStart": {"x": 0, "y": 1, "direction": "d"},
                "basePosition": {"x": 2, "y": 1},
                "enemies": {
                    "total": 5,
                    "maxOnField": 2,
                    "spawnPoints": [{"x": 0, "y": 0}],
                    "types": [{"type": "fast", "weight": 25}],
                    "spawnInterval": 1.5
                },
                "timeLimit": 90,
                "powerups": [{"type": "star", "chance": 5}],
                "backgroundMusic": "battle"
            }],
            "meta": {"version": "1.0.0"}
        }"#;
        let pack = LevelPack::from_json(json).unwrap();
        assert_eq!(pack.level_count(), 1);
        let level = pack.level(1).unwrap();
        assert_eq!(level.difficulty, Difficulty::Hard);
        assert_eq!(level.player_start.direction, Direction::Right);
        assert_eq!(level.enemies.types[0].kind, EnemyKind::Fast);
        assert_eq!(level.powerups[0].kind, PowerUpKind::Star);
        assert!(pack.level(0).is_none());
        assert!(pack.level(2).is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_grid_base() {
        let mut level = arena(1);
        level.base_position = Coord { x: 9, y: 9 };
        let err = level.validate().unwrap_err();
        assert!(matches!(err, SimError::MalformedLevel { level: 1, .. }));
    }

    #[test]
    fn test_validate_rejects_ragged_grid() {
        let mut level = arena(2);
        level.grid[2].pop();
        assert!(matches!(
            level.validate(),
            Err(SimError::MalformedLevel { level: 2, .. })
        ));
    }

    #[test]
    fn test_validate_requires_spawn_points() {
        let mut level = arena(1);
        level.enemies.spawn_points.clear();
        assert!(level.validate().is_err());
        level.enemies.total = 0;
        assert!(level.validate().is_ok());
    }

    #[test]
    fn test_level_info() {
        let info = LevelInfo::from(&arena(4));
        assert_eq!(info.id, 4);
        assert_eq!(info.enemy_count, 2);
    }

    #[test]
    fn test_bundled_pack_is_valid() {
        let pack = LevelPack::from_json(include_str!("../../assets/levels.json")).unwrap();
        assert_eq!(pack.level_count(), 2);
        let first = pack.level(1).unwrap();
        assert_eq!(first.grid.len(), 13);
        assert_eq!(first.base_position, Coord { x: 6, y: 12 });
        assert_eq!(first.enemies.types[1].kind, EnemyKind::Fast);
        assert_eq!(pack.level(2).unwrap().time_limit, 300.0);
    }
}
