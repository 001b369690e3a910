//! Cardinal facing directions

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One of the four cardinal directions (no diagonal movement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "w")]
    Up,
    #[serde(alias = "s")]
    Down,
    #[serde(alias = "a")]
    Left,
    #[serde(alias = "d")]
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Sprite rotation in degrees (screen space, y down)
    pub fn arc_degrees(self) -> f32 {
        match self {
            Direction::Right => 0.0,
            Direction::Down => 90.0,
            Direction::Left => 180.0,
            Direction::Up => 270.0,
        }
    }

    /// Grid step as (dcol, drow)
    pub fn grid_delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Unit vector in pixel space
    pub fn unit(self) -> Vec2 {
        let (dx, dy) = self.grid_delta();
        Vec2::new(dx as f32, dy as f32)
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Dominant direction pointing from `from` toward `to`
    pub fn toward(from: Vec2, to: Vec2) -> Self {
        let d = to - from;
        if d.x.abs() > d.y.abs() {
            if d.x > 0.0 { Direction::Right } else { Direction::Left }
        } else if d.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_matches_facing() {
        assert_eq!(Direction::Up.arc_degrees(), 270.0);
        assert_eq!(Direction::Right.arc_degrees(), 0.0);
    }

    #[test]
    fn test_opposite_round_trips() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.unit() + dir.opposite().unit(), Vec2::ZERO);
        }
    }

    #[test]
    fn test_toward() {
        let origin = Vec2::ZERO;
        assert_eq!(Direction::toward(origin, Vec2::new(10.0, 2.0)), Direction::Right);
        assert_eq!(Direction::toward(origin, Vec2::new(-1.0, -8.0)), Direction::Up);
    }

    #[test]
    fn test_deserializes_key_aliases() {
        let dir: Direction = serde_json::from_str("\"w\"").unwrap();
        assert_eq!(dir, Direction::Up);
        let dir: Direction = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(dir, Direction::Right);
    }
}
