//! Render snapshots
//!
//! A snapshot is an immutable copy of everything a renderer needs, taken at a
//! step boundary. Renderers never see live simulation state.

use std::rc::Rc;

use glam::Vec2;

use super::direction::Direction;
use super::tank::{EnemyKind, Side};

/// What to draw for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    PlayerTank,
    EnemyTank(EnemyKind),
    Bullet(Side),
}

/// Render-relevant state of one active entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityView {
    pub id: u32,
    pub kind: SpriteKind,
    /// Top-left for tanks, centre for bullets
    pub pos: Vec2,
    pub direction: Direction,
    pub arc: f32,
    pub size: f32,
    pub anim_frame: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Steps run since the session began
    pub tick: u64,
    pub level: u32,
    pub score: u32,
    pub lives: u32,
    pub enemies_remaining: u32,
    /// Tile ids row by row, shared until a tile changes
    pub tiles: Rc<Vec<Vec<u16>>>,
    /// Sorted by id
    pub entities: Vec<EntityView>,
}

impl Snapshot {
    pub fn entity(&self, id: u32) -> Option<&EntityView> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entities[i])
    }

    /// Entities of this snapshot with positions blended from `previous`
    ///
    /// Entities missing from `previous` (just spawned) are drawn where they are.
    pub fn blended(&self, previous: &Snapshot, alpha: f32) -> Vec<EntityView> {
        let alpha = alpha.clamp(0.0, 1.0);
        self.entities
            .iter()
            .map(|current| match previous.entity(current.id) {
                Some(before) => EntityView {
                    pos: before.pos.lerp(current.pos, alpha),
                    ..*current
                },
                None => *current,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u32, x: f32) -> EntityView {
        EntityView {
            id,
            kind: SpriteKind::PlayerTank,
            pos: Vec2::new(x, 0.0),
            direction: Direction::Right,
            arc: 0.0,
            size: 33.0,
            anim_frame: 0,
        }
    }

    #[test]
    fn test_blended_interpolates_known_entities() {
        let previous = Snapshot {
            entities: vec![view(1, 0.0)],
            ..Default::default()
        };
        let current = Snapshot {
            entities: vec![view(1, 10.0), view(2, 50.0)],
            ..Default::default()
        };

        let blended = current.blended(&previous, 0.25);
        assert_eq!(blended[0].pos.x, 2.5);
        assert_eq!(blended[1].pos.x, 50.0);
    }

    #[test]
    fn test_alpha_is_clamped() {
        let previous = Snapshot {
            entities: vec![view(1, 0.0)],
            ..Default::default()
        };
        let current = Snapshot {
            entities: vec![view(1, 10.0)],
            ..Default::default()
        };
        assert_eq!(current.blended(&previous, 3.0)[0].pos.x, 10.0);
    }
}
