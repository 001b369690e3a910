//! Game phase state machine
//!
//! Exactly one phase is current. Only `Playing` advances simulation time;
//! `Paused` keeps rendering the frozen frame.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Coarse phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for start
    #[default]
    Menu,
    Playing,
    Paused,
    /// Run lost
    GameOver,
    /// Every level cleared
    Victory,
}

impl GamePhase {
    /// Does simulation time advance in this phase?
    pub fn is_running(self) -> bool {
        self == GamePhase::Playing
    }

    /// Run has ended and waits for acknowledgement
    pub fn is_finished(self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Victory)
    }
}

/// Events that drive phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseEvent {
    Start,
    /// Pause key: toggles between playing and paused
    TogglePause,
    Resume,
    Lose,
    Win,
    /// Dismiss the game over / victory screen
    Acknowledge,
}

#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    phase: GamePhase,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Phase reached from `from` on `event`, if the transition is legal
    pub fn transition(from: GamePhase, event: PhaseEvent) -> Option<GamePhase> {
        use GamePhase::*;
        use PhaseEvent::*;

        match (from, event) {
            (Menu, Start) => Some(Playing),
            (Playing, TogglePause) => Some(Paused),
            (Paused, TogglePause | Resume) => Some(Playing),
            (Playing, Lose) => Some(GameOver),
            (Playing, Win) => Some(Victory),
            (GameOver | Victory, Acknowledge) => Some(Menu),
            _ => None,
        }
    }

    /// Apply `event`, failing on an illegal transition
    pub fn try_apply(&mut self, event: PhaseEvent) -> Result<GamePhase> {
        let next = Self::transition(self.phase, event).ok_or(SimError::IllegalStateTransition {
            from: self.phase,
            event,
        })?;
        log::debug!("phase {:?} -> {:?} on {:?}", self.phase, next, event);
        self.phase = next;
        Ok(next)
    }

    /// Apply `event`, ignoring illegal transitions. Returns true if the phase changed.
    pub fn apply(&mut self, event: PhaseEvent) -> bool {
        match self.try_apply(event) {
            Ok(_) => true,
            Err(err) => {
                log::debug!("ignored: {err}");
                false
            }
        }
    }
}
