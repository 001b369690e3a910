//! Level progression
//!
//! Holds the active level, decides win/loss from counters the entity set
//! supplies, and queues progression events for the runner to drain.

use std::collections::VecDeque;

use rand::Rng;

use super::level::{Level, LevelInfo, LevelSource, PowerUpKind};
use super::tank::EnemyKind;
use crate::error::{Result, SimError};

/// Stars awarded for every completed level
const LEVEL_STARS: u8 = 3;

/// Undrained events kept before the oldest are dropped
pub const EVENT_BACKLOG: usize = 64;

/// Progression notifications, drained once per frame
#[derive(Debug, Clone, PartialEq)]
pub enum LevelEvent {
    Started { level: u32, name: String },
    Completed { level: u32, stars: u8 },
    GameOver { victory: bool, final_level: u32 },
}

/// Snapshot of the counters that decide a level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounters {
    pub enemies_to_spawn: u32,
    pub enemies_on_field: u32,
    pub player_lives: u32,
    pub base_destroyed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    OutOfLives,
    BaseDestroyed,
    TimeUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    InProgress,
    Complete,
    Failed(FailReason),
}

/// Result of moving past a completed level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Loaded(u32),
    /// The last level was cleared and the run does not loop
    RunComplete,
}

#[derive(Debug)]
pub struct LevelManager {
    source: Box<dyn LevelSource>,
    current: Option<Level>,
    current_number: u32,
    in_progress: bool,
    loop_levels: bool,
    /// Seconds spent in the current level
    elapsed: f32,
    events: VecDeque<LevelEvent>,
}

impl LevelManager {
    pub fn new(source: Box<dyn LevelSource>, loop_levels: bool) -> Self {
        Self {
            source,
            current: None,
            current_number: 0,
            in_progress: false,
            loop_levels,
            elapsed: 0.0,
            events: VecDeque::new(),
        }
    }

    pub fn total_levels(&self) -> u32 {
        self.source.level_count()
    }

    pub fn current_level(&self) -> Option<&Level> {
        self.current.as_ref()
    }

    /// 1-based number of the loaded level (0 before the first load)
    pub fn current_number(&self) -> u32 {
        self.current_number
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn has_next_level(&self) -> bool {
        self.current_number < self.total_levels()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds left on a timed level
    pub fn time_remaining(&self) -> Option<f32> {
        let limit = self.current.as_ref()?.time_limit;
        (limit > 0.0).then(|| (limit - self.elapsed).max(0.0))
    }

    fn time_expired(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|level| level.time_limit > 0.0 && self.elapsed >= level.time_limit)
    }

    /// Load and start level `number`
    ///
    /// Fails with [`SimError::InvalidLevelTransition`] while another level is
    /// still in progress; call [`LevelManager::teardown`] first.
    pub fn start_level(&mut self, number: u32) -> Result<&Level> {
        if self.in_progress {
            return Err(SimError::InvalidLevelTransition {
                current: self.current_number,
                requested: number,
            });
        }

        let level = self.source.level(number).ok_or(SimError::UnknownLevel(number))?;
        level.validate()?;

        log::info!("starting level {} ({})", number, level.name);
        self.queue(LevelEvent::Started {
            level: number,
            name: level.name.clone(),
        });
        self.current_number = number;
        self.in_progress = true;
        self.elapsed = 0.0;
        Ok(self.current.insert(level))
    }

    /// End the current level. Safe to call when nothing is running.
    pub fn teardown(&mut self) {
        if self.in_progress {
            log::debug!("tearing down level {}", self.current_number);
        }
        self.in_progress = false;
    }

    /// Record completion of the current level and return its star rating
    pub fn complete_level(&mut self) -> u8 {
        log::info!("level {} complete", self.current_number);
        self.queue(LevelEvent::Completed {
            level: self.current_number,
            stars: LEVEL_STARS,
        });
        self.teardown();
        LEVEL_STARS
    }

    /// Record a lost run
    pub fn fail_level(&mut self, reason: FailReason) {
        log::info!("level {} failed: {:?}", self.current_number, reason);
        self.queue(LevelEvent::GameOver {
            victory: false,
            final_level: self.current_number,
        });
        self.teardown();
    }

    /// Move on from the current level
    ///
    /// After the last level this wraps to level 1 when looping, otherwise the
    /// run is complete.
    pub fn advance(&mut self) -> Result<Advance> {
        self.teardown();
        if self.has_next_level() {
            let next = self.current_number + 1;
            self.start_level(next)?;
            return Ok(Advance::Loaded(next));
        }
        if self.loop_levels && self.total_levels() > 0 {
            self.start_level(1)?;
            return Ok(Advance::Loaded(1));
        }

        log::info!("run complete after level {}", self.current_number);
        self.queue(LevelEvent::GameOver {
            victory: true,
            final_level: self.total_levels(),
        });
        Ok(Advance::RunComplete)
    }

    /// Advance the level clock
    pub fn tick(&mut self, dt: f32) {
        if self.in_progress {
            self.elapsed += dt;
        }
    }

    /// Decide the level from the entity counters. Failure wins over completion.
    pub fn evaluate(&self, counters: LevelCounters) -> LevelOutcome {
        if !self.in_progress {
            return LevelOutcome::InProgress;
        }
        if counters.player_lives == 0 {
            return LevelOutcome::Failed(FailReason::OutOfLives);
        }
        if counters.base_destroyed {
            return LevelOutcome::Failed(FailReason::BaseDestroyed);
        }
        if self.time_expired() {
            return LevelOutcome::Failed(FailReason::TimeUp);
        }
        if counters.enemies_to_spawn == 0 && counters.enemies_on_field == 0 {
            return LevelOutcome::Complete;
        }
        LevelOutcome::InProgress
    }

    /// Weighted pick from the level's enemy table (basic when empty)
    pub fn select_enemy_kind<R: Rng>(&self, rng: &mut R) -> EnemyKind {
        let Some(level) = &self.current else {
            return EnemyKind::Basic;
        };
        let types = &level.enemies.types;
        let total: f32 = types.iter().map(|t| t.weight).sum();
        if total <= 0.0 {
            return types.last().map_or(EnemyKind::Basic, |t| t.kind);
        }

        let mut roll = rng.random_range(0.0..total);
        for entry in types {
            roll -= entry.weight;
            if roll < 0.0 {
                return entry.kind;
            }
        }
        types.last().map_or(EnemyKind::Basic, |t| t.kind)
    }

    /// Roll the power-up table in order; the first entry whose percent chance hits wins
    pub fn roll_power_up<R: Rng>(&self, rng: &mut R) -> Option<PowerUpKind> {
        let level = self.current.as_ref()?;
        level
            .powerups
            .iter()
            .find(|entry| rng.random_range(0.0..100.0) < entry.chance)
            .map(|entry| entry.kind)
    }

    pub fn level_infos(&self) -> Vec<LevelInfo> {
        (1..=self.total_levels())
            .filter_map(|number| self.source.level(number))
            .map(|level| LevelInfo::from(&level))
            .collect()
    }

    /// Take queued progression events
    ///
    /// Hosts that never drain only keep the latest [`EVENT_BACKLOG`] events.
    pub fn drain_events(&mut self) -> Vec<LevelEvent> {
        self.events.drain(..).collect()
    }

    fn queue(&mut self, event: LevelEvent) {
        if self.events.len() == EVENT_BACKLOG {
            log::debug!("level event backlog full, dropping {:?}", self.events.front());
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Forget the run: no level loaded, no pending events
    pub fn reset(&mut self) {
        self.teardown();
        self.current = None;
        self.current_number = 0;
        self.elapsed = 0.0;
        self.events.clear();
    }
}
