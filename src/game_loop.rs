//! Fixed-timestep update/render loop
//!
//! Wall-clock time is accumulated and drained in constant-size simulation
//! steps, so gameplay is identical however the frames are spaced. The
//! renderer gets the last two step snapshots plus an interpolation factor
//! and never touches live simulation state.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use crate::consts::STEP_EPSILON;
use crate::error::Result;
use crate::settings::Settings;
use crate::sim::{
    Direction, GamePhase, LevelEvent, PhaseEvent, Snapshot, StateMachine, StepOutcome, World,
};

/// Source of wall-clock time, in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Monotonic system clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Synthetic clock for tests and headless runs
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the loop.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        self.time.set(self.time.get() + seconds);
    }

    pub fn set(&self, seconds: f64) {
        self.time.set(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

/// Draw-only consumer of snapshots
pub trait Renderer {
    fn render(&mut self, previous: &Snapshot, current: &Snapshot, alpha: f32);
}

impl<F> Renderer for F
where
    F: FnMut(&Snapshot, &Snapshot, f32),
{
    fn render(&mut self, previous: &Snapshot, current: &Snapshot, alpha: f32) {
        self(previous, current, alpha)
    }
}

/// Discrete input, queued and consumed once per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(Direction),
    Stop,
    Fire,
    /// Pause key (toggles)
    Pause,
    Resume,
    Start,
    Acknowledge,
}

/// Time accumulator that hands out fixed-size steps
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimestep {
    fixed_delta: f64,
    max_delta: f64,
    accumulator: f64,
}

impl FixedTimestep {
    pub fn new(fixed_delta: f64, max_delta: f64) -> Self {
        Self {
            fixed_delta,
            max_delta,
            accumulator: 0.0,
        }
    }

    pub fn fixed_delta(&self) -> f64 {
        self.fixed_delta
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Add elapsed wall-clock time, clamped to `max_delta`. Returns the amount added.
    pub fn accumulate(&mut self, elapsed: f64) -> f64 {
        let elapsed = elapsed.clamp(0.0, self.max_delta);
        self.accumulator += elapsed;
        elapsed
    }

    /// Take one step's worth of time if available
    pub fn consume_step(&mut self) -> bool {
        if self.accumulator + STEP_EPSILON < self.fixed_delta {
            return false;
        }
        self.accumulator = (self.accumulator - self.fixed_delta).max(0.0);
        true
    }

    /// Progress toward the next step, in [0, 1)
    pub fn alpha(&self) -> f64 {
        (self.accumulator / self.fixed_delta).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// What one frame did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    pub alpha: f32,
    pub phase: GamePhase,
}

/// Top-level driver. Owns the world, state machine, renderer and clock.
pub struct GameLoop<R, C> {
    world: World,
    machine: StateMachine,
    renderer: R,
    clock: C,
    timestep: FixedTimestep,
    interpolate: bool,
    previous: Snapshot,
    current: Snapshot,
    inputs: VecDeque<InputEvent>,
    running: bool,
    halted: bool,
    last_time: Option<f64>,
    frames: u64,
    steps: u64,
    total_time: f64,
}

impl<R: Renderer, C: Clock> GameLoop<R, C> {
    pub fn new(settings: &Settings, world: World, renderer: R, clock: C) -> Result<Self> {
        settings.validate()?;
        let current = world.snapshot();
        Ok(Self {
            world,
            machine: StateMachine::new(),
            renderer,
            clock,
            timestep: FixedTimestep::new(settings.fixed_delta, settings.max_delta),
            interpolate: settings.interpolate,
            previous: current.clone(),
            current,
            inputs: VecDeque::new(),
            running: false,
            halted: false,
            last_time: None,
            frames: 0,
            steps: 0,
            total_time: 0.0,
        })
    }

    pub fn start(&mut self) {
        log::info!("game loop started");
        self.running = true;
        self.last_time = None;
        self.timestep.reset();
    }

    /// Stop between frames; later frames are ignored until `start`
    pub fn stop(&mut self) {
        if self.running {
            log::info!("game loop stopped after {} frames, {} steps", self.frames, self.steps);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.halted
    }

    /// A fatal error stopped the loop for good
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.inputs.push_back(event);
    }

    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn current_snapshot(&self) -> &Snapshot {
        &self.current
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Steps per second of accumulated frame time
    pub fn simulation_rate(&self) -> f64 {
        if self.total_time > 0.0 {
            self.steps as f64 / self.total_time
        } else {
            0.0
        }
    }

    /// Take progression events queued by the level manager
    pub fn drain_level_events(&mut self) -> Vec<LevelEvent> {
        self.world.levels_mut().drain_events()
    }

    /// Run one frame
    ///
    /// A fatal error halts the loop and is returned exactly once; later calls
    /// do nothing.
    pub fn frame(&mut self) -> Result<FrameReport> {
        if !self.running || self.halted {
            return Ok(FrameReport {
                phase: self.machine.phase(),
                ..Default::default()
            });
        }

        self.run_frame().inspect_err(|err| {
            self.halted = true;
            log::error!("simulation halted: {err}");
        })
    }

    fn run_frame(&mut self) -> Result<FrameReport> {
        let now = self.clock.now();
        let measured = self.last_time.map_or(0.0, |last| now - last);
        self.last_time = Some(now);

        while let Some(event) = self.inputs.pop_front() {
            self.handle_input(event)?;
        }

        // The simulation clock stands still outside play, which also holds
        // the interpolation factor of a paused frame
        let elapsed = if self.machine.phase().is_running() {
            self.timestep.accumulate(measured)
        } else {
            0.0
        };

        let dt = self.timestep.fixed_delta() as f32;
        let mut steps = 0;
        while self.timestep.consume_step() {
            // Finished mid-frame: the remaining steps are dropped
            if !self.machine.phase().is_running() {
                continue;
            }

            let outcome = self.world.step(dt)?;
            self.previous = std::mem::replace(&mut self.current, self.world.snapshot());
            steps += 1;

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::LevelChanged(level) => {
                    log::debug!("level {level} loaded, interpolation restarts");
                    self.previous = self.current.clone();
                }
                StepOutcome::Victory => {
                    self.machine.apply(PhaseEvent::Win);
                }
                StepOutcome::Defeat(reason) => {
                    log::info!("run lost: {reason:?}");
                    self.machine.apply(PhaseEvent::Lose);
                }
            }
        }

        self.frames += 1;
        self.steps += u64::from(steps);
        self.total_time += elapsed;

        let alpha = if self.interpolate {
            self.timestep.alpha() as f32
        } else {
            0.0
        };
        if self.interpolate {
            self.renderer.render(&self.previous, &self.current, alpha);
        } else {
            self.renderer.render(&self.current, &self.current, alpha);
        }

        Ok(FrameReport {
            steps,
            alpha,
            phase: self.machine.phase(),
        })
    }

    fn handle_input(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::Start => {
                if self.machine.apply(PhaseEvent::Start) {
                    self.timestep.reset();
                    self.world.begin_session()?;
                    self.reset_snapshots();
                }
            }
            InputEvent::Pause => {
                self.machine.apply(PhaseEvent::TogglePause);
            }
            InputEvent::Resume => {
                self.machine.apply(PhaseEvent::Resume);
            }
            InputEvent::Acknowledge => {
                if self.machine.apply(PhaseEvent::Acknowledge) {
                    self.world.end_session();
                    self.reset_snapshots();
                }
            }
            InputEvent::Move(direction) => self.world.command_mut().direction = Some(direction),
            InputEvent::Stop => self.world.command_mut().direction = None,
            InputEvent::Fire => self.world.command_mut().fire = true,
        }
        Ok(())
    }

    fn reset_snapshots(&mut self) {
        self.current = self.world.snapshot();
        self.previous = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TILE_SIZE;
    use crate::error::SimError;
    use crate::sim::level::tests::arena;
    use crate::sim::{GridPos, LevelPack};
    use proptest::prelude::*;
    use std::cell::RefCell;

    type Frames = Rc<RefCell<Vec<(Snapshot, Snapshot, f32)>>>;

    #[derive(Default)]
    struct Recorder {
        frames: Frames,
    }

    impl Renderer for Recorder {
        fn render(&mut self, previous: &Snapshot, current: &Snapshot, alpha: f32) {
            self.frames
                .borrow_mut()
                .push((previous.clone(), current.clone(), alpha));
        }
    }

    fn harness(settings: &Settings) -> (GameLoop<Recorder, ManualClock>, ManualClock, Frames) {
        let world = World::new(settings, Box::new(LevelPack::from_levels(vec![arena(1)])));
        let recorder = Recorder::default();
        let frames = recorder.frames.clone();
        let clock = ManualClock::new();
        let game = GameLoop::new(settings, world, recorder, clock.clone()).unwrap();
        (game, clock, frames)
    }

    fn playing(settings: &Settings) -> (GameLoop<Recorder, ManualClock>, ManualClock, Frames) {
        let (mut game, clock, frames) = harness(settings);
        game.start();
        game.push_input(InputEvent::Start);
        game.frame().unwrap();
        assert_eq!(game.phase(), GamePhase::Playing);
        (game, clock, frames)
    }

    #[test]
    fn test_timestep_epsilon_absorbs_rounding() {
        let mut timestep = FixedTimestep::new(1.0 / 60.0, 0.1);
        for _ in 0..3 {
            timestep.accumulate(1.0 / 60.0);
        }
        let mut steps = 0;
        while timestep.consume_step() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert!(timestep.accumulator() < 1e-9);
    }

    #[test]
    fn test_elapsed_is_clamped() {
        let mut timestep = FixedTimestep::new(1.0 / 60.0, 0.1);
        assert_eq!(timestep.accumulate(5.0), 0.1);
        assert_eq!(timestep.accumulate(-1.0), 0.0);
    }

    #[test]
    fn test_menu_does_not_step() {
        let (mut game, clock, frames) = harness(&Settings::default());
        game.start();
        game.frame().unwrap();
        clock.advance(0.05);
        let report = game.frame().unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.phase, GamePhase::Menu);
        assert_eq!(frames.borrow().len(), 2);
    }

    #[test]
    fn test_stopped_loop_ignores_frames() {
        let (mut game, clock, frames) = harness(&Settings::default());
        clock.advance(0.05);
        game.frame().unwrap();
        assert!(frames.borrow().is_empty());

        game.start();
        game.frame().unwrap();
        game.stop();
        game.frame().unwrap();
        assert_eq!(frames.borrow().len(), 1);
        assert_eq!(game.frame_count(), 1);
    }

    #[test]
    fn test_pause_freezes_and_still_renders() {
        let settings = Settings::default();
        let (mut game, clock, frames) = playing(&settings);
        clock.advance(settings.fixed_delta * 2.0);
        assert_eq!(game.frame().unwrap().steps, 2);

        game.push_input(InputEvent::Pause);
        clock.advance(settings.fixed_delta * 3.0);
        let report = game.frame().unwrap();
        assert_eq!(report.phase, GamePhase::Paused);
        assert_eq!(report.steps, 0);
        let tick = game.current_snapshot().tick;

        game.push_input(InputEvent::Pause);
        clock.advance(settings.fixed_delta);
        let report = game.frame().unwrap();
        assert_eq!(report.phase, GamePhase::Playing);
        assert_eq!(report.steps, 1);
        assert_eq!(game.current_snapshot().tick, tick + 1);
        assert_eq!(frames.borrow().len(), 4);
    }

    #[test]
    fn test_paused_frame_does_not_drift() {
        let settings = Settings::default();
        let (mut game, clock, frames) = playing(&settings);
        game.push_input(InputEvent::Move(Direction::Left));
        clock.advance(settings.fixed_delta * 1.3);
        assert_eq!(game.frame().unwrap().steps, 1);

        game.push_input(InputEvent::Stop);
        game.push_input(InputEvent::Pause);
        for fraction in [0.2, 0.5, 0.6, 3.0] {
            clock.advance(settings.fixed_delta * fraction);
            let report = game.frame().unwrap();
            assert_eq!(report.phase, GamePhase::Paused);
            assert_eq!(report.steps, 0);
        }

        let player_x = |(previous, current, alpha): &(Snapshot, Snapshot, f32)| {
            let views = current.blended(previous, *alpha);
            views.iter().find(|view| view.id == 1).unwrap().pos.x
        };
        let frames = frames.borrow();
        let recent = &frames[frames.len() - 5..];
        let moving = player_x(&recent[0]);
        assert!(moving > GridPos::new(1, 4).to_pixel(TILE_SIZE).x);
        for frame in &recent[1..] {
            assert_eq!(frame.2, recent[0].2);
            assert_eq!(player_x(frame), moving);
        }
    }

    #[test]
    fn test_interpolation_factor() {
        let settings = Settings::default();
        let (mut game, clock, frames) = playing(&settings);
        game.push_input(InputEvent::Move(Direction::Left));
        clock.advance(settings.fixed_delta * 1.5);
        let report = game.frame().unwrap();
        assert_eq!(report.steps, 1);
        assert!((report.alpha - 0.5).abs() < 1e-4);

        let frames = frames.borrow();
        let (previous, current, alpha) = frames.last().unwrap();
        assert_eq!(previous.tick + 1, current.tick);
        assert!((alpha - 0.5).abs() < 1e-4);
        let player = current.entities.iter().find(|e| e.id == 1).unwrap();
        assert_eq!(player.pos, GridPos::new(1, 4).to_pixel(TILE_SIZE));
    }

    #[test]
    fn test_no_interpolation_passes_current_twice() {
        let settings = Settings {
            interpolate: false,
            ..Default::default()
        };
        let (mut game, clock, frames) = playing(&settings);
        clock.advance(settings.fixed_delta * 1.5);
        let report = game.frame().unwrap();
        assert_eq!(report.alpha, 0.0);

        let frames = frames.borrow();
        let (previous, current, alpha) = frames.last().unwrap();
        assert_eq!(previous, current);
        assert_eq!(*alpha, 0.0);
    }

    #[test]
    fn test_inputs_latch_player_command() {
        let settings = Settings::default();
        let (mut game, clock, _) = playing(&settings);
        game.push_input(InputEvent::Move(Direction::Left));
        game.push_input(InputEvent::Fire);
        clock.advance(settings.fixed_delta);
        game.frame().unwrap();

        assert_eq!(game.world().entities().player.cell, GridPos::new(1, 4));
        assert_eq!(game.world().entities().bullets.active_count(), 1);

        game.push_input(InputEvent::Stop);
        clock.advance(settings.fixed_delta * 6.0);
        game.frame().unwrap();
        assert_eq!(game.world().entities().player.cell, GridPos::new(1, 4));
    }

    #[test]
    fn test_defeat_ends_run_and_acknowledge_returns_to_menu() {
        let settings = Settings::default();
        let (mut game, clock, _) = playing(&settings);
        game.world.entities_mut().lives = 0;
        clock.advance(settings.fixed_delta * 3.0);
        let report = game.frame().unwrap();
        assert_eq!(report.phase, GamePhase::GameOver);
        assert_eq!(report.steps, 1);

        let events = game.drain_level_events();
        assert!(events.contains(&LevelEvent::GameOver {
            victory: false,
            final_level: 1
        }));

        game.push_input(InputEvent::Acknowledge);
        game.frame().unwrap();
        assert_eq!(game.phase(), GamePhase::Menu);
        assert!(game.current_snapshot().entities.is_empty());
    }

    #[test]
    fn test_fatal_error_reported_once() {
        let mut broken = arena(1);
        broken.grid[1].pop();
        let settings = Settings::default();
        let world = World::new(&settings, Box::new(LevelPack::from_levels(vec![broken])));
        let clock = ManualClock::new();
        let mut calls = 0;
        let renderer = |_: &Snapshot, _: &Snapshot, _: f32| calls += 1;
        let mut game = GameLoop::new(&settings, world, renderer, clock.clone()).unwrap();

        game.start();
        game.push_input(InputEvent::Start);
        let err = game.frame().unwrap_err();
        assert!(matches!(err, SimError::MalformedLevel { level: 1, .. }));
        assert!(game.is_halted());

        clock.advance(0.05);
        assert!(game.frame().is_ok());
        assert!(!game.is_running());
        drop(game);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_simulation_rate() {
        let settings = Settings::default();
        let (mut game, clock, _) = playing(&settings);
        // No enemies, so nothing can end the level early
        game.world.entities_mut().spawn_timer = -1.0e6;
        for _ in 0..60 {
            clock.advance(settings.fixed_delta);
            game.frame().unwrap();
        }
        assert!((game.simulation_rate() - 60.0).abs() < 0.5);
    }

    proptest! {
        #[test]
        fn prop_frame_split_does_not_change_simulation(k in 1u32..10) {
            let settings = Settings {
                max_delta: 1.0,
                ..Default::default()
            };
            let run = |split: bool| {
                let (mut game, clock, _) = playing(&settings);
                game.push_input(InputEvent::Move(Direction::Left));
                game.push_input(InputEvent::Fire);
                if split {
                    for _ in 0..k {
                        clock.advance(settings.fixed_delta);
                        game.frame().unwrap();
                    }
                } else {
                    clock.advance(settings.fixed_delta * f64::from(k));
                    game.frame().unwrap();
                }
                (game.step_count(), game.current_snapshot().clone())
            };

            let (split_steps, split) = run(true);
            let (single_steps, single) = run(false);
            prop_assert_eq!(split_steps, u64::from(k));
            prop_assert_eq!(single_steps, u64::from(k));
            prop_assert_eq!(split, single);
        }
    }
}
