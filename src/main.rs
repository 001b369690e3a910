//! Tank Arena headless runner
//!
//! Plays the bundled level pack with a scripted player on a synthetic clock
//! and logs progress. Usage: `tank-arena [settings.json]`

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use tank_arena::sim::{Direction, GamePhase, LevelEvent, LevelPack, Snapshot, World};
use tank_arena::{GameLoop, InputEvent, ManualClock, Result, Settings};

const LEVELS_JSON: &str = include_str!("../assets/levels.json");

/// Simulated run length in seconds
const RUN_SECONDS: f64 = 600.0;

/// Uneven frame spacing, to show the simulation does not depend on it
const FRAME_TIMES: [f64; 4] = [1.0 / 144.0, 1.0 / 60.0, 1.0 / 30.0, 0.25];

fn main() {
    env_logger::init();
    log::info!("Tank Arena (headless) starting...");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let pack = LevelPack::from_json(LEVELS_JSON)?;
    log::info!("loaded {} levels ({})", pack.levels.len(), pack.meta.description);

    let world = World::new(&settings, Box::new(pack));
    for info in world.levels().level_infos() {
        log::info!(
            "  level {}: {} [{:?}] {} enemies",
            info.id,
            info.name,
            info.difficulty,
            info.enemy_count
        );
    }

    let clock = ManualClock::new();
    let mut last_hud = 0u64;
    let renderer = move |_: &Snapshot, current: &Snapshot, _: f32| {
        // Log a HUD line every ten simulated seconds
        if current.tick >= last_hud + 600 {
            last_hud = current.tick;
            log::info!(
                "tick {}: level {} score {} lives {} enemies left {}",
                current.tick,
                current.level,
                current.score,
                current.lives,
                current.enemies_remaining
            );
        }
    };

    let mut game = GameLoop::new(&settings, world, renderer, clock.clone())?;
    let mut pilot = Pcg32::seed_from_u64(settings.seed ^ 0x9e37_79b9);

    game.start();
    game.push_input(InputEvent::Start);

    let mut elapsed = 0.0;
    let mut frame = 0usize;
    while elapsed < RUN_SECONDS && game.is_running() {
        if frame % 30 == 0 {
            let direction = Direction::ALL[pilot.random_range(0..Direction::ALL.len())];
            game.push_input(InputEvent::Move(direction));
        }
        if pilot.random_bool(0.05) {
            game.push_input(InputEvent::Fire);
        }

        let dt = FRAME_TIMES[frame % FRAME_TIMES.len()];
        clock.advance(dt);
        elapsed += dt;
        frame += 1;

        let report = game.frame()?;
        for event in game.drain_level_events() {
            log_event(&event);
        }
        if matches!(report.phase, GamePhase::GameOver | GamePhase::Victory) {
            break;
        }
    }
    game.stop();

    let world = game.world();
    let bullets = world.entities().bullets.stats();
    let enemies = world.entities().enemies.stats();
    log::info!(
        "finished in phase {:?}: {} frames, {} steps ({:.1} steps/s)",
        game.phase(),
        game.frame_count(),
        game.step_count(),
        game.simulation_rate()
    );
    log::info!(
        "bullet pool: {}/{} active ({:.0}%)",
        bullets.active,
        bullets.total,
        bullets.utilization * 100.0
    );
    log::info!(
        "enemy pool: {}/{} active ({:.0}%)",
        enemies.active,
        enemies.total,
        enemies.utilization * 100.0
    );
    log::info!("final score {}", world.entities().score);
    Ok(())
}

fn log_event(event: &LevelEvent) {
    match event {
        LevelEvent::Started { level, name } => log::info!("level {level} started: {name}"),
        LevelEvent::Completed { level, stars } => {
            log::info!("level {level} complete, {stars} stars")
        }
        LevelEvent::GameOver {
            victory,
            final_level,
        } => log::info!(
            "game over at level {final_level}: {}",
            if *victory { "victory" } else { "defeat" }
        ),
    }
}
