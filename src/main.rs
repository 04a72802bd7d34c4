/// Entry point and host loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::assets::FrameLibrary;
use sim::clock::{Clock, MonotonicClock};
use sim::event::GameEvent;
use sim::level::{LevelError, LevelSet};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::input::{InputState, KEYS_QUIT, KEYS_RESTART};
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "dualdimension.log";

/// HUD message lifetimes, in ticks.
const SHORT_MESSAGE: u32 = 90;
const DIALOG_MESSAGE: u32 = 240;

fn main() {
    init_logging();
    let config = GameConfig::load();

    let frames = FrameLibrary::load(&config.assets_dir);
    let levels = match LevelSet::scan(&config.levels_dir) {
        Ok(levels) => levels,
        Err(e @ LevelError::NoLevels { .. }) => {
            warn!("{e}; playing the built-in level");
            LevelSet::embedded()
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Level setup failed: {e}");
            return;
        }
    };

    let mut world = match WorldState::new(config, levels, frames) {
        Ok(world) => world,
        Err(e) => {
            error!("{e}");
            eprintln!("Level setup failed: {e}");
            return;
        }
    };

    let mut renderer = Renderer::new();
    let enhanced = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let result = game_loop(&mut world, &mut renderer, enhanced);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("{e}");
        eprintln!("Game error: {e}");
    }

    println!();
    match world.phase {
        Phase::Victory => println!("Both worlds are safe. Thanks for playing Dual Dimension!"),
        _ => println!("Thanks for playing Dual Dimension!"),
    }
    println!("Reached level {} with {} hearts.", world.current_level + 1, world.player.hearts.max(0));
}

/// File subscriber; stderr would tear the alternate screen. `RUST_LOG`
/// overrides the default `info` filter.
fn init_logging() {
    let Ok(file) = File::create(LOG_FILE) else { return };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    enhanced_keys: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced_keys;
    let clock = MonotonicClock::new();
    let tick_rate = Duration::from_millis(world.config.timing.frame_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) {
            break;
        }
        if world.phase == Phase::GameOver && kb.any_pressed(KEYS_RESTART) {
            world.restart_level()?;
            world.set_message("Level restarted", SHORT_MESSAGE);
        }

        if last_tick.elapsed() >= tick_rate {
            let input = kb.take_frame_input();
            let events = step::step(world, input, clock.now_ms())?;
            report_events(world, &events);
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    info!(level = world.current_level + 1, phase = ?world.phase, "quit");
    Ok(())
}

/// Log every event and surface the ones the player should read.
fn report_events(world: &mut WorldState, events: &[GameEvent]) {
    for event in events {
        debug!(?event, "game event");
        match event {
            GameEvent::PlayerDamaged { hearts, .. } => {
                world.set_message(&format!("Ouch! {hearts} hearts left"), SHORT_MESSAGE);
            }
            GameEvent::BossHit { health } => {
                world.set_message(&format!("Boss health: {health}"), SHORT_MESSAGE);
            }
            GameEvent::EnemyKilled { kind } => {
                info!(?kind, "enemy killed");
            }
            GameEvent::LevelAdvanced { level } => {
                world.set_message(&format!("Level {}", level + 1), SHORT_MESSAGE);
            }
            GameEvent::NpcSays { line } => {
                world.set_message(line, DIALOG_MESSAGE);
            }
            _ => {}
        }
    }
}
