/// End-of-level walk-off.
///
/// ```text
///   player touches end marker ──▶ input locked, camera pinned
///        │  every frame: walk forward at 80% speed
///        │  (jump_walk: one jump, the first time the player is grounded)
///        ▼
///   player leaves the screen or the level ──▶ unlock, next level
/// ```

use tracing::info;

use crate::domain::entity::{Facing, SpriteKind};
use crate::domain::geom::Rect;
use super::event::GameEvent;
use super::level::{EndMode, LevelError};
use super::world::{EndSequence, WorldState};

const WALK_FACTOR: f32 = 0.8;
const JUMP_FACTOR: f32 = 0.6;
const EXIT_MARGIN: f32 = 40.0;

pub fn start(world: &mut WorldState, mode: EndMode, events: &mut Vec<GameEvent>) {
    if world.end_sequence.is_some() { return; }
    world.end_sequence = Some(EndSequence { mode, dir: Facing::Right, jump_started: false });
    world.input_locked = true;
    let x = world.player.rect().centerx();
    world.camera.lock(x);
    info!(?mode, x, "end sequence started");
    events.push(GameEvent::EndSequenceStarted { mode });
}

/// Drive the player one frame. Returns true once the level has been left
/// (the next level is loaded, or the game is won).
pub fn update(world: &mut WorldState, platforms: &[Rect], events: &mut Vec<GameEvent>) -> Result<bool, LevelError> {
    let Some(mut seq) = world.end_sequence else { return Ok(false) };
    let tuning = &world.config.physics;
    let player = &mut world.player;

    player.walking = true;
    player.entity.facing = seq.dir;
    let body = &mut player.entity.body;
    body.vel.x = tuning.player_speed * WALK_FACTOR * seq.dir.sign();
    if seq.mode == EndMode::JumpWalk && !seq.jump_started && body.on_ground {
        body.vel.y = -tuning.jump_strength * JUMP_FACTOR;
        seq.jump_started = true;
    }
    player.step(platforms, world.frames.get(SpriteKind::Player), tuning);
    world.end_sequence = Some(seq);

    if !has_exited(world) { return Ok(false); }

    world.end_sequence = None;
    world.input_locked = false;
    world.camera.unlock();
    info!(level = world.current_level + 1, "end sequence complete");
    if world.advance_level()? {
        events.push(GameEvent::LevelAdvanced { level: world.current_level });
    } else {
        events.push(GameEvent::Victory);
    }
    Ok(true)
}

/// Off either side of the viewport by the margin, or past the level's end.
fn has_exited(world: &WorldState) -> bool {
    let rect = world.player.rect();
    let (offset_x, _) = world.camera_offset();
    let screen_x = rect.x - offset_x;
    screen_x > world.camera.viewport_w + EXIT_MARGIN
        || screen_x + rect.w < -EXIT_MARGIN
        || rect.left() > world.level_width + EXIT_MARGIN
}
