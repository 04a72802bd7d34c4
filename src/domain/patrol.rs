/// Patrol enemy: walks between two x bounds, freezes after touching the player.
///
/// ```text
///   run ──(centerx reaches bound)──▶ flip direction, keep running
///   run ──(player contact)─────────▶ idle (timed, or locked until respawn)
///   any ──(killed)─────────────────▶ death ──(removal delay)──▶ purged
/// ```

use super::animation::{AnimState, FrameSet};
use super::enemy::{AiContext, Blocking, Hazardous};
use super::entity::{Cooldown, Entity, Facing};
use super::geom::Rect;

pub const PATROL_W: f32 = 30.0;
pub const PATROL_H: f32 = 30.0;
pub const PATROL_SPEED: f32 = 2.0;
const DEFAULT_HALF_RANGE: f32 = 80.0;
const CONTACT_IDLE_MS: u64 = 400;
const REMOVE_AFTER_DEATH_MS: u64 = 1500;

const NON_LOOPING: &[AnimState] = &[AnimState::Death];

#[derive(Clone, Debug)]
pub struct Patrol {
    pub entity: Entity,
    pub left_bound: f32,
    pub right_bound: f32,
    pub speed: f32,
    /// Timed freeze after touching the player.
    contact_idle: Cooldown,
    /// Freeze until cleared externally (set by the damage pass on contact).
    pub permanent_idle: bool,
    removal: Option<Cooldown>,
}

impl Patrol {
    /// Bounds default to `centerx ± 80` and are swapped when inverted.
    pub fn new(x: f32, bottom: f32, bounds: Option<(f32, f32)>, facing: Facing) -> Self {
        let mut entity = Entity::new(x, bottom, PATROL_W, PATROL_H, AnimState::Run, NON_LOOPING);
        entity.facing = facing;
        let cx = entity.rect().centerx();
        let (mut left, mut right) = bounds.unwrap_or((cx - DEFAULT_HALF_RANGE, cx + DEFAULT_HALF_RANGE));
        if left > right { std::mem::swap(&mut left, &mut right); }
        Patrol {
            entity,
            left_bound: left,
            right_bound: right,
            speed: PATROL_SPEED,
            contact_idle: Cooldown::new(CONTACT_IDLE_MS),
            permanent_idle: false,
            removal: None,
        }
    }

    pub fn on_player_contact(&mut self, now: u64) {
        if !self.entity.alive { return; }
        self.permanent_idle = true;
        self.contact_idle.extend(now);
    }

    pub fn clear_contact_idle(&mut self) {
        self.permanent_idle = false;
        self.contact_idle.clear();
    }

    pub fn is_idling(&self, now: u64) -> bool {
        self.permanent_idle || !self.contact_idle.is_ready(now)
    }

    pub fn is_dying(&self) -> bool { self.removal.is_some() }

    pub fn ready_for_removal(&self, now: u64) -> bool {
        self.removal.map_or(false, |r| r.is_ready(now))
    }

    pub fn on_killed_by_player(&mut self, now: u64) {
        if self.is_dying() { return; }
        self.entity.alive = false;
        self.entity.body.vel.x = 0.0;
        self.removal = Some(Cooldown::started(now, REMOVE_AFTER_DEATH_MS));
    }

    pub fn compute_state(&self, now: u64) -> AnimState {
        if !self.entity.alive { return AnimState::Death; }
        if self.is_idling(now) { AnimState::Idle } else { AnimState::Run }
    }

    pub fn update(&mut self, ctx: &AiContext, frames: &FrameSet) {
        if !self.entity.alive {
            self.entity.body.vel.x = 0.0;
        } else if self.is_idling(ctx.now) {
            self.entity.body.vel.x = 0.0;
        } else {
            let cx = self.entity.rect().centerx();
            match self.entity.facing {
                Facing::Right if cx >= self.right_bound => self.entity.facing = Facing::Left,
                Facing::Left if cx <= self.left_bound => self.entity.facing = Facing::Right,
                _ => {}
            }
            self.entity.body.vel.x = self.speed * self.entity.dir();
        }

        let state = self.compute_state(ctx.now);
        self.entity.step(state, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
    }
}

impl Hazardous for Patrol {
    /// The whole body hurts on contact while alive.
    fn hazard_rect(&self) -> Option<Rect> {
        if !self.entity.alive || self.is_dying() { return None; }
        Some(*self.entity.rect())
    }
}

impl Blocking for Patrol {
    fn block_rect(&self) -> Rect {
        *self.entity.rect()
    }
}
