/// Chaser enemy: notices the player, runs at them, swings when in range.
///
/// ```text
///   idle ──(player in detection box / jumps over)──▶ run (alerted)
///   run  ──(in attack range, cooldown ready)───────▶ attack
///   attack ──(finished, hit landed)──▶ combat_idle ──(timer)──▶ run / idle
///   attack ──(finished, missed)──────▶ run / idle
///   any  ──(killed)──▶ hurt ──▶ death ──(removal delay)──▶ purged
/// ```
///
/// The swing only hurts on its hit frames, and at most once per swing.

use super::animation::{AnimState, FrameSet};
use super::enemy::{AiContext, Blocking, Hazardous};
use super::entity::{Cooldown, Entity, Facing};
use super::geom::Rect;
use super::physics;

pub const CHASER_W: f32 = 50.0;
pub const CHASER_H: f32 = 50.0;
pub const CHASER_SPEED: f32 = 2.5;
pub const HEAVY_CHASER_SPEED: f32 = 2.2;

const DETECT_DX: f32 = 250.0;
const DETECT_DY: f32 = 80.0;
const JUMP_OVER_HEIGHT: f32 = 160.0;
const GIVE_UP_DX: f32 = 400.0;
const ATTACK_DX: f32 = 45.0;
const ATTACK_DY: f32 = 40.0;
const ATTACK_COOLDOWN_MS: u64 = 900;
const COMBAT_IDLE_MS: u64 = 800;
const HIT_FRAMES: &[usize] = &[3, 4];
const SWING_W: f32 = 40.0;
const SWING_H: f32 = 35.0;
const REMOVE_AFTER_KILL_MS: u64 = 5000;
const REMOVE_AFTER_DEATH_MS: u64 = 1500;

const NON_LOOPING: &[AnimState] = &[AnimState::Attack, AnimState::Hurt, AnimState::Death];

#[derive(Clone, Debug)]
pub struct Chaser {
    pub entity: Entity,
    pub heavy: bool,
    pub speed: f32,
    pub alerted: bool,
    /// Hold `combat_idle` until respawn (set by the damage pass).
    pub permanent_combat_idle: bool,
    attack_cd: Cooldown,
    combat_idle: Cooldown,
    hit_landed: bool,
    removal: Option<Cooldown>,
}

impl Chaser {
    pub fn new(x: f32, bottom: f32, facing: Facing, heavy: bool) -> Self {
        let mut entity = Entity::new(x, bottom, CHASER_W, CHASER_H, AnimState::Idle, NON_LOOPING);
        entity.facing = facing;
        Chaser {
            entity,
            heavy,
            speed: if heavy { HEAVY_CHASER_SPEED } else { CHASER_SPEED },
            alerted: false,
            permanent_combat_idle: false,
            attack_cd: Cooldown::new(ATTACK_COOLDOWN_MS),
            combat_idle: Cooldown::new(COMBAT_IDLE_MS),
            hit_landed: false,
            removal: None,
        }
    }

    pub fn is_dying(&self) -> bool { self.removal.is_some() }

    pub fn ready_for_removal(&self, now: u64) -> bool {
        self.removal.map_or(false, |r| r.is_ready(now))
    }

    pub fn hit_landed(&self) -> bool { self.hit_landed }

    /// Is the swing currently on one of its damaging frames?
    pub fn in_hit_window(&self) -> bool {
        self.entity.state() == AnimState::Attack && HIT_FRAMES.contains(&self.entity.anim.frame())
    }

    /// The swing connected with the player during this attack cycle.
    pub fn record_hit(&mut self) {
        self.hit_landed = true;
    }

    /// Freeze in `combat_idle` after hurting the player.
    pub fn force_combat_idle(&mut self) {
        self.permanent_combat_idle = true;
        self.entity.force_state(AnimState::CombatIdle);
        self.entity.body.vel.x = 0.0;
    }

    pub fn on_killed_by_player(&mut self, now: u64, frames: &FrameSet) {
        if self.is_dying() { return; }
        self.entity.alive = false;
        self.entity.body.vel.x = 0.0;
        self.alerted = false;
        let first = if frames.has(AnimState::Hurt) { AnimState::Hurt } else { AnimState::Death };
        self.entity.force_state(first);
        let delay = if first == AnimState::Death { REMOVE_AFTER_DEATH_MS } else { REMOVE_AFTER_KILL_MS };
        self.removal = Some(Cooldown::started(now, delay));
    }

    /// Player in the detection box, or passing overhead within jump height.
    fn detects(&self, target: &Rect) -> bool {
        let r = self.entity.rect();
        let (dx, dy) = r.center_delta(target);
        if dx <= DETECT_DX && dy <= DETECT_DY { return true; }
        let above = target.bottom() <= r.top() && r.top() - target.bottom() <= JUMP_OVER_HEIGHT;
        above && r.contains_x(target.centerx())
    }

    pub fn update(&mut self, ctx: &AiContext, frames: &FrameSet) {
        if self.is_dying() {
            self.update_dying(ctx, frames);
            return;
        }
        if self.permanent_combat_idle {
            self.entity.body.vel.x = 0.0;
            self.entity.step(AnimState::CombatIdle, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
            return;
        }

        let next = match self.entity.state() {
            AnimState::Attack => {
                self.entity.body.vel.x = 0.0;
                AnimState::Attack
            }
            AnimState::CombatIdle if !self.combat_idle.is_ready(ctx.now) => {
                self.entity.body.vel.x = 0.0;
                AnimState::CombatIdle
            }
            _ => self.think(ctx),
        };

        let finished = self.entity.step(next, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
        if finished && next == AnimState::Attack {
            if self.hit_landed {
                self.combat_idle.restart(ctx.now);
                self.entity.force_state(AnimState::CombatIdle);
            } else {
                self.entity.force_state(if self.alerted { AnimState::Run } else { AnimState::Idle });
            }
            self.hit_landed = false;
        }
    }

    /// Pick velocity and state from the player's position.
    fn think(&mut self, ctx: &AiContext) -> AnimState {
        let target = match ctx.target {
            Some(t) => t,
            None => {
                self.alerted = false;
                self.entity.body.vel.x = 0.0;
                return AnimState::Idle;
            }
        };

        if self.detects(&target) { self.alerted = true; }
        let (dx, dy) = self.entity.rect().center_delta(&target);
        if dx > GIVE_UP_DX { self.alerted = false; }
        if !self.alerted {
            self.entity.body.vel.x = 0.0;
            return AnimState::Idle;
        }

        self.entity.facing = Facing::toward(self.entity.rect().centerx(), target.centerx());

        if dx <= ATTACK_DX && dy <= ATTACK_DY {
            self.entity.body.vel.x = 0.0;
            if !self.attack_cd.is_ready(ctx.now) { return AnimState::Idle; }
            self.attack_cd.restart(ctx.now);
            self.hit_landed = false;
            self.entity.force_state(AnimState::Attack);
            return AnimState::Attack;
        }

        if physics::ground_ahead(self.entity.rect(), self.entity.dir(), ctx.platforms) {
            self.entity.body.vel.x = self.speed * self.entity.dir();
            AnimState::Run
        } else {
            self.entity.body.vel.x = 0.0;
            AnimState::Idle
        }
    }

    fn update_dying(&mut self, ctx: &AiContext, frames: &FrameSet) {
        self.entity.body.vel.x = 0.0;
        let state = self.entity.state();
        let finished = self.entity.step(state, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
        if finished && state == AnimState::Hurt {
            self.entity.force_state(AnimState::Death);
            self.removal = Some(Cooldown::started(ctx.now, REMOVE_AFTER_DEATH_MS));
        }
    }
}

impl Hazardous for Chaser {
    /// The swing box in front of the body, during hit frames of an
    /// attack that has not connected yet.
    fn hazard_rect(&self) -> Option<Rect> {
        if self.is_dying() || !self.entity.alive { return None; }
        if !self.in_hit_window() || self.hit_landed { return None; }
        let r = self.entity.rect();
        let x = match self.entity.facing {
            Facing::Right => r.right(),
            Facing::Left => r.left() - SWING_W,
        };
        Some(Rect::new(x, r.centery() - SWING_H / 2.0, SWING_W, SWING_H))
    }
}

impl Blocking for Chaser {
    fn block_rect(&self) -> Rect {
        *self.entity.rect()
    }
}
