/// The player: input response, hearts, dimension shifting, attack swing,
/// and the hazard check that turns overlaps into damage.
///
/// Death comes in two flavours:
///   - temporary: hearts remain, the death animation plays, then respawn
///   - terminal:  hearts reached zero, no respawn

use crate::config::PhysicsConfig;
use super::animation::{AnimState, FrameSet};
use super::entity::{Cooldown, Dimension, Entity, Facing};
use super::geom::Rect;

pub const PLAYER_W: f32 = 21.0;
pub const PLAYER_H: f32 = 38.0;
const ATTACK_REACH: f32 = 30.0;
const ATTACK_HEIGHT: f32 = 30.0;

const NON_LOOPING: &[AnimState] = &[AnimState::Death];

/// One frame of player intent.
/// Movement keys are held state; the rest are fresh presses.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub shift: bool,
    pub attack: bool,
    pub talk: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DamageCause {
    Fall,
    /// Index into the hazard slice of the first overlapping rectangle.
    Hazard(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DamageOutcome {
    pub cause: DamageCause,
    pub temporary_death: bool,
    pub delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub entity: Entity,
    pub hearts: i32,
    pub start_hearts: i32,
    pub in_gema: bool,
    pub walking: bool,
    attack_cd: Cooldown,
    swing: bool,
}

impl Player {
    pub fn new(x: f32, bottom: f32, start_hearts: i32, attack_cooldown_ms: u64) -> Self {
        let mut entity = Entity::new(x, bottom, PLAYER_W, PLAYER_H, AnimState::Idle, NON_LOOPING);
        entity.body.on_ground = true;
        Player {
            entity,
            hearts: start_hearts,
            start_hearts,
            in_gema: false,
            walking: false,
            attack_cd: Cooldown::new(attack_cooldown_ms),
            swing: false,
        }
    }

    pub fn rect(&self) -> &Rect { &self.entity.body.rect }
    pub fn alive(&self) -> bool { self.entity.alive }

    pub fn dimension(&self) -> Dimension {
        if self.in_gema { Dimension::Gema } else { Dimension::Normal }
    }

    // ── Input ──

    /// Held movement keys drive horizontal velocity; presses fire actions.
    pub fn handle_input(&mut self, input: &FrameInput, tuning: &PhysicsConfig, now: u64) {
        if !self.entity.alive { return; }

        self.walking = false;
        let vel = &mut self.entity.body.vel;
        if input.left {
            vel.x = -tuning.player_speed;
            self.entity.facing = Facing::Left;
            self.walking = true;
        } else if input.right {
            vel.x = tuning.player_speed;
            self.entity.facing = Facing::Right;
            self.walking = true;
        } else {
            vel.x = 0.0;
        }

        if input.jump { self.jump(tuning.jump_strength); }
        if input.shift { self.shift_dimension(); }
        if input.attack { self.begin_attack(now); }
    }

    pub fn jump(&mut self, strength: f32) {
        if self.entity.body.on_ground && self.entity.alive {
            self.entity.body.vel.y = -strength;
        }
    }

    pub fn shift_dimension(&mut self) {
        if self.entity.alive { self.in_gema = !self.in_gema; }
    }

    /// Start a swing if the attack cooldown allows. The hitbox is live for
    /// this frame only.
    pub fn begin_attack(&mut self, now: u64) -> bool {
        if !self.entity.alive || !self.attack_cd.is_ready(now) { return false; }
        self.attack_cd.restart(now);
        self.swing = true;
        true
    }

    pub fn attack_hitbox(&self) -> Option<Rect> {
        if !self.swing || !self.entity.alive { return None; }
        let r = self.rect();
        let x = match self.entity.facing {
            Facing::Right => r.right(),
            Facing::Left => r.left() - ATTACK_REACH,
        };
        Some(Rect::new(x, r.centery() - ATTACK_HEIGHT / 2.0, ATTACK_REACH, ATTACK_HEIGHT))
    }

    pub fn end_swing(&mut self) {
        self.swing = false;
    }

    // ── Per-frame update ──

    pub fn compute_state(&self) -> AnimState {
        if !self.entity.alive { return AnimState::Death; }
        if !self.entity.body.on_ground {
            if self.entity.body.vel.y < 0.0 { AnimState::Jump } else { AnimState::Fall }
        } else if self.walking {
            AnimState::Run
        } else {
            AnimState::Idle
        }
    }

    /// Physics then animation. Returns true when the death animation ends.
    pub fn step(&mut self, platforms: &[Rect], frames: &FrameSet, tuning: &PhysicsConfig) -> bool {
        crate::domain::physics::integrate(
            &mut self.entity.body, self.entity.alive, platforms, tuning.gravity,
        );
        let state = self.compute_state();
        self.entity.anim.tick(state, frames, tuning.animation_speed)
    }

    /// Is the death animation done (or absent) so the respawn delay may run?
    pub fn death_animation_done(&self, frames: &FrameSet) -> bool {
        self.entity.state() != AnimState::Death
            || self.entity.anim.is_finished()
            || !frames.has(AnimState::Death)
    }

    // ── Damage ──

    pub fn take_damage(&mut self) {
        if !self.entity.alive { return; }
        self.hearts -= 1;
        if self.hearts <= 0 { self.die(); }
    }

    pub fn die(&mut self) {
        if !self.entity.alive { return; }
        self.entity.alive = false;
        self.walking = false;
        self.swing = false;
        self.entity.anim.set_state(AnimState::Death);
        self.entity.anim.restart();
    }

    /// Check the fall limit first, then every hazard rectangle.
    /// A hit costs one heart and always kills: terminally when hearts are
    /// gone, otherwise temporarily with `respawn_delay_ms`.
    pub fn apply_hazards(&mut self, hazards: &[Rect], fall_limit_y: f32,
                         respawn_delay_ms: u64) -> Option<DamageOutcome> {
        if !self.entity.alive { return None; }

        let cause = if self.rect().top() > fall_limit_y {
            DamageCause::Fall
        } else {
            let r = *self.rect();
            DamageCause::Hazard(hazards.iter().position(|h| r.overlaps(h))?)
        };

        self.take_damage();
        if !self.entity.alive {
            return Some(DamageOutcome { cause, temporary_death: false, delay_ms: 0 });
        }
        self.die();
        Some(DamageOutcome { cause, temporary_death: true, delay_ms: respawn_delay_ms })
    }

    pub fn respawn(&mut self, start: (f32, f32)) {
        let body = &mut self.entity.body;
        body.rect.set_bottomleft(start.0, start.1);
        body.vel.x = 0.0;
        body.vel.y = 0.0;
        body.on_ground = true;
        self.entity.alive = true;
        self.walking = false;
        self.swing = false;
        self.entity.anim.set_state(AnimState::Idle);
        self.entity.anim.restart();
        if self.hearts <= 0 { self.hearts = self.start_hearts; }
    }
}
