/// Enemy roster: the closed set of hostile kinds and the capabilities
/// the damage pass asks of them.
///
/// ```text
///   Enemy::Patrol ── Hazardous (body)   ── Blocking
///   Enemy::Chaser ── Hazardous (swing)  ── Blocking
///   Enemy::Boss   ── Hazardous (melee)  ── (passes through the player)
/// ```

use super::animation::FrameSet;
use super::boss::Boss;
use super::chaser::Chaser;
use super::entity::{Entity, Facing, SpriteKind};
use super::geom::Rect;
use super::patrol::Patrol;

/// Something that can hurt the player this frame.
pub trait Hazardous {
    fn hazard_rect(&self) -> Option<Rect>;
}

/// Something the player cannot walk through.
pub trait Blocking {
    fn block_rect(&self) -> Rect;
}

/// Read-only view of the world handed to every enemy update.
#[derive(Clone, Copy, Debug)]
pub struct AiContext<'a> {
    pub platforms: &'a [Rect],
    /// The player's rectangle, only while the player is alive.
    pub target: Option<Rect>,
    pub now: u64,
    pub gravity: f32,
    pub anim_speed: u32,
}

/// A spell the boss asked to spawn at `(x, y)` (top-left).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpellCast {
    pub x: f32,
    pub y: f32,
}

/// Level-file spawn descriptor; enough to rebuild an enemy on respawn.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EnemySpawn {
    Patrol { x: f32, bottom: f32, bounds: Option<(f32, f32)>, facing: Facing },
    Chaser { x: f32, bottom: f32, facing: Facing, heavy: bool },
    Boss { x: f32, bottom: f32, facing: Facing },
}

impl EnemySpawn {
    pub fn build(&self) -> Enemy {
        match *self {
            EnemySpawn::Patrol { x, bottom, bounds, facing } =>
                Enemy::Patrol(Patrol::new(x, bottom, bounds, facing)),
            EnemySpawn::Chaser { x, bottom, facing, heavy } =>
                Enemy::Chaser(Chaser::new(x, bottom, facing, heavy)),
            EnemySpawn::Boss { x, bottom, facing } =>
                Enemy::Boss(Boss::new(x, bottom, facing)),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Enemy {
    Patrol(Patrol),
    Chaser(Chaser),
    Boss(Boss),
}

impl Enemy {
    pub fn entity(&self) -> &Entity {
        match self {
            Enemy::Patrol(p) => &p.entity,
            Enemy::Chaser(c) => &c.entity,
            Enemy::Boss(b) => &b.entity,
        }
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        match self {
            Enemy::Patrol(p) => &mut p.entity,
            Enemy::Chaser(c) => &mut c.entity,
            Enemy::Boss(b) => &mut b.entity,
        }
    }

    pub fn rect(&self) -> &Rect { self.entity().rect() }

    pub fn sprite(&self) -> SpriteKind {
        match self {
            Enemy::Patrol(_) => SpriteKind::Patrol,
            Enemy::Chaser(c) if c.heavy => SpriteKind::HeavyChaser,
            Enemy::Chaser(_) => SpriteKind::Chaser,
            Enemy::Boss(_) => SpriteKind::Boss,
        }
    }

    pub fn is_dying(&self) -> bool {
        match self {
            Enemy::Patrol(p) => p.is_dying(),
            Enemy::Chaser(c) => c.is_dying(),
            Enemy::Boss(b) => b.is_dying(),
        }
    }

    /// Alive and not on the way out: can be hit by the player's swing.
    pub fn is_active(&self) -> bool {
        self.entity().alive && !self.is_dying()
    }

    pub fn ready_for_removal(&self, now: u64) -> bool {
        match self {
            Enemy::Patrol(p) => p.ready_for_removal(now),
            Enemy::Chaser(c) => c.ready_for_removal(now),
            Enemy::Boss(b) => b.ready_for_removal(now),
        }
    }

    /// One frame of AI, physics and animation. Only the boss ever asks
    /// for a spell.
    pub fn update(&mut self, ctx: &AiContext, frames: &FrameSet) -> Option<SpellCast> {
        match self {
            Enemy::Patrol(p) => { p.update(ctx, frames); None }
            Enemy::Chaser(c) => { c.update(ctx, frames); None }
            Enemy::Boss(b) => b.update(ctx, frames),
        }
    }

    pub fn hazard(&self) -> Option<Rect> {
        match self {
            Enemy::Patrol(p) => p.hazard_rect(),
            Enemy::Chaser(c) => c.hazard_rect(),
            Enemy::Boss(b) => b.hazard_rect(),
        }
    }

    pub fn as_blocking(&self) -> Option<&dyn Blocking> {
        match self {
            Enemy::Patrol(p) => Some(p),
            Enemy::Chaser(c) => Some(c),
            Enemy::Boss(_) => None,
        }
    }

    /// The player's swing connected. The boss loses one point of health;
    /// anything else dies outright.
    pub fn on_player_attack(&mut self, now: u64, frames: &FrameSet) {
        match self {
            Enemy::Patrol(p) => p.on_killed_by_player(now),
            Enemy::Chaser(c) => c.on_killed_by_player(now, frames),
            Enemy::Boss(b) => b.take_damage(1, now, frames),
        }
    }
}
