/// Shared entity building blocks: facing, dimension tags, cooldown timers,
/// and the `Entity` core every actor composes (body + animation).

use super::animation::{AnimState, Animator, FrameSet};
use super::geom::Rect;
use super::physics::{self, Body};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// -1.0 for left, 1.0 for right.
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn toward(from_x: f32, to_x: f32) -> Self {
        if to_x < from_x { Facing::Left } else { Facing::Right }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

/// Which parallel world something lives in.
///
/// The active dimension is always `Normal` or `Gema`; `Both` only appears
/// as a tag on level content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dimension {
    Normal,
    Gema,
    Both,
}

impl Dimension {
    /// Is content tagged `self` present while `active` is the current world?
    pub fn matches(self, active: Dimension) -> bool {
        self == Dimension::Both || self == active
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Normal => "normal",
            Dimension::Gema => "gema",
            Dimension::Both => "both",
        }
    }
}

/// Timestamp-based timer: ready once `duration` ms have passed since it
/// was last started. A cooldown that was never started is ready.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cooldown {
    start: Option<u64>,
    duration: u64,
}

impl Cooldown {
    pub fn new(duration: u64) -> Self {
        Cooldown { start: None, duration }
    }

    /// A cooldown that begins at `now`.
    pub fn started(now: u64, duration: u64) -> Self {
        Cooldown { start: Some(now), duration }
    }

    pub fn is_ready(&self, now: u64) -> bool {
        match self.start {
            Some(s) => now.saturating_sub(s) >= self.duration,
            None => true,
        }
    }

    pub fn restart(&mut self, now: u64) {
        self.start = Some(now);
    }

    /// Push the deadline to `now + duration` unless it is already later.
    pub fn extend(&mut self, now: u64) {
        if self.start.is_none() || now + self.duration > self.deadline() {
            self.start = Some(now);
        }
    }

    /// Forget the last start; the cooldown is ready again.
    pub fn clear(&mut self) {
        self.start = None;
    }

    pub fn deadline(&self) -> u64 {
        self.start.map_or(0, |s| s + self.duration)
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }
}

/// Sprite kinds known to the frame provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SpriteKind {
    Player,
    Patrol,
    Chaser,
    HeavyChaser,
    Boss,
    BossSpell,
    Spike,
    Campfire,
    Npc,
}

impl SpriteKind {
    pub const ALL: [SpriteKind; 9] = [
        SpriteKind::Player,
        SpriteKind::Patrol,
        SpriteKind::Chaser,
        SpriteKind::HeavyChaser,
        SpriteKind::Boss,
        SpriteKind::BossSpell,
        SpriteKind::Spike,
        SpriteKind::Campfire,
        SpriteKind::Npc,
    ];

    /// Asset folder name under the assets directory.
    pub fn folder(self) -> &'static str {
        match self {
            SpriteKind::Player => "player",
            SpriteKind::Patrol => "patrol",
            SpriteKind::Chaser => "bandit",
            SpriteKind::HeavyChaser => "heavy_bandit",
            SpriteKind::Boss => "boss",
            SpriteKind::BossSpell => "boss_spell",
            SpriteKind::Spike => "spike",
            SpriteKind::Campfire => "campfire",
            SpriteKind::Npc => "npc",
        }
    }
}

/// Common actor core: a physical body plus its animation machine.
///
/// The rectangle's bottom-left is the authoritative world position.
#[derive(Clone, Debug)]
pub struct Entity {
    pub body: Body,
    pub facing: Facing,
    pub alive: bool,
    pub anim: Animator,
}

impl Entity {
    /// New entity of size `w`x`h` standing with its bottom-left at `(x, bottom)`.
    pub fn new(x: f32, bottom: f32, w: f32, h: f32, initial: AnimState,
               non_looping: &'static [AnimState]) -> Self {
        Entity {
            body: Body::new(Rect::from_bottomleft(x, bottom, w, h)),
            facing: Facing::Right,
            alive: true,
            anim: Animator::new(initial, non_looping),
        }
    }

    pub fn rect(&self) -> &Rect { &self.body.rect }
    pub fn dir(&self) -> f32 { self.facing.sign() }
    pub fn state(&self) -> AnimState { self.anim.state() }

    /// Physics then animation for one frame. Returns true when a
    /// non-looping animation just finished.
    pub fn step(&mut self, state: AnimState, platforms: &[Rect], frames: &FrameSet,
                gravity: f32, anim_threshold: u32) -> bool {
        physics::integrate(&mut self.body, self.alive, platforms, gravity);
        self.anim.tick(state, frames, anim_threshold)
    }

    /// Switch animation explicitly (e.g. entering an attack) and restart it.
    pub fn force_state(&mut self, state: AnimState) {
        self.anim.set_state(state);
        self.anim.restart();
    }
}
