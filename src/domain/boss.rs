/// Boss enemy and its spell.
///
/// ```text
///            ┌──────────── finished ◀─────────────┐
///            ▼                                    │
///   idle/walk ──(melee range, attack ready)──▶ attack
///       │    ──(cast ready)─────────────────▶ cast ──(spawn frame)──▶ BossSpell
///       │    ──(hit, health left)───────────▶ hurt
///       └────(health gone)──▶ hurt ──▶ death ──(removal delay)──▶ purged
/// ```
///
/// The boss has health instead of dying on the first hit, never blocks
/// the player, and summons spells on top of the player's head.

use super::animation::{AnimState, FrameSet};
use super::enemy::{AiContext, Hazardous, SpellCast};
use super::entity::{Cooldown, Entity, Facing};
use super::geom::Rect;
use super::physics;

pub const BOSS_W: f32 = 45.0;
pub const BOSS_H: f32 = 60.0;
pub const BOSS_HEALTH: i32 = 10;
const BOSS_SPEED: f32 = 1.5;

const DETECT_DX: f32 = 200.0;
const DETECT_DY: f32 = 100.0;
const MELEE_DX: f32 = 50.0;
const MELEE_DY: f32 = 40.0;
const ATTACK_COOLDOWN_MS: u64 = 1500;
const CAST_COOLDOWN_MS: u64 = 3000;
const MELEE_FRAMES: &[usize] = &[4, 5, 6];
const MELEE_BLOCK: f32 = 40.0;
const MELEE_W: f32 = 40.0;
const MELEE_H: f32 = 35.0;
const REMOVE_AFTER_KILL_MS: u64 = 5000;
const REMOVE_AFTER_DEATH_MS: u64 = 2000;

const NON_LOOPING: &[AnimState] = &[
    AnimState::Attack, AnimState::Cast, AnimState::Hurt, AnimState::Death,
];

#[derive(Clone, Debug)]
pub struct Boss {
    pub entity: Entity,
    pub health: i32,
    pub alerted: bool,
    pub speed: f32,
    attack_cd: Cooldown,
    cast_cd: Cooldown,
    spell_spawned: bool,
    /// Player (centerx, top) when the current cast began.
    cast_target: Option<(f32, f32)>,
    removal: Option<Cooldown>,
}

impl Boss {
    pub fn new(x: f32, bottom: f32, facing: Facing) -> Self {
        let mut entity = Entity::new(x, bottom, BOSS_W, BOSS_H, AnimState::Idle, NON_LOOPING);
        entity.facing = facing;
        Boss {
            entity,
            health: BOSS_HEALTH,
            alerted: false,
            speed: BOSS_SPEED,
            // Both timers count from clock start, not from first sighting.
            attack_cd: Cooldown::started(0, ATTACK_COOLDOWN_MS),
            cast_cd: Cooldown::started(0, CAST_COOLDOWN_MS),
            spell_spawned: false,
            cast_target: None,
            removal: None,
        }
    }

    pub fn is_dying(&self) -> bool { self.removal.is_some() }

    pub fn ready_for_removal(&self, now: u64) -> bool {
        self.removal.map_or(false, |r| r.is_ready(now))
    }

    pub fn removal_deadline(&self) -> Option<u64> {
        self.removal.map(|r| r.deadline())
    }

    pub fn take_damage(&mut self, amount: i32, now: u64, frames: &FrameSet) {
        if self.is_dying() { return; }
        self.health -= amount;
        self.entity.body.vel.x = 0.0;
        if self.health > 0 {
            self.entity.force_state(AnimState::Hurt);
            return;
        }
        self.alerted = false;
        let first = if frames.has(AnimState::Hurt) { AnimState::Hurt } else { AnimState::Death };
        self.entity.force_state(first);
        self.removal = Some(Cooldown::started(now, REMOVE_AFTER_KILL_MS));
    }

    /// The state shown when no action is running.
    fn resting_state(&self) -> AnimState {
        if self.alerted { AnimState::Walk } else { AnimState::Idle }
    }

    /// Cast strips longer than three frames spawn on frame 2, short ones on
    /// the first frame.
    fn spawn_frame(frames: &FrameSet) -> usize {
        if frames.len(AnimState::Cast) > 3 { 2 } else { 0 }
    }

    pub fn update(&mut self, ctx: &AiContext, frames: &FrameSet) -> Option<SpellCast> {
        if self.is_dying() {
            self.update_dying(ctx, frames);
            return None;
        }

        let state = self.entity.state();
        match state {
            AnimState::Cast | AnimState::Attack | AnimState::Hurt => {
                self.entity.body.vel.x = 0.0;
                let finished = self.entity.step(state, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
                let cast = if state == AnimState::Cast { self.try_spawn(frames) } else { None };
                if finished { self.entity.force_state(self.resting_state()); }
                cast
            }
            _ => {
                let next = self.think(ctx);
                self.entity.step(next, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
                None
            }
        }
    }

    fn try_spawn(&mut self, frames: &FrameSet) -> Option<SpellCast> {
        if self.spell_spawned || self.entity.anim.frame() < Self::spawn_frame(frames) { return None; }
        self.spell_spawned = true;
        let (x, top) = self.cast_target.take()?;
        Some(SpellCast { x: x - 40.0, y: top - 60.0 })
    }

    fn think(&mut self, ctx: &AiContext) -> AnimState {
        let target = match ctx.target {
            Some(t) => t,
            None => {
                self.alerted = false;
                self.entity.body.vel.x = 0.0;
                return AnimState::Idle;
            }
        };

        let (dx, dy) = self.entity.rect().center_delta(&target);
        if dx <= DETECT_DX && dy <= DETECT_DY { self.alerted = true; }
        if !self.alerted {
            self.entity.body.vel.x = 0.0;
            return AnimState::Idle;
        }

        self.entity.facing = Facing::toward(self.entity.rect().centerx(), target.centerx());
        let now = ctx.now;

        if dx <= MELEE_DX && dy <= MELEE_DY && self.attack_cd.is_ready(now) {
            self.attack_cd.restart(now);
            self.entity.body.vel.x = 0.0;
            self.entity.force_state(AnimState::Attack);
            return AnimState::Attack;
        }
        if self.cast_cd.is_ready(now) {
            self.cast_cd.restart(now);
            self.spell_spawned = false;
            self.cast_target = Some((target.centerx(), target.top()));
            self.entity.body.vel.x = 0.0;
            self.entity.force_state(AnimState::Cast);
            return AnimState::Cast;
        }

        if dx <= MELEE_DX {
            self.entity.body.vel.x = 0.0;
            return AnimState::Idle;
        }
        if physics::ground_ahead(self.entity.rect(), self.entity.dir(), ctx.platforms) {
            self.entity.body.vel.x = self.speed * self.entity.dir();
            AnimState::Walk
        } else {
            self.entity.body.vel.x = 0.0;
            self.alerted = false;
            AnimState::Idle
        }
    }

    /// Stays alive until the death strip has played out.
    fn update_dying(&mut self, ctx: &AiContext, frames: &FrameSet) {
        self.entity.body.vel.x = 0.0;
        let state = match self.entity.state() {
            s @ (AnimState::Hurt | AnimState::Death) => s,
            _ => AnimState::Death,
        };
        let finished = self.entity.step(state, ctx.platforms, frames, ctx.gravity, ctx.anim_speed);
        if !finished { return; }
        match state {
            AnimState::Hurt => {
                self.entity.force_state(AnimState::Death);
                self.removal = Some(Cooldown::started(ctx.now, REMOVE_AFTER_DEATH_MS));
            }
            _ => self.entity.alive = false,
        }
    }
}

impl Hazardous for Boss {
    /// Melee box beside a 40x40 block centred on the body, on the swing's
    /// hit frames only.
    fn hazard_rect(&self) -> Option<Rect> {
        if self.is_dying() || !self.entity.alive { return None; }
        if self.entity.state() != AnimState::Attack { return None; }
        if !MELEE_FRAMES.contains(&self.entity.anim.frame()) { return None; }
        let r = self.entity.rect();
        let block = Rect::from_center(r.centerx(), r.centery(), MELEE_BLOCK, MELEE_BLOCK);
        let x = match self.entity.facing {
            Facing::Right => block.right(),
            Facing::Left => block.left() - MELEE_W,
        };
        Some(Rect::new(x, block.centery() - MELEE_H / 2.0, MELEE_W, MELEE_H))
    }
}

// ══════════════════════════════════════════════════════════════
// Spell
// ══════════════════════════════════════════════════════════════

const SPELL_FRAME_STEP: f32 = 0.40;
const SPELL_HOT_FRAMES: std::ops::RangeInclusive<usize> = 5..=11;
const SPELL_FALLBACK_W: f32 = 40.0;
const SPELL_FALLBACK_H: f32 = 60.0;

/// A one-shot spell. Hurts only on its middle frames, and only once.
#[derive(Clone, Debug)]
pub struct BossSpell {
    rect: Rect,
    frame: f32,
    len: usize,
    pub active: bool,
    pub damage_dealt: bool,
}

impl BossSpell {
    /// Sized from the first frame of `frames`' idle strip.
    pub fn new(cast: SpellCast, frames: &FrameSet) -> Self {
        let (w, h) = frames.get(AnimState::Idle, 0)
            .map(|f| (f.width, f.height))
            .unwrap_or((SPELL_FALLBACK_W, SPELL_FALLBACK_H));
        BossSpell {
            rect: Rect::new(cast.x, cast.y, w, h),
            frame: 0.0,
            len: frames.len(AnimState::Idle),
            active: true,
            damage_dealt: false,
        }
    }

    pub fn rect(&self) -> &Rect { &self.rect }
    pub fn frame(&self) -> usize { self.frame as usize }
    pub fn is_finished(&self) -> bool { !self.active }

    pub fn update(&mut self) {
        if !self.active { return; }
        self.frame += SPELL_FRAME_STEP;
        if self.frame >= self.len as f32 {
            self.frame = self.len.saturating_sub(1) as f32;
            self.active = false;
        }
    }
}

impl Hazardous for BossSpell {
    fn hazard_rect(&self) -> Option<Rect> {
        if !self.active || self.damage_dealt { return None; }
        if !SPELL_HOT_FRAMES.contains(&self.frame()) { return None; }
        Some(self.rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::animation::tests::frames;
    use crate::domain::animation::Frame;

    fn floor() -> Vec<Rect> {
        vec![Rect::new(-2000.0, 300.0, 6000.0, 40.0)]
    }

    fn boss_frames() -> FrameSet {
        frames(&[
            (AnimState::Idle, 6),
            (AnimState::Walk, 8),
            (AnimState::Attack, 10),
            (AnimState::Cast, 9),
            (AnimState::Hurt, 3),
            (AnimState::Death, 10),
        ])
    }

    fn tick(b: &mut Boss, plats: &[Rect], target: Option<Rect>, now: u64, f: &FrameSet) -> Option<SpellCast> {
        let ctx = AiContext { platforms: plats, target, now, gravity: 0.8, anim_speed: 0 };
        b.update(&ctx, f)
    }

    fn player_at(x: f32) -> Rect {
        Rect::from_bottomleft(x, 300.0, 21.0, 38.0)
    }

    #[test]
    fn cooldowns_count_from_clock_start() {
        let plats = floor();
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        // Player in melee range straight away.
        tick(&mut b, &plats, Some(player_at(140.0)), 1000, &f);
        assert_eq!(b.entity.state(), AnimState::Idle);
        assert!(b.alerted);

        tick(&mut b, &plats, Some(player_at(140.0)), 1500, &f);
        assert_eq!(b.entity.state(), AnimState::Attack);
    }

    #[test]
    fn walks_toward_player_when_out_of_reach() {
        let plats = floor();
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Left);
        tick(&mut b, &plats, Some(player_at(250.0)), 100, &f);
        assert_eq!(b.entity.facing, Facing::Right);
        assert_eq!(b.entity.state(), AnimState::Walk);
        assert_eq!(b.entity.body.vel.x, 1.5);
    }

    #[test]
    fn melee_box_only_on_hit_frames() {
        let plats = floor();
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        let target = player_at(140.0);
        tick(&mut b, &plats, Some(target), 2000, &f);
        assert_eq!(b.entity.state(), AnimState::Attack);

        let mut seen = vec![];
        while b.entity.state() == AnimState::Attack {
            seen.push((b.entity.anim.frame(), b.hazard_rect()));
            tick(&mut b, &plats, Some(target), 2016, &f);
        }
        for (frame, hazard) in &seen {
            assert_eq!(hazard.is_some(), (4..=6).contains(frame), "frame {frame}");
        }
        let (_, hit) = seen.iter().find(|(fr, _)| *fr == 4).copied().unwrap();
        let hit = hit.unwrap();
        let r = b.entity.rect();
        assert_eq!(hit.left(), r.centerx() + 20.0);
        assert_eq!(hit.top(), r.centery() - 17.5);
    }

    #[test]
    fn cast_spawns_exactly_once_above_player() {
        let plats = floor();
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        let target = player_at(250.0);
        let mut casts = vec![];
        let mut now = 3000;
        if let Some(c) = tick(&mut b, &plats, Some(target), now, &f) { casts.push(c); }
        assert_eq!(b.entity.state(), AnimState::Cast);
        while b.entity.state() == AnimState::Cast {
            now += 16;
            if let Some(c) = tick(&mut b, &plats, Some(target), now, &f) { casts.push(c); }
        }
        assert_eq!(casts.len(), 1);
        assert_eq!(casts[0], SpellCast { x: target.centerx() - 40.0, y: target.top() - 60.0 });
        assert_eq!(b.entity.state(), AnimState::Walk);
    }

    #[test]
    fn short_cast_strip_spawns_on_first_frame() {
        let plats = floor();
        let f = frames(&[(AnimState::Cast, 2)]);
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        b.alerted = true;
        b.entity.force_state(AnimState::Cast);
        b.cast_target = Some((260.0, 262.0));
        let cast = tick(&mut b, &plats, Some(player_at(250.0)), 10, &f);
        assert_eq!(cast, Some(SpellCast { x: 220.0, y: 202.0 }));
    }

    #[test]
    fn hit_with_health_left_plays_hurt() {
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        b.take_damage(1, 100, &f);
        assert_eq!(b.health, 9);
        assert_eq!(b.entity.state(), AnimState::Hurt);
        assert_eq!(b.entity.anim.frame(), 0);
        assert!(!b.is_dying());
    }

    #[test]
    fn ten_hits_kill_then_removal_after_deadline() {
        let plats = floor();
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        for _ in 0..10 { b.take_damage(1, 5000, &f); }
        assert!(b.is_dying());
        assert!(b.entity.alive);
        assert_eq!(b.entity.state(), AnimState::Hurt);
        assert_eq!(b.removal_deadline(), Some(10_000));

        // Further hits are ignored.
        b.take_damage(1, 5000, &f);
        assert_eq!(b.health, 0);

        let mut now = 5000;
        while b.entity.state() == AnimState::Hurt {
            now += 16;
            tick(&mut b, &plats, None, now, &f);
        }
        assert_eq!(b.entity.state(), AnimState::Death);
        assert_eq!(b.removal_deadline(), Some(now + 2000));
        assert!(!b.ready_for_removal(now + 1999));
        assert!(b.ready_for_removal(now + 2000));
        assert!(b.hazard_rect().is_none());
        assert!(b.entity.alive);

        while b.entity.alive {
            now += 16;
            tick(&mut b, &plats, None, now, &f);
        }
        assert_eq!(b.entity.state(), AnimState::Death);
        assert!(b.entity.anim.is_finished());
    }

    #[test]
    fn spell_aims_where_player_stood_when_cast_began() {
        let plats = floor();
        let f = boss_frames();
        let mut b = Boss::new(100.0, 300.0, Facing::Right);
        let start = player_at(250.0);
        let mut now = 3000;
        assert!(tick(&mut b, &plats, Some(start), now, &f).is_none());
        assert_eq!(b.entity.state(), AnimState::Cast);

        let moved = player_at(290.0);
        let mut cast = None;
        while cast.is_none() && b.entity.state() == AnimState::Cast {
            now += 16;
            cast = tick(&mut b, &plats, Some(moved), now, &f);
        }
        assert_eq!(cast, Some(SpellCast { x: start.centerx() - 40.0, y: start.top() - 60.0 }));
    }

    fn spell_frames(n: usize) -> FrameSet {
        let mut set = FrameSet::new();
        set.insert(AnimState::Idle, (0..n as u32)
            .map(|id| Frame { id, width: 80.0, height: 100.0 })
            .collect());
        set
    }

    #[test]
    fn spell_is_hot_only_in_middle_frames() {
        let mut s = BossSpell::new(SpellCast { x: 10.0, y: 20.0 }, &spell_frames(16));
        assert_eq!((s.rect().w, s.rect().h), (80.0, 100.0));
        let mut hot_frames = vec![];
        while s.active {
            if s.hazard_rect().is_some() { hot_frames.push(s.frame()); }
            s.update();
        }
        hot_frames.dedup();
        assert_eq!(hot_frames, (5..=11).collect::<Vec<_>>());
        assert_eq!(s.frame(), 15);
        assert!(s.is_finished());
    }

    #[test]
    fn spell_hits_once() {
        let mut s = BossSpell::new(SpellCast { x: 0.0, y: 0.0 }, &spell_frames(16));
        while s.frame() < 5 { s.update(); }
        assert!(s.hazard_rect().is_some());
        s.damage_dealt = true;
        assert!(s.hazard_rect().is_none());
    }

    #[test]
    fn spell_without_frames_uses_fallback_size_and_ends() {
        let mut s = BossSpell::new(SpellCast { x: 0.0, y: 0.0 }, &FrameSet::new());
        assert_eq!((s.rect().w, s.rect().h), (40.0, 60.0));
        s.update();
        assert!(s.is_finished());
    }
}
