/// WorldState: the complete snapshot of a running game.
///
/// ## Ownership
///
/// The world owns every actor; nothing holds a reference to anything else.
///   - `enemies`, `spells`, `traps` live in index-based arenas and are
///     addressed by [`Key`]. A spell remembers its caster's key, never the
///     caster itself.
///   - `spawns` keeps the level's enemy descriptors so respawn can rebuild
///     every enemy from scratch.
///
/// ## Camera / Viewport
///
/// World coordinates are pixels. The camera turns them into a viewport
/// offset: it follows the player's centre, can be pinned to a fixed x
/// (end sequence), and never scrolls past the level's right limit.

use tracing::{debug, info};

use crate::config::GameConfig;
use crate::domain::boss::BossSpell;
use crate::domain::enemy::{Enemy, EnemySpawn};
use crate::domain::entity::{Cooldown, Dimension, Facing};
use crate::domain::geom::Rect;
use crate::domain::npc::Npc;
use crate::domain::player::Player;
use crate::domain::trap::{Campfire, TriggerTrap};
use super::arena::{Arena, Key};
use super::assets::FrameLibrary;
use super::level::{EndMode, EndTrigger, LevelError, LevelLayout, LevelSet, Platform};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// Hearts ran out.
    GameOver,
    /// The last level was left through its end trigger.
    Victory,
}

/// Viewport offset controller.
#[derive(Clone, Debug)]
pub struct Camera {
    pub viewport_w: f32,
    pub viewport_h: f32,
    pub manual_offset_x: f32,
    pub manual_offset_y: f32,
    pub locked: bool,
    pub lock_x: f32,
    pub right_limit: Option<f32>,
}

impl Camera {
    pub fn new(cfg: &GameConfig) -> Self {
        Camera {
            viewport_w: cfg.camera.viewport_width,
            viewport_h: cfg.camera.viewport_height,
            manual_offset_x: cfg.camera.manual_offset_x,
            manual_offset_y: cfg.camera.manual_offset_y,
            locked: false,
            lock_x: 0.0,
            right_limit: None,
        }
    }

    pub fn lock(&mut self, center_x: f32) {
        self.locked = true;
        self.lock_x = center_x;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// World-to-screen offset for a camera following `target`.
    pub fn offset(&self, target: &Rect) -> (f32, f32) {
        let center = if self.locked { self.lock_x } else { target.centerx() };
        let mut x = center - self.viewport_w / 2.0;
        if let Some(limit) = self.right_limit {
            x = x.min(limit - self.viewport_w / 2.0);
        }
        (x + self.manual_offset_x, self.manual_offset_y)
    }
}

/// The scripted walk off the end of a level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EndSequence {
    pub mode: EndMode,
    pub dir: Facing,
    pub jump_started: bool,
}

/// A live spell and the boss that cast it.
#[derive(Clone, Debug)]
pub struct SpellSlot {
    pub caster: Key,
    pub spell: BossSpell,
}

/// Temporary death bookkeeping. The countdown only starts once the death
/// animation has played out.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeathDelay {
    pub delay_ms: u64,
    pub timer: Option<Cooldown>,
}

pub struct WorldState {
    pub config: GameConfig,
    pub frames: FrameLibrary,
    pub levels: LevelSet,

    // ── Level geometry ──
    pub platforms: Vec<Platform>,
    pub end_triggers: Vec<EndTrigger>,
    pub start: (f32, f32),
    pub level_width: f32,

    // ── Actors ──
    pub player: Player,
    pub enemies: Arena<Enemy>,
    pub spawns: Vec<EnemySpawn>,
    pub spells: Arena<SpellSlot>,
    pub traps: Arena<TriggerTrap>,
    pub npcs: Vec<Npc>,
    pub campfires: Vec<Campfire>,

    // ── Flow ──
    pub phase: Phase,
    pub current_level: usize,
    pub tick: u64,
    pub invincibility: u32,
    pub death_delay: Option<DeathDelay>,
    pub end_sequence: Option<EndSequence>,
    pub input_locked: bool,

    pub camera: Camera,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

// ── Construction ──

impl WorldState {
    /// A world playing the first level of `levels`.
    pub fn new(config: GameConfig, levels: LevelSet, frames: FrameLibrary) -> Result<Self, LevelError> {
        let layout = levels.load(0)?;
        let mut world = WorldState {
            player: Player::new(0.0, 0.0, config.start_hearts, config.timing.player_attack_cooldown_ms),
            camera: Camera::new(&config),
            config,
            frames,
            levels,
            platforms: vec![],
            end_triggers: vec![],
            start: (0.0, 0.0),
            level_width: 0.0,
            enemies: Arena::new(),
            spawns: vec![],
            spells: Arena::new(),
            traps: Arena::new(),
            npcs: vec![],
            campfires: vec![],
            phase: Phase::Playing,
            current_level: 0,
            tick: 0,
            invincibility: 0,
            death_delay: None,
            end_sequence: None,
            input_locked: false,
            message: String::new(),
            message_timer: 0,
        };
        world.install(layout, 0, None);
        Ok(world)
    }

    /// Replace everything level-bound with `layout`. A fresh player is
    /// created; `hearts` carries the count over from the previous level.
    fn install(&mut self, layout: LevelLayout, index: usize, hearts: Option<i32>) {
        let (x, bottom) = layout.start;
        self.player = Player::new(x, bottom, self.config.start_hearts,
                                  self.config.timing.player_attack_cooldown_ms);
        if let Some(h) = hearts { self.player.hearts = h; }

        self.platforms = layout.platforms;
        self.end_triggers = layout.end_triggers;
        self.start = layout.start;
        self.level_width = layout.width;
        self.enemies = layout.enemy_spawns.iter().map(EnemySpawn::build).collect();
        self.spawns = layout.enemy_spawns;
        self.spells.clear();
        self.traps = layout.traps.into_iter().collect();
        self.npcs = layout.npcs;
        self.campfires = layout.campfires;

        self.camera.unlock();
        self.camera.right_limit = layout.camera_right_limit;
        self.current_level = index;
        self.phase = Phase::Playing;
        self.invincibility = self.config.timing.spawn_invincibility_frames;
        self.death_delay = None;
        self.end_sequence = None;
        self.input_locked = false;

        info!(
            level = index + 1,
            platforms = self.platforms.len(),
            enemies = self.enemies.len(),
            traps = self.traps.len(),
            "level ready"
        );
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

// ── Level flow ──

impl WorldState {
    /// Move on to the next level, keeping the player's hearts. Returns
    /// false when there is no next level (the game is won).
    pub fn advance_level(&mut self) -> Result<bool, LevelError> {
        let next = self.current_level + 1;
        if next >= self.levels.len() {
            self.phase = Phase::Victory;
            info!(level = self.current_level + 1, "last level cleared");
            return Ok(false);
        }
        let layout = self.levels.load(next)?;
        let hearts = self.player.hearts;
        self.install(layout, next, Some(hearts));
        Ok(true)
    }

    /// Start the current level over with full hearts.
    pub fn restart_level(&mut self) -> Result<(), LevelError> {
        let layout = self.levels.load(self.current_level)?;
        self.install(layout, self.current_level, None);
        Ok(())
    }

    /// Bring the player back at the start after a temporary death. Every
    /// enemy is rebuilt from its spawn, which clears all idle locks.
    pub fn respawn(&mut self) {
        self.player.respawn(self.start);
        self.enemies = self.spawns.iter().map(EnemySpawn::build).collect();
        self.spells.clear();
        for trap in self.traps.values_mut() { trap.reset(); }
        self.invincibility = self.config.timing.spawn_invincibility_frames;
        self.death_delay = None;
        self.end_sequence = None;
        self.input_locked = false;
        self.camera.unlock();
        debug!(hearts = self.player.hearts, "player respawned");
    }
}

// ── Queries ──

impl WorldState {
    pub fn dimension(&self) -> Dimension {
        self.player.dimension()
    }

    /// Platforms that exist in the player's current dimension.
    pub fn active_platforms(&self) -> Vec<Rect> {
        let dim = self.dimension();
        self.platforms.iter()
            .filter(|p| p.dimension.matches(dim))
            .map(|p| p.rect)
            .collect()
    }

    pub fn is_invincible(&self) -> bool {
        self.invincibility > 0
    }

    pub fn camera_offset(&self) -> (f32, f32) {
        self.camera.offset(self.player.rect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A world built from in-memory level rows (normal file, gema file).
    pub(crate) fn world_from(normal: &[&str], gema: &[&str]) -> WorldState {
        world_with(GameConfig::default(), normal, gema)
    }

    pub(crate) fn world_with(config: GameConfig, normal: &[&str], gema: &[&str]) -> WorldState {
        let levels = LevelSet::in_memory(vec![(normal.join("\n"), gema.join("\n"))]);
        WorldState::new(config, levels, FrameLibrary::placeholder()).unwrap()
    }

    #[test]
    fn camera_follows_then_clamps_to_right_limit() {
        let mut cam = Camera::new(&GameConfig::default());
        cam.manual_offset_x = 0.0;
        cam.manual_offset_y = 0.0;
        let target = Rect::new(990.0, 0.0, 20.0, 20.0);
        assert_eq!(cam.offset(&target), (744.0, 0.0));

        cam.right_limit = Some(900.0);
        assert_eq!(cam.offset(&target).0, 644.0);

        cam.right_limit = None;
        cam.lock(300.0);
        assert_eq!(cam.offset(&target).0, 44.0);
        cam.unlock();
        assert_eq!(cam.offset(&target).0, 744.0);
    }

    #[test]
    fn camera_adds_manual_offsets() {
        let cam = Camera::new(&GameConfig::default());
        let target = Rect::new(246.0, 0.0, 20.0, 20.0);
        assert_eq!(cam.offset(&target), (180.0, 390.0));
    }

    #[test]
    fn active_platforms_follow_dimension() {
        let mut w = world_from(&["GG"], &["  G"]);
        assert_eq!(w.active_platforms().len(), 2);
        w.player.shift_dimension();
        assert_eq!(w.active_platforms(), vec![Rect::new(80.0, 0.0, 40.0, 40.0)]);
    }

    #[test]
    fn respawn_rebuilds_enemies_and_resets_traps() {
        let mut w = world_from(&["  H T J", "GGGGGGGG"], &[]);
        let key = w.enemies.keys()[0];
        if let Some(Enemy::Patrol(p)) = w.enemies.get_mut(key) {
            p.permanent_idle = true;
        }
        for trap in w.traps.values_mut() { trap.active = true; }
        w.player.die();

        w.respawn();
        assert!(w.player.alive());
        assert!(w.traps.values().all(|t| !t.active));
        match w.enemies.values().next() {
            Some(Enemy::Patrol(p)) => assert!(!p.permanent_idle),
            other => panic!("expected patrol, got {other:?}"),
        }
        assert_eq!(w.invincibility, w.config.timing.spawn_invincibility_frames);
    }

    #[test]
    fn advancing_past_last_level_is_victory() {
        let mut w = world_from(&["GG"], &[]);
        w.player.hearts = 3;
        assert!(!w.advance_level().unwrap());
        assert_eq!(w.phase, Phase::Victory);
    }

    #[test]
    fn advancing_keeps_hearts() {
        let levels = LevelSet::in_memory(vec![
            ("S\nGG".to_string(), String::new()),
            (" S\nGGG".to_string(), String::new()),
        ]);
        let mut w = WorldState::new(GameConfig::default(), levels, FrameLibrary::placeholder()).unwrap();
        w.player.hearts = 3;
        assert!(w.advance_level().unwrap());
        assert_eq!(w.current_level, 1);
        assert_eq!(w.player.hearts, 3);
        assert_eq!(w.player.rect().left(), 40.0);
        assert_eq!(w.level_width, 120.0);
    }
}
