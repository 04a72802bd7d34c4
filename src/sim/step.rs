/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Invincibility countdown, active platform snapshot
///   2. End sequence (replaces 3-5 while it runs)
///   3. Player input + physics
///   4. Enemy AI + physics, spells
///   5. NPCs, talk key
///   6. Triggers, damage, blocking, combat (player alive only)
///   7. Trap / campfire animation
///   8. Death delay and respawn, game over
///   9. Purge finished enemies and spells
///
/// `now` is the clock read once for the whole frame.

use tracing::{debug, info, trace};

use crate::domain::boss::BossSpell;
use crate::domain::enemy::{AiContext, SpellCast};
use crate::domain::entity::{Cooldown, SpriteKind};
use crate::domain::geom::Rect;
use crate::domain::player::FrameInput;
use super::arena::Key;
use super::damage;
use super::end_sequence;
use super::event::GameEvent;
use super::level::LevelError;
use super::world::{Phase, SpellSlot, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, now: u64) -> Result<Vec<GameEvent>, LevelError> {
    if world.phase != Phase::Playing { return Ok(vec![]); }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }
    if world.invincibility > 0 { world.invincibility -= 1; }

    let platforms = world.active_platforms();

    if world.end_sequence.is_some() {
        if end_sequence::update(world, &platforms, &mut events)? { return Ok(events); }
    } else {
        resolve_player(world, &input, &platforms, now);
        resolve_enemies(world, &platforms, now, &mut events);
        resolve_npcs(world, input.talk, &mut events);
        if world.player.alive() {
            if let Some(mode) = damage::resolve_triggers(world, &mut events) {
                end_sequence::start(world, mode, &mut events);
            }
            damage::resolve_damage(world, now, &mut events);
            damage::resolve_blocking(world);
            damage::resolve_combat(world, now, &mut events);
        }
        world.player.end_swing();
    }

    resolve_animations(world);
    resolve_death(world, now, &mut events);
    resolve_cleanup(world, now, &mut events);

    Ok(events)
}

// ══════════════════════════════════════════════════════════════
// Actors
// ══════════════════════════════════════════════════════════════

fn resolve_player(world: &mut WorldState, input: &FrameInput, platforms: &[Rect], now: u64) {
    let tuning = &world.config.physics;
    if !world.input_locked {
        world.player.handle_input(input, tuning, now);
    }
    world.player.step(platforms, world.frames.get(SpriteKind::Player), tuning);
}

fn resolve_enemies(world: &mut WorldState, platforms: &[Rect], now: u64, events: &mut Vec<GameEvent>) {
    let ctx = AiContext {
        platforms,
        target: world.player.alive().then(|| *world.player.rect()),
        now,
        gravity: world.config.physics.gravity,
        anim_speed: world.config.physics.animation_speed,
    };

    let mut casts: Vec<(Key, SpellCast)> = Vec::new();
    for (key, enemy) in world.enemies.iter_mut() {
        let frames = world.frames.get(enemy.sprite());
        if let Some(cast) = enemy.update(&ctx, frames) {
            casts.push((key, cast));
        }
    }

    for slot in world.spells.values_mut() {
        slot.spell.update();
    }

    let spell_frames = world.frames.get(SpriteKind::BossSpell);
    for (caster, cast) in casts {
        world.spells.insert(SpellSlot { caster, spell: BossSpell::new(cast, spell_frames) });
        debug!(x = cast.x, y = cast.y, "boss spell cast");
        events.push(GameEvent::SpellCast { x: cast.x, y: cast.y });
    }
}

/// NPCs of the current dimension watch the player; the talk key opens or
/// advances the first conversation in range.
fn resolve_npcs(world: &mut WorldState, talk: bool, events: &mut Vec<GameEvent>) {
    let dim = world.dimension();
    let player = *world.player.rect();
    let frames = world.frames.get(SpriteKind::Npc);
    for npc in world.npcs.iter_mut().filter(|n| n.dimension.matches(dim)) {
        npc.update(&player, frames);
    }

    if !talk || world.input_locked || !world.player.alive() { return; }
    let Some(npc) = world.npcs.iter_mut()
        .find(|n| n.dimension.matches(dim) && n.can_interact()) else { return };

    if let Some(facing) = npc.interact(&player) {
        world.player.entity.facing = facing;
    }
    if let Some(line) = npc.current_line() {
        trace!(npc = npc.variant.name(), line, "npc talks");
        events.push(GameEvent::NpcSays { line });
    }
}

// ══════════════════════════════════════════════════════════════
// Environment
// ══════════════════════════════════════════════════════════════

fn resolve_animations(world: &mut WorldState) {
    let spikes = world.frames.get(SpriteKind::Spike);
    for trap in world.traps.values_mut() {
        trap.update(spikes);
    }
    let fire = world.frames.get(SpriteKind::Campfire);
    for campfire in &mut world.campfires {
        campfire.update(fire);
    }
}

// ══════════════════════════════════════════════════════════════
// Death and cleanup
// ══════════════════════════════════════════════════════════════

/// Temporary death: once the death animation is over, wait out the
/// respawn delay. Terminal death ends the game.
fn resolve_death(world: &mut WorldState, now: u64, events: &mut Vec<GameEvent>) {
    if world.player.alive() { return; }

    let Some(mut delay) = world.death_delay else {
        if world.player.hearts <= 0 {
            info!(level = world.current_level + 1, "game over");
            world.phase = Phase::GameOver;
            events.push(GameEvent::GameOver);
        }
        return;
    };

    if !world.player.death_animation_done(world.frames.get(SpriteKind::Player)) { return; }
    let timer = *delay.timer.get_or_insert(Cooldown::started(now, delay.delay_ms));
    world.death_delay = Some(delay);
    if !timer.is_ready(now) { return; }

    world.respawn();
    info!(hearts = world.player.hearts, "player respawned");
    events.push(GameEvent::PlayerRespawned);
}

/// Enemies whose removal deadline passed, then spells that finished or
/// whose caster is gone.
fn resolve_cleanup(world: &mut WorldState, now: u64, events: &mut Vec<GameEvent>) {
    let doomed: Vec<(Key, SpriteKind)> = world.enemies.iter()
        .filter(|(_, e)| e.is_dying() && e.ready_for_removal(now))
        .map(|(k, e)| (k, e.sprite()))
        .collect();
    for (key, kind) in doomed {
        world.enemies.remove(key);
        debug!(?kind, "enemy removed");
        events.push(GameEvent::EnemyRemoved { kind });
    }

    let enemies = &world.enemies;
    world.spells.retain(|_, slot| !slot.spell.is_finished() && enemies.contains(slot.caster));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::enemy::Enemy;
    use crate::domain::entity::Facing;
    use crate::domain::player::DamageCause;
    use crate::sim::assets::FrameLibrary;
    use crate::sim::level::{EndMode, LevelSet};
    use crate::sim::world::tests::{world_from, world_with};

    const FRAME_MS: u64 = 16;

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    /// Step until `done` holds for an emitted event, at most `limit` frames.
    /// Returns the frame index it happened on.
    fn run_until(world: &mut WorldState, start_frame: u64, limit: u64,
                 mut done: impl FnMut(&WorldState, &[GameEvent]) -> bool) -> Option<u64> {
        for frame in start_frame..start_frame + limit {
            let events = step(world, idle(), frame * FRAME_MS).unwrap();
            if done(world, &events) { return Some(frame); }
        }
        None
    }

    #[test]
    fn fall_costs_one_heart_then_respawns_at_start() {
        let mut config = GameConfig::default();
        config.start_hearts = 3;
        config.timing.spawn_invincibility_frames = 0;
        // Start above a hole: nothing to land on.
        let mut w = world_with(config, &["", " S"], &["GG"]);
        let start = w.start;

        let mut damaged_at = None;
        let respawned_at = run_until(&mut w, 1, 2000, |w, events| {
            for e in events {
                if let GameEvent::PlayerDamaged { cause, hearts } = e {
                    assert_eq!(*cause, DamageCause::Fall);
                    assert_eq!(*hearts, 2);
                    assert!(w.death_delay.is_some());
                    damaged_at = Some(w.tick);
                }
            }
            events.contains(&GameEvent::PlayerRespawned)
        });

        assert!(damaged_at.is_some());
        assert!(respawned_at.is_some());
        assert_eq!(w.player.hearts, 2);
        assert!(w.player.alive());
        assert_eq!(w.player.rect().left(), start.0);
        assert_eq!(w.player.rect().bottom(), start.1);
        assert!(w.death_delay.is_none());
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn respawn_waits_for_death_animation_and_delay() {
        let mut config = GameConfig::default();
        config.timing.spawn_invincibility_frames = 0;
        let mut w = world_with(config, &["", " S"], &[]);

        let hit = run_until(&mut w, 1, 2000, |_, ev| ev.iter().any(|e| matches!(e, GameEvent::PlayerDamaged { .. })));
        let hit = hit.unwrap_or(0);
        let back = run_until(&mut w, hit + 1, 2000, |_, ev| ev.contains(&GameEvent::PlayerRespawned))
            .unwrap_or(0);

        // Five death frames at eight ticks each, then 500 ms.
        let frames_waited = back - hit;
        assert!(frames_waited >= 40 + 500 / FRAME_MS, "waited {frames_waited}");
    }

    #[test]
    fn last_heart_ends_the_game() {
        let mut config = GameConfig::default();
        config.start_hearts = 1;
        config.timing.spawn_invincibility_frames = 0;
        let mut w = world_with(config, &["", " S"], &[]);

        let over = run_until(&mut w, 1, 2000, |_, ev| ev.contains(&GameEvent::GameOver));
        assert!(over.is_some());
        assert_eq!(w.phase, Phase::GameOver);
        assert!(step(&mut w, idle(), 999_999).unwrap().is_empty());
    }

    #[test]
    fn ten_attacks_kill_the_boss_and_it_is_removed_after_deadline() {
        let mut w = world_from(&["S          B", "GGGGGGGGGGGGGGGGGG"], &[]);
        let boss_key = w.enemies.keys()[0];
        let cooldown = w.config.timing.player_attack_cooldown_ms;
        let mut now = 0;
        let mut hits = 0;

        while hits < 10 {
            now += cooldown;
            // Stand left of the boss, facing it, out of melee reach.
            let boss = match w.enemies.get(boss_key) {
                Some(e) => *e.rect(),
                None => panic!("boss vanished early"),
            };
            w.player.entity.body.rect.set_right(boss.left() - 5.0);
            w.player.entity.facing = Facing::Right;
            w.invincibility = 10;
            let events = step(&mut w, FrameInput { attack: true, ..idle() }, now).unwrap();
            hits += events.iter().filter(|e| matches!(e, GameEvent::BossHit { .. })).count();
        }

        let deadline = match w.enemies.get(boss_key) {
            Some(Enemy::Boss(b)) => {
                assert_eq!(b.health, 0);
                assert!(b.is_dying());
                assert!(b.entity.alive);
                b.removal_deadline().unwrap_or(0)
            }
            other => panic!("expected dying boss, got {other:?}"),
        };
        assert!(deadline > now);

        let mut t = now;
        let mut last_deadline = deadline;
        let mut removed = false;
        for _ in 0..2000 {
            t += FRAME_MS;
            w.invincibility = 10;
            let events = step(&mut w, idle(), t).unwrap();
            if events.contains(&GameEvent::EnemyRemoved { kind: SpriteKind::Boss }) {
                assert!(t >= last_deadline);
                removed = true;
                break;
            }
            // The deadline moves once the death strip starts.
            last_deadline = match w.enemies.get(boss_key) {
                Some(Enemy::Boss(b)) => b.removal_deadline().unwrap_or(0),
                other => panic!("boss gone without a removal event: {other:?}"),
            };
            assert!(last_deadline > t);
        }
        assert!(removed);
        assert!(!w.enemies.contains(boss_key));
    }

    #[test]
    fn jump_walk_end_sequence_jumps_once_and_advances_off_screen() {
        let levels = LevelSet::in_memory(vec![
            ("S D\nGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG".to_string(), String::new()),
            ("S\nGG".to_string(), String::new()),
        ]);
        let mut w = WorldState::new(GameConfig::default(), levels, FrameLibrary::placeholder())
            .unwrap_or_else(|e| panic!("{e}"));
        w.player.entity.body.rect.set_left(85.0);
        let lock_x = w.player.rect().centerx();

        let mut now = 0;
        let events = step(&mut w, idle(), now).unwrap();
        assert!(events.contains(&GameEvent::EndSequenceStarted { mode: EndMode::JumpWalk }));
        assert!(w.input_locked);
        assert_eq!(w.camera.lock_x, lock_x);

        let mut jumps = 0;
        let mut was_rising = false;
        let mut advanced = false;
        for _ in 0..1000 {
            now += FRAME_MS;
            let before_x = w.player.rect().x;
            let events = step(&mut w, FrameInput { left: true, jump: true, ..idle() }, now).unwrap();
            if events.contains(&GameEvent::LevelAdvanced { level: 1 }) {
                let (offset_x, _) = locked_offset(lock_x, &w);
                assert!(before_x + 4.0 - offset_x > w.camera.viewport_w + 40.0);
                advanced = true;
                break;
            }
            assert_eq!(w.camera.lock_x, lock_x);
            let rising = w.player.entity.body.vel.y < 0.0;
            if rising && !was_rising { jumps += 1; }
            was_rising = rising;
            assert!(w.player.rect().x > before_x, "input lock ignores the left key");
        }

        assert!(advanced);
        assert_eq!(jumps, 1);
        assert_eq!(w.current_level, 1);
        assert!(!w.input_locked);
        assert!(!w.camera.locked);
    }

    /// The locked camera offset of the level just left.
    fn locked_offset(lock_x: f32, w: &WorldState) -> (f32, f32) {
        let cam = &w.camera;
        (lock_x - cam.viewport_w / 2.0 + cam.manual_offset_x, cam.manual_offset_y)
    }

    #[test]
    fn dimension_shift_swaps_ground() {
        let mut w = world_from(&["S", "GG"], &["", ""]);
        w.invincibility = 100;
        for f in 0..5 { step(&mut w, idle(), f * FRAME_MS).unwrap(); }
        assert!(w.player.entity.body.on_ground);

        step(&mut w, FrameInput { shift: true, ..idle() }, 100).unwrap();
        for f in 0..3 { step(&mut w, idle(), 200 + f * FRAME_MS).unwrap(); }
        assert!(!w.player.entity.body.on_ground);
        assert!(w.player.rect().bottom() > 40.0);
    }

    #[test]
    fn boss_cast_spawns_a_tracked_spell() {
        let mut w = world_from(&["S   B", "GGGGGGGG"], &[]);
        w.invincibility = u32::MAX;
        let mut cast = None;
        for f in 0..2000u64 {
            let events = step(&mut w, idle(), 3000 + f * FRAME_MS).unwrap();
            if let Some(GameEvent::SpellCast { x, y }) = events.iter().find(|e| matches!(e, GameEvent::SpellCast { .. })) {
                cast = Some((*x, *y));
                break;
            }
        }
        let (x, y) = cast.unwrap_or_else(|| panic!("boss never cast"));
        let p = *w.player.rect();
        assert_eq!(x, p.centerx() - 40.0);
        assert_eq!(y, p.top() - 60.0);
        assert_eq!(w.spells.len(), 1);
        let caster = w.spells.values().next().map(|s| s.caster);
        assert_eq!(caster, Some(w.enemies.keys()[0]));
    }

    #[test]
    fn spells_vanish_with_their_caster() {
        let mut w = world_from(&["S   B", "GGGGGGGG"], &[]);
        let caster = w.enemies.keys()[0];
        let spell = BossSpell::new(SpellCast { x: 0.0, y: 0.0 }, w.frames.get(SpriteKind::BossSpell));
        w.spells.insert(SpellSlot { caster, spell });
        w.enemies.remove(caster);
        step(&mut w, idle(), 16).unwrap();
        assert!(w.spells.is_empty());
    }

    #[test]
    fn talking_to_npc_emits_lines() {
        let mut w = world_from(&["S W", "GGGGGG"], &[]);
        w.invincibility = 100;
        let events = step(&mut w, FrameInput { talk: true, ..idle() }, 0).unwrap();
        assert!(events.iter().any(|e| matches!(e, GameEvent::NpcSays { line: "Watch out for the enemies ahead!" })));
        assert!(w.npcs[0].talking);
    }
}
