/// Player-versus-world resolution passes, run once per frame while the
/// player is alive.
///
/// ```text
///   triggers ── traps spring, end markers start the walk-off
///   damage   ── every hazard rect vs the player (fall first)
///   blocking ── solid enemies push the player out
///   combat   ── the player's swing vs every active enemy
/// ```

use tracing::{debug, info};

use crate::domain::enemy::{Enemy, Hazardous};
use super::arena::Key;
use super::event::GameEvent;
use super::level::EndMode;
use super::world::{DeathDelay, WorldState};

// ══════════════════════════════════════════════════════════════
// Triggers
// ══════════════════════════════════════════════════════════════

/// Spring traps under the player. Returns the mode of the first end marker
/// the player touches, unless an end sequence is already running.
pub fn resolve_triggers(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Option<EndMode> {
    if !world.player.alive() { return None; }
    let dim = world.dimension();
    let rect = *world.player.rect();

    for (index, trap) in world.traps.values_mut().enumerate() {
        if trap.try_activate(&rect, dim) {
            debug!(index, "trap sprung");
            events.push(GameEvent::TrapTriggered { index });
        }
    }

    if world.end_sequence.is_some() { return None; }
    world.end_triggers.iter()
        .find(|t| t.dimension.matches(dim) && rect.overlaps(&t.rect))
        .map(|t| t.mode)
}

// ══════════════════════════════════════════════════════════════
// Damage
// ══════════════════════════════════════════════════════════════

/// Collect this frame's hazards and resolve them against the player.
///
/// Hazards, in order: sprung traps of the current dimension, each
/// non-dying enemy's own hazard, then each boss's live spells. A patrol
/// touching the player freezes whether or not damage lands; a chaser whose
/// swing connected freezes in combat idle only when it did.
pub fn resolve_damage(world: &mut WorldState, now: u64, events: &mut Vec<GameEvent>) {
    if world.is_invincible() || !world.player.alive() || world.death_delay.is_some() { return; }

    let dim = world.dimension();
    let player_rect = *world.player.rect();
    let mut hazards = Vec::new();

    for trap in world.traps.values().filter(|t| t.dimension.matches(dim)) {
        hazards.extend(trap.hazard_rect());
    }

    let mut patrols_touched: Vec<Key> = Vec::new();
    let mut chaser_hit: Option<Key> = None;
    let mut spells_on_player: Vec<Key> = Vec::new();

    for (key, enemy) in world.enemies.iter() {
        if enemy.is_dying() { continue; }
        if let Some(r) = enemy.hazard() {
            hazards.push(r);
            if r.overlaps(&player_rect) {
                match enemy {
                    Enemy::Patrol(_) => patrols_touched.push(key),
                    Enemy::Chaser(_) => chaser_hit = Some(key),
                    Enemy::Boss(_) => {}
                }
            }
        }
        if matches!(enemy, Enemy::Boss(_)) {
            for (spell_key, slot) in world.spells.iter().filter(|(_, s)| s.caster == key) {
                let Some(r) = slot.spell.hazard_rect() else { continue };
                hazards.push(r);
                if r.overlaps(&player_rect) { spells_on_player.push(spell_key); }
            }
        }
    }

    for key in patrols_touched {
        if let Some(Enemy::Patrol(p)) = world.enemies.get_mut(key) {
            p.on_player_contact(now);
        }
    }
    if let Some(key) = chaser_hit {
        if let Some(Enemy::Chaser(c)) = world.enemies.get_mut(key) { c.record_hit(); }
    }

    let timing = &world.config.timing;
    let Some(outcome) = world.player.apply_hazards(
        &hazards, world.config.physics.fall_limit_y, timing.respawn_delay_ms,
    ) else { return };

    if let Some(key) = chaser_hit {
        if let Some(Enemy::Chaser(c)) = world.enemies.get_mut(key) { c.force_combat_idle(); }
    }
    for key in spells_on_player {
        if let Some(slot) = world.spells.get_mut(key) { slot.spell.damage_dealt = true; }
    }

    let hearts = world.player.hearts;
    let cause = outcome.cause;
    info!(?cause, hearts, temporary = outcome.temporary_death, "player damaged");
    events.push(GameEvent::PlayerDamaged { cause, hearts });

    if outcome.temporary_death {
        world.death_delay = Some(DeathDelay { delay_ms: outcome.delay_ms, timer: None });
    } else {
        info!(?cause, "player out of hearts");
        events.push(GameEvent::PlayerDied);
    }
}

// ══════════════════════════════════════════════════════════════
// Blocking
// ══════════════════════════════════════════════════════════════

/// Solid enemies push the player back out along x: against the direction
/// of travel, or away from the enemy's centre when standing still.
pub fn resolve_blocking(world: &mut WorldState) {
    let body = &mut world.player.entity.body;
    for enemy in world.enemies.values() {
        if enemy.is_dying() { continue; }
        let Some(blocker) = enemy.as_blocking() else { continue };
        let block = blocker.block_rect();
        if !body.rect.overlaps(&block) { continue; }

        let push_left = if body.vel.x > 0.0 {
            true
        } else if body.vel.x < 0.0 {
            false
        } else {
            body.rect.centerx() < block.centerx()
        };
        if push_left {
            body.rect.set_right(block.left());
        } else {
            body.rect.set_left(block.right());
        }
        body.vel.x = 0.0;
    }
}

// ══════════════════════════════════════════════════════════════
// Combat
// ══════════════════════════════════════════════════════════════

/// The player's swing against every active enemy it overlaps.
pub fn resolve_combat(world: &mut WorldState, now: u64, events: &mut Vec<GameEvent>) {
    let Some(hitbox) = world.player.attack_hitbox() else { return };

    for enemy in world.enemies.values_mut() {
        if !enemy.is_active() || !hitbox.overlaps(enemy.rect()) { continue; }
        let kind = enemy.sprite();
        enemy.on_player_attack(now, world.frames.get(kind));

        match enemy {
            Enemy::Boss(b) => {
                info!(health = b.health, "boss hit");
                events.push(GameEvent::BossHit { health: b.health });
                if b.is_dying() {
                    info!("boss defeated");
                    events.push(GameEvent::EnemyKilled { kind });
                }
            }
            _ => {
                debug!(?kind, "enemy killed");
                events.push(GameEvent::EnemyKilled { kind });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::animation::tests::frames;
    use crate::domain::animation::AnimState;
    use crate::domain::boss::BossSpell;
    use crate::domain::enemy::SpellCast;
    use crate::domain::entity::{Facing, SpriteKind};
    use crate::domain::geom::Rect;
    use crate::sim::world::tests::world_from;
    use crate::sim::world::SpellSlot;

    fn first_enemy(world: &WorldState) -> Key {
        world.enemies.keys()[0]
    }

    fn first_enemy_rect(world: &WorldState) -> Rect {
        world.enemies.values().map(|e| *e.rect()).next().unwrap_or_default()
    }

    /// Patrol on tile 1, player moved onto it.
    fn player_on_patrol() -> WorldState {
        let mut w = world_from(&["SH", "GGGG"], &[]);
        w.player.entity.body.rect.set_left(45.0);
        w
    }

    #[test]
    fn invincible_player_takes_no_damage() {
        let mut w = player_on_patrol();
        let mut events = vec![];
        resolve_damage(&mut w, 0, &mut events);
        assert!(events.is_empty());
        assert_eq!(w.player.hearts, 8);

        w.invincibility = 0;
        resolve_damage(&mut w, 0, &mut events);
        assert_eq!(w.player.hearts, 7);
        assert!(w.death_delay.is_some());
        assert!(matches!(events[0], GameEvent::PlayerDamaged { hearts: 7, .. }));
    }

    #[test]
    fn patrol_contact_freezes_it_permanently() {
        let mut w = player_on_patrol();
        w.invincibility = 0;
        resolve_damage(&mut w, 0, &mut vec![]);
        match w.enemies.get(first_enemy(&w)) {
            Some(Enemy::Patrol(p)) => {
                assert!(p.permanent_idle);
                assert!(p.is_idling(10_000));
            }
            other => panic!("expected patrol, got {other:?}"),
        }
    }

    #[test]
    fn no_damage_during_death_delay() {
        let mut w = player_on_patrol();
        w.invincibility = 0;
        resolve_damage(&mut w, 0, &mut vec![]);
        w.player.respawn((45.0, 40.0));
        resolve_damage(&mut w, 16, &mut vec![]);
        assert_eq!(w.player.hearts, 7);
    }

    #[test]
    fn last_heart_is_terminal() {
        let mut w = player_on_patrol();
        w.invincibility = 0;
        w.player.hearts = 1;
        let mut events = vec![];
        resolve_damage(&mut w, 0, &mut events);
        assert!(!w.player.alive());
        assert!(w.death_delay.is_none());
        assert_eq!(events.last(), Some(&GameEvent::PlayerDied));
    }

    #[test]
    fn sprung_trap_hurts_only_in_its_dimension() {
        let mut w = world_from(&["STJ", "GGGG"], &[]);
        w.invincibility = 0;
        w.player.entity.body.rect.set_left(45.0);
        let mut events = vec![];
        assert_eq!(resolve_triggers(&mut w, &mut events), None);
        assert_eq!(events, vec![GameEvent::TrapTriggered { index: 0 }]);

        // Springing again is a no-op.
        events.clear();
        resolve_triggers(&mut w, &mut events);
        assert!(events.is_empty());

        let player = *w.player.rect();
        for trap in w.traps.values_mut() { trap.zone = player; }
        w.player.shift_dimension();
        resolve_damage(&mut w, 0, &mut vec![]);
        assert_eq!(w.player.hearts, 8);
        w.player.shift_dimension();
        resolve_damage(&mut w, 0, &mut vec![]);
        assert_eq!(w.player.hearts, 7);
    }

    #[test]
    fn end_trigger_follows_dimension() {
        let mut w = world_from(&["Sd", "GGGG"], &[" D", "GGGG"]);
        w.player.entity.body.rect.set_left(45.0);
        assert_eq!(resolve_triggers(&mut w, &mut vec![]), Some(EndMode::Walk));
        w.player.shift_dimension();
        assert_eq!(resolve_triggers(&mut w, &mut vec![]), Some(EndMode::JumpWalk));
    }

    #[test]
    fn chaser_swing_forces_combat_idle_on_damage() {
        let mut w = world_from(&["S F", "GGGG"], &[]);
        w.invincibility = 0;
        let key = first_enemy(&w);
        let player = *w.player.rect();
        let swing = frames(&[(AnimState::Attack, 8)]);
        if let Some(Enemy::Chaser(c)) = w.enemies.get_mut(key) {
            c.entity.facing = Facing::Left;
            c.entity.body.rect.set_left(player.right() + 10.0);
            c.entity.force_state(AnimState::Attack);
            while !c.in_hit_window() {
                c.entity.step(AnimState::Attack, &[], &swing, 0.0, 0);
            }
        }
        resolve_damage(&mut w, 0, &mut vec![]);
        assert_eq!(w.player.hearts, 7);
        match w.enemies.get(key) {
            Some(Enemy::Chaser(c)) => {
                assert!(c.permanent_combat_idle);
                assert!(c.hit_landed());
                assert_eq!(c.entity.state(), AnimState::CombatIdle);
                assert_eq!(c.entity.body.vel.x, 0.0);
            }
            other => panic!("expected chaser, got {other:?}"),
        }
    }

    fn hot_spell_on_player(w: &WorldState, caster: Key) -> SpellSlot {
        let p = *w.player.rect();
        let mut spell = BossSpell::new(SpellCast { x: p.x - 5.0, y: p.y - 5.0 }, w.frames.get(SpriteKind::BossSpell));
        for _ in 0..13 { spell.update(); }
        assert!(spell.hazard_rect().is_some());
        SpellSlot { caster, spell }
    }

    #[test]
    fn spell_hurts_once_then_marks_itself() {
        let mut w = world_from(&["S     B", "GGGGGGGG"], &[]);
        w.invincibility = 0;
        let slot = hot_spell_on_player(&w, first_enemy(&w));
        let key = w.spells.insert(slot);

        resolve_damage(&mut w, 0, &mut vec![]);
        assert_eq!(w.player.hearts, 7);
        assert!(w.spells.get(key).map_or(false, |s| s.spell.damage_dealt));
        assert!(w.spells.get(key).and_then(|s| s.spell.hazard_rect()).is_none());
    }

    #[test]
    fn orphan_spell_is_ignored() {
        let mut w = world_from(&["S     B", "GGGGGGGG"], &[]);
        w.invincibility = 0;
        let caster = first_enemy(&w);
        let slot = hot_spell_on_player(&w, caster);
        w.enemies.remove(caster);
        w.spells.insert(slot);

        resolve_damage(&mut w, 0, &mut vec![]);
        assert_eq!(w.player.hearts, 8);
    }

    #[test]
    fn blocking_pushes_against_travel() {
        let mut w = world_from(&["S H", "GGGG"], &[]);
        let block = first_enemy_rect(&w);
        w.player.entity.body.rect.set_right(block.left() + 5.0);
        w.player.entity.body.vel.x = 5.0;
        resolve_blocking(&mut w);
        assert_eq!(w.player.rect().right(), block.left());
        assert_eq!(w.player.entity.body.vel.x, 0.0);

        // Standing still, right of the enemy's centre: out to the right.
        w.player.entity.body.rect.set_centerx(block.centerx() + 2.0);
        resolve_blocking(&mut w);
        assert_eq!(w.player.rect().left(), block.right());
    }

    #[test]
    fn boss_does_not_block() {
        let mut w = world_from(&["S B", "GGGG"], &[]);
        let block = first_enemy_rect(&w);
        w.player.entity.body.rect.set_centerx(block.centerx());
        resolve_blocking(&mut w);
        assert_eq!(w.player.rect().centerx(), block.centerx());
    }

    #[test]
    fn swing_kills_patrol_and_chips_boss() {
        let mut w = world_from(&["S H", "GGGG"], &[]);
        let target = first_enemy_rect(&w);
        w.player.entity.body.rect.set_right(target.left() - 5.0);
        w.player.entity.facing = Facing::Right;
        assert!(w.player.begin_attack(1000));
        let mut events = vec![];
        resolve_combat(&mut w, 1000, &mut events);
        assert_eq!(events, vec![GameEvent::EnemyKilled { kind: SpriteKind::Patrol }]);
        assert!(w.enemies.values().all(|e| e.is_dying()));

        let mut w = world_from(&["S B", "GGGG"], &[]);
        let target = first_enemy_rect(&w);
        w.player.entity.body.rect.set_right(target.left() - 5.0);
        w.player.entity.facing = Facing::Right;
        w.player.begin_attack(1000);
        let mut events = vec![];
        resolve_combat(&mut w, 1000, &mut events);
        assert_eq!(events, vec![GameEvent::BossHit { health: 9 }]);
    }
}
