/// Events emitted during a simulation step.
/// The host consumes these for the log and the HUD message line.

use crate::domain::entity::SpriteKind;
use crate::domain::player::DamageCause;
use crate::sim::level::EndMode;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerDamaged { cause: DamageCause, hearts: i32 },
    /// Hearts are gone; no respawn follows.
    PlayerDied,
    PlayerRespawned,
    EnemyKilled { kind: SpriteKind },
    BossHit { health: i32 },
    SpellCast { x: f32, y: f32 },
    TrapTriggered { index: usize },
    EndSequenceStarted { mode: EndMode },
    /// Now playing level `level` (0-based).
    LevelAdvanced { level: usize },
    GameOver,
    Victory,
    EnemyRemoved { kind: SpriteKind },
    NpcSays { line: &'static str },
}
