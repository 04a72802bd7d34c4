/// Pure simulation rules: geometry, physics, animation and every actor
/// kind. Nothing here touches the clock, the filesystem, or the terminal.

pub mod animation;
pub mod boss;
pub mod chaser;
pub mod enemy;
pub mod entity;
pub mod geom;
pub mod npc;
pub mod patrol;
pub mod physics;
pub mod player;
pub mod trap;
