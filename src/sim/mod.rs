/// World context and everything that drives it frame by frame: the level
/// provider, sprite frames, the clock, and the ordered step passes.

pub mod arena;
pub mod assets;
pub mod clock;
pub mod damage;
pub mod end_sequence;
pub mod event;
pub mod level;
pub mod step;
pub mod world;
