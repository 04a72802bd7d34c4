/// Terminal host: keyboard state and the character-cell renderer.

pub mod input;
pub mod renderer;
