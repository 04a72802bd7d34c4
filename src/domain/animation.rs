/// Per-entity animation state machine.
///
/// The machine never decides *which* state to show; each entity kind
/// computes that and hands it to [`Animator::tick`]. The machine owns the
/// frame timer and the looping rules:
///
/// ```text
///   timer > threshold ─┬─ looping:      frame = (frame + 1) % len
///                      └─ non-looping:  frame < len-1 ? frame + 1 : finished
/// ```
///
/// An empty (or missing) frame list is legal. The logic still runs, only
/// the displayed frame is left untouched.

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AnimState {
    Idle,
    Run,
    Walk,
    Jump,
    Fall,
    Attack,
    CombatIdle,
    Cast,
    Hurt,
    Death,
}

impl AnimState {
    pub fn name(self) -> &'static str {
        match self {
            AnimState::Idle => "idle",
            AnimState::Run => "run",
            AnimState::Walk => "walk",
            AnimState::Jump => "jump",
            AnimState::Fall => "fall",
            AnimState::Attack => "attack",
            AnimState::CombatIdle => "combat_idle",
            AnimState::Cast => "cast",
            AnimState::Hurt => "hurt",
            AnimState::Death => "death",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let s = match name {
            "idle" => AnimState::Idle,
            "run" => AnimState::Run,
            "walk" => AnimState::Walk,
            "jump" => AnimState::Jump,
            "fall" => AnimState::Fall,
            "attack" => AnimState::Attack,
            "combat_idle" => AnimState::CombatIdle,
            "cast" => AnimState::Cast,
            "hurt" => AnimState::Hurt,
            "death" => AnimState::Death,
            _ => return None,
        };
        Some(s)
    }
}

/// Opaque drawable handle. The simulation only reads its size.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Frame {
    pub id: u32,
    pub width: f32,
    pub height: f32,
}

/// Ordered frames per animation state for one sprite kind.
#[derive(Clone, Debug, Default)]
pub struct FrameSet {
    strips: HashMap<AnimState, Vec<Frame>>,
}

impl FrameSet {
    pub fn new() -> Self {
        FrameSet { strips: HashMap::new() }
    }

    pub fn insert(&mut self, state: AnimState, frames: Vec<Frame>) {
        self.strips.insert(state, frames);
    }

    /// Frames for `state`; an unknown state reads as an empty strip.
    pub fn strip(&self, state: AnimState) -> &[Frame] {
        self.strips.get(&state).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self, state: AnimState) -> usize {
        self.strip(state).len()
    }

    pub fn get(&self, state: AnimState, index: usize) -> Option<Frame> {
        self.strip(state).get(index).copied()
    }

    pub fn has(&self, state: AnimState) -> bool {
        self.len(state) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.strips.values().all(|v| v.is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct Animator {
    state: AnimState,
    frame: usize,
    timer: u32,
    finished: bool,
    non_looping: &'static [AnimState],
    image: Option<Frame>,
}

impl Animator {
    pub fn new(initial: AnimState, non_looping: &'static [AnimState]) -> Self {
        Animator {
            state: initial,
            frame: 0,
            timer: 0,
            finished: false,
            non_looping,
            image: None,
        }
    }

    pub fn state(&self) -> AnimState { self.state }
    pub fn frame(&self) -> usize { self.frame }
    pub fn is_finished(&self) -> bool { self.finished }
    pub fn image(&self) -> Option<Frame> { self.image }

    pub fn is_looping(&self, state: AnimState) -> bool {
        !self.non_looping.contains(&state)
    }

    /// Switch to `state`. Frame, timer and finished reset only on a change.
    pub fn set_state(&mut self, state: AnimState) {
        if self.state == state { return; }
        self.state = state;
        self.restart();
    }

    /// Replay the current state from its first frame.
    pub fn restart(&mut self) {
        self.frame = 0;
        self.timer = 0;
        self.finished = false;
    }

    /// Advance one frame with `state` as the computed state.
    /// Returns true on the single tick where a non-looping state finishes.
    pub fn tick(&mut self, state: AnimState, frames: &FrameSet, threshold: u32) -> bool {
        self.set_state(state);
        self.timer += 1;
        if self.timer <= threshold { return false; }
        self.timer = 0;

        let len = frames.len(self.state);
        let mut just_finished = false;
        if !self.is_looping(self.state) {
            if self.frame < len.saturating_sub(1) {
                self.frame += 1;
            } else if !self.finished {
                self.finished = true;
                just_finished = true;
            }
        } else if len > 0 {
            self.frame = (self.frame + 1) % len;
        }

        if len > 0 {
            self.image = frames.get(self.state, self.frame.min(len - 1));
        }
        just_finished
    }
}
