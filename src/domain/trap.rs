/// Level furniture with a frame counter: trigger traps and campfires.

use super::animation::{AnimState, FrameSet};
use super::enemy::Hazardous;
use super::entity::Dimension;
use super::geom::Rect;

const TRAP_FRAME_STEP: f32 = 0.2;
const CAMPFIRE_FRAME_STEP: f32 = 0.15;

/// Invisible trigger zone armed with a spike zone elsewhere.
///
/// Walking into the trigger springs the spikes, which stay deadly until
/// the player respawns.
#[derive(Clone, Debug)]
pub struct TriggerTrap {
    pub trigger: Rect,
    pub zone: Rect,
    pub dimension: Dimension,
    pub active: bool,
    pub finished: bool,
    frame: f32,
}

impl TriggerTrap {
    pub fn new(trigger: Rect, zone: Rect, dimension: Dimension) -> Self {
        TriggerTrap { trigger, zone, dimension, active: false, finished: false, frame: 0.0 }
    }

    pub fn frame(&self) -> usize { self.frame as usize }

    /// Spring the trap when the player steps into the trigger. Returns
    /// true on the frame it activates.
    pub fn try_activate(&mut self, player: &Rect, active: Dimension) -> bool {
        if self.active || !self.dimension.matches(active) { return false; }
        if !player.overlaps(&self.trigger) { return false; }
        self.active = true;
        self.finished = false;
        self.frame = 0.0;
        true
    }

    /// Play the spike strip once, then hold the last frame.
    pub fn update(&mut self, frames: &FrameSet) {
        if !self.active || self.finished { return; }
        let len = frames.len(AnimState::Idle);
        self.frame += TRAP_FRAME_STEP;
        if self.frame >= len as f32 {
            self.frame = len.saturating_sub(1) as f32;
            self.finished = true;
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.finished = false;
        self.frame = 0.0;
    }
}

impl Hazardous for TriggerTrap {
    fn hazard_rect(&self) -> Option<Rect> {
        if self.active { Some(self.zone) } else { None }
    }
}

/// Decorative looping fire.
#[derive(Clone, Debug)]
pub struct Campfire {
    pub rect: Rect,
    pub dimension: Dimension,
    frame: f32,
}

impl Campfire {
    pub fn new(rect: Rect, dimension: Dimension) -> Self {
        Campfire { rect, dimension, frame: 0.0 }
    }

    pub fn frame(&self) -> usize { self.frame as usize }

    pub fn update(&mut self, frames: &FrameSet) {
        let len = frames.len(AnimState::Idle);
        if len == 0 { return; }
        self.frame += CAMPFIRE_FRAME_STEP;
        if self.frame >= len as f32 { self.frame -= len as f32; }
    }
}
