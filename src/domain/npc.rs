/// Talkative villagers.
///
/// An NPC stands still, idles, and can be talked to when the player is
/// close but not on top of it. After one full conversation it keeps
/// watching the player until they walk away, then turns back.

use super::animation::{AnimState, FrameSet};
use super::entity::{Dimension, Facing};
use super::geom::Rect;

pub const NPC_W: f32 = 48.0;
pub const NPC_H: f32 = 64.0;
const INTERACT_MAX: f32 = 120.0;
const INTERACT_MIN: f32 = 30.0;
const WATCH_DISTANCE: f32 = 200.0;
const IDLE_FRAME_STEP: f32 = 0.08;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NpcVariant {
    OldMan,
    Woman,
    Bearded,
    HatMan,
}

impl NpcVariant {
    /// Level glyph to variant; `A` reads differently in each dimension file.
    pub fn from_glyph(c: char, dim: Dimension) -> Option<Self> {
        match (c.to_ascii_uppercase(), dim) {
            ('A', Dimension::Gema) => Some(NpcVariant::Woman),
            ('A', _) => Some(NpcVariant::OldMan),
            ('Q', _) => Some(NpcVariant::Bearded),
            ('W', _) => Some(NpcVariant::HatMan),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NpcVariant::OldMan => "oldman",
            NpcVariant::Woman => "woman",
            NpcVariant::Bearded => "bearded",
            NpcVariant::HatMan => "hat-man",
        }
    }

    pub fn dialog(self, dim: Dimension) -> &'static [&'static str] {
        let gema = dim == Dimension::Gema;
        match (self, gema) {
            (NpcVariant::OldMan | NpcVariant::Woman, false) => &[
                "Hello, traveler!",
                "Welcome to the world of Dual Dimension.",
                "Here you can move between two dimensions.",
                "To defeat an enemy, strike when you are close.",
                "Use your powers wisely.",
                "Safe travels!",
            ],
            (NpcVariant::OldMan | NpcVariant::Woman, true) => &[
                "This is the echo dimension.",
                "Everything here differs from the normal world.",
                "Platforms and enemies may change.",
                "To defeat an enemy, strike when you are close.",
                "Tread carefully here.",
                "Don't forget to return to the normal dimension!",
            ],
            (NpcVariant::Bearded, false) => &[
                "Welcome, adventurer!",
                "Let me teach you something important.",
                "Press [SHIFT] to change dimension.",
                "You can switch at any time!",
                "Use it to slip past danger.",
                "Good luck out there!",
            ],
            (NpcVariant::Bearded, true) => &[
                "Oh, you're already in the echo dimension!",
                "This place is full of mystery and danger.",
                "Some platforms only exist here.",
                "Press [SHIFT] to go back to the normal dimension.",
                "Don't stay too long!",
            ],
            (NpcVariant::HatMan, false) => &[
                "Watch out for the enemies ahead!",
                "They are very dangerous.",
                "Good luck!",
            ],
            (NpcVariant::HatMan, true) => &[
                "Welcome to the echo dimension.",
                "Everything is different here.",
                "Mind your step.",
                "Avoid the traps.",
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Npc {
    pub rect: Rect,
    pub dimension: Dimension,
    pub variant: NpcVariant,
    pub facing: Facing,
    default_facing: Facing,
    dialog: &'static [&'static str],
    dialog_index: usize,
    pub talking: bool,
    pub has_talked: bool,
    watching: bool,
    watch_ended: bool,
    can_interact: bool,
    frame: f32,
}

impl Npc {
    pub fn new(x: f32, bottom: f32, variant: NpcVariant, dimension: Dimension, facing: Facing) -> Self {
        Npc {
            rect: Rect::from_bottomleft(x, bottom, NPC_W, NPC_H),
            dimension,
            variant,
            facing,
            default_facing: facing,
            dialog: variant.dialog(dimension),
            dialog_index: 0,
            talking: false,
            has_talked: false,
            watching: false,
            watch_ended: false,
            can_interact: false,
            frame: 0.0,
        }
    }

    pub fn frame(&self) -> usize { self.frame as usize }
    pub fn can_interact(&self) -> bool { self.can_interact }
    pub fn is_watching(&self) -> bool { self.watching }

    /// The line on screen while a conversation is open.
    pub fn current_line(&self) -> Option<&'static str> {
        if !self.talking { return None; }
        self.dialog.get(self.dialog_index).copied()
    }

    pub fn update(&mut self, player: &Rect, frames: &FrameSet) {
        let (dx, dy) = self.rect.center_delta(player);

        if self.has_talked && !self.talking && !self.watch_ended {
            if dx.hypot(dy) < WATCH_DISTANCE {
                self.watching = true;
            } else {
                self.watching = false;
                self.watch_ended = true;
            }
        } else if !self.talking {
            self.watching = false;
        }

        let len = frames.len(AnimState::Idle);
        if self.talking || self.watching {
            self.frame = 0.0;
        } else if len > 1 {
            self.frame = (self.frame + IDLE_FRAME_STEP) % len as f32;
        }

        let too_close = dx < INTERACT_MIN && dy < INTERACT_MAX;
        self.can_interact = dx < INTERACT_MAX && dy < INTERACT_MAX && !too_close;

        if self.watching {
            self.facing = Facing::toward(self.rect.centerx(), player.centerx());
        } else if self.has_talked && self.watch_ended {
            self.facing = self.default_facing;
        }
    }

    /// Talk key pressed. Opens the conversation from the first line or
    /// advances it; past the last line it closes. Returns the direction
    /// the player should turn to when a conversation opens.
    pub fn interact(&mut self, player: &Rect) -> Option<Facing> {
        if !self.can_interact { return None; }
        if !self.talking {
            self.talking = true;
            self.dialog_index = 0;
            self.watch_ended = false;
            self.facing = Facing::toward(self.rect.centerx(), player.centerx());
            return Some(Facing::toward(player.centerx(), self.rect.centerx()));
        }
        self.dialog_index += 1;
        if self.dialog_index >= self.dialog.len() {
            self.talking = false;
            self.has_talked = true;
            self.dialog_index = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::animation::tests::frames;

    fn npc() -> Npc {
        Npc::new(100.0, 200.0, NpcVariant::HatMan, Dimension::Normal, Facing::Left)
    }

    fn player_at(x: f32) -> Rect {
        Rect::from_bottomleft(x, 200.0, 21.0, 38.0)
    }

    #[test]
    fn glyph_variants_depend_on_dimension() {
        assert_eq!(NpcVariant::from_glyph('A', Dimension::Normal), Some(NpcVariant::OldMan));
        assert_eq!(NpcVariant::from_glyph('a', Dimension::Gema), Some(NpcVariant::Woman));
        assert_eq!(NpcVariant::from_glyph('w', Dimension::Gema), Some(NpcVariant::HatMan));
        assert_eq!(NpcVariant::from_glyph('Z', Dimension::Normal), None);
    }

    #[test]
    fn interaction_window_excludes_overlap() {
        let f = FrameSet::new();
        let mut n = npc();
        // NPC centre x = 124.
        n.update(&player_at(113.5), &f);
        assert!(!n.can_interact());
        n.update(&player_at(180.0), &f);
        assert!(n.can_interact());
        n.update(&player_at(400.0), &f);
        assert!(!n.can_interact());
    }

    #[test]
    fn conversation_runs_through_all_lines() {
        let f = FrameSet::new();
        let mut n = npc();
        let p = player_at(180.0);
        n.update(&p, &f);
        assert_eq!(n.interact(&p), Some(Facing::Left));
        assert_eq!(n.facing, Facing::Right);
        assert_eq!(n.current_line(), Some("Watch out for the enemies ahead!"));
        n.interact(&p);
        n.interact(&p);
        assert_eq!(n.current_line(), Some("Good luck!"));
        n.interact(&p);
        assert!(!n.talking);
        assert!(n.has_talked);
        assert!(n.current_line().is_none());

        // Reopening starts from the first line.
        n.interact(&p);
        assert_eq!(n.current_line(), Some("Watch out for the enemies ahead!"));
    }

    #[test]
    fn watches_after_talk_until_player_leaves() {
        let f = frames(&[(AnimState::Idle, 4)]);
        let mut n = npc();
        let p = player_at(180.0);
        n.update(&p, &f);
        for _ in 0..4 { n.interact(&p); }
        assert!(n.has_talked);

        n.update(&p, &f);
        assert!(n.is_watching());
        assert_eq!(n.facing, Facing::Right);
        for _ in 0..50 { n.update(&p, &f); }
        assert_eq!(n.frame(), 0);

        n.update(&player_at(600.0), &f);
        assert!(!n.is_watching());
        assert_eq!(n.facing, Facing::Left);

        // The session is over: coming back does not restart watching.
        n.update(&p, &f);
        assert!(!n.is_watching());
    }

    #[test]
    fn idle_animation_advances_slowly() {
        let f = frames(&[(AnimState::Idle, 4)]);
        let mut n = npc();
        let far = player_at(1000.0);
        for _ in 0..12 { n.update(&far, &f); }
        assert_eq!(n.frame(), 0);
        for _ in 0..2 { n.update(&far, &f); }
        assert_eq!(n.frame(), 1);
    }
}
