/// Keyboard state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous walking while a direction key is held
///   - Edge-triggered actions (shift, attack, talk) that fire once per press
///   - Presses that land between two simulation ticks are latched until the
///     next tick consumes them
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode, poll};

use crate::domain::player::FrameInput;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key bindings ──

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_JUMP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char(' ')];
pub const KEYS_SHIFT: &[KeyCode] = &[
    KeyCode::Tab,
    KeyCode::BackTab,
    KeyCode::Modifier(ModifierKeyCode::LeftShift),
    KeyCode::Modifier(ModifierKeyCode::RightShift),
];
pub const KEYS_ATTACK: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X'), KeyCode::Char('j'), KeyCode::Char('J')];
pub const KEYS_TALK: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Edge-triggered actions seen since the last `take_frame_input`.
    latched: FrameInput,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            latched: FrameInput::default(),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per host iteration, before any simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            self.record(key);
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);

        self.latched.jump |= self.any_pressed(KEYS_JUMP);
        self.latched.shift |= self.any_pressed(KEYS_SHIFT);
        self.latched.attack |= self.any_pressed(KEYS_ATTACK);
        self.latched.talk |= self.any_pressed(KEYS_TALK);
    }

    fn record(&mut self, key: KeyEvent) {
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, release comes from the timeout instead.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Build the input for one simulation tick and clear the latched presses.
    /// Directions come from held keys; jump also accepts a latched press so a
    /// tap shorter than a tick still counts.
    pub fn take_frame_input(&mut self) -> FrameInput {
        let latched = std::mem::take(&mut self.latched);
        FrameInput {
            left: self.any_held(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT),
            jump: latched.jump || self.any_held(KEYS_JUMP),
            shift: latched.shift,
            attack: latched.attack,
            talk: latched.talk,
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed during the last drain? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn held_direction_and_latched_attack() {
        let mut s = InputState::new();
        s.record(key(KeyCode::Left, KeyEventKind::Press));
        s.record(key(KeyCode::Char('x'), KeyEventKind::Press));
        s.latched.attack |= s.any_pressed(KEYS_ATTACK);

        let first = s.take_frame_input();
        assert!(first.left);
        assert!(!first.right);
        assert!(first.attack);

        // The press was consumed; the key is still held but fires no new swing.
        let second = s.take_frame_input();
        assert!(second.left);
        assert!(!second.attack);
    }

    #[test]
    fn repeat_events_are_not_fresh_presses() {
        let mut s = InputState::new();
        s.record(key(KeyCode::Tab, KeyEventKind::Press));
        s.fresh_presses.clear();
        s.record(key(KeyCode::Tab, KeyEventKind::Repeat));
        assert!(!s.any_pressed(KEYS_SHIFT));
        assert!(s.any_held(KEYS_SHIFT));
    }

    #[test]
    fn release_only_honored_with_enhancement() {
        let mut s = InputState::new();
        s.record(key(KeyCode::Right, KeyEventKind::Press));
        s.record(key(KeyCode::Right, KeyEventKind::Release));
        assert!(s.is_held(KeyCode::Right));

        s.honor_release = true;
        s.record(key(KeyCode::Right, KeyEventKind::Release));
        assert!(!s.is_held(KeyCode::Right));
    }
}
