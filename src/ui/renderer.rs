/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// World pixels map onto character cells at a fixed scale:
///
/// ```text
///   one 40×40 tile  ──▶  4 columns × 2 rows
///   ┌────┐
///   │████│   horizontal origin = camera offset
///   │████│   vertical origin   = top of the level
///   └────┘
/// ```

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::enemy::Enemy;
use crate::domain::entity::Dimension;
use crate::domain::geom::Rect;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every empty cell, so the gaps between
    /// rows match the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, Color::Reset));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg);
    }
}

// ── Renderer ──

/// World pixels per terminal column / row.
const CELL_PX_W: f32 = 10.0;
const CELL_PX_H: f32 = 20.0;

const HUD_ROW: usize = 0;
const MSG_ROW: usize = 1;
const MAP_ROW: usize = 2;

const HELP_LINE: &str = "←→: move  ↑: jump  Tab: shift dimension  X: attack  E: talk  Q: quit";

const NORMAL_GROUND: Color = Color::Rgb { r: 90, g: 140, b: 70 };
const GEMA_GROUND: Color = Color::Rgb { r: 120, g: 80, b: 160 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the terminal
    /// reports key releases (keyboard enhancement).
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
            self.enhanced_keys = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_world(world);
        match world.phase {
            Phase::Playing => {}
            Phase::GameOver => self.compose_banner(world, "GAME OVER", "[R] Restart level   [Q] Quit", Color::Rgb { r: 255, g: 60, b: 60 }),
            Phase::Victory => self.compose_banner(world, "BOTH WORLDS CLEARED", "[Q] Quit", Color::Rgb { r: 255, g: 220, b: 50 }),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal's own default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState) {
        let hearts: String = (0..w.player.hearts.max(0)).map(|_| '♥').collect();
        let dim = w.dimension();
        let dim_color = if dim == Dimension::Gema { GEMA_GROUND } else { NORMAL_GROUND };

        self.front.put_str(0, HUD_ROW, &hearts, Color::Rgb { r: 230, g: 60, b: 80 });
        let level = format!("Level {}/{}", w.current_level + 1, w.levels.len());
        let x = w.player.start_hearts.max(w.player.hearts).max(0) as usize + 2;
        self.front.put_str(x, HUD_ROW, &level, Color::White);
        self.front.put_str(x + level.len() + 2, HUD_ROW, &dim.name().to_uppercase(), dim_color);

        if !w.message.is_empty() {
            self.front.put_str(0, MSG_ROW, &w.message, Color::Rgb { r: 200, g: 200, b: 120 });
        }

        if self.front.height > MAP_ROW + 1 {
            self.front.put_str(0, self.front.height - 1, HELP_LINE, Color::DarkGrey);
        }
    }

    fn compose_world(&mut self, w: &WorldState) {
        let dim = w.dimension();
        let (ox, _) = w.camera_offset();
        let ground = if dim == Dimension::Gema { GEMA_GROUND } else { NORMAL_GROUND };

        for p in w.platforms.iter().filter(|p| p.dimension.matches(dim)) {
            let ch = if p.rect.h < 40.0 { '▀' } else { '█' };
            self.fill(&p.rect, ox, ch, ground);
        }
        for t in w.end_triggers.iter().filter(|t| t.dimension.matches(dim)) {
            self.fill(&t.rect, ox, '·', Color::DarkGrey);
        }
        for c in w.campfires.iter().filter(|c| c.dimension.matches(dim)) {
            let ch = if c.frame() % 2 == 0 { '^' } else { '*' };
            self.fill(&c.rect, ox, ch, Color::Rgb { r: 255, g: 140, b: 40 });
        }
        for t in w.traps.values().filter(|t| t.dimension.matches(dim)) {
            if t.active || t.finished {
                self.fill(&t.zone, ox, '▲', Color::Rgb { r: 220, g: 220, b: 230 });
            }
        }
        for n in w.npcs.iter().filter(|n| n.dimension.matches(dim)) {
            self.fill(&n.rect, ox, '@', Color::Cyan);
        }
        for e in w.enemies.values() {
            let (ch, color) = match e {
                Enemy::Patrol(_) => ('p', Color::Rgb { r: 240, g: 160, b: 60 }),
                Enemy::Chaser(c) if c.heavy => ('H', Color::Rgb { r: 200, g: 90, b: 40 }),
                Enemy::Chaser(_) => ('c', Color::Rgb { r: 240, g: 100, b: 60 }),
                Enemy::Boss(_) => ('B', Color::Rgb { r: 255, g: 40, b: 40 }),
            };
            let color = if e.is_dying() { Color::DarkGrey } else { color };
            self.fill(e.rect(), ox, ch, color);
        }
        for slot in w.spells.values() {
            self.fill(slot.spell.rect(), ox, '✦', Color::Magenta);
        }

        // Blink while invincible.
        if w.is_invincible() && w.tick % 6 < 3 { return; }
        let ch = if w.player.alive() { 'P' } else { 'x' };
        self.fill(w.player.rect(), ox, ch, Color::Rgb { r: 255, g: 230, b: 90 });
    }

    fn compose_banner(&mut self, w: &WorldState, title: &str, hint: &str, color: Color) {
        let mid = self.front.height / 2;
        self.front.put_centered(mid.saturating_sub(1), title, color);
        let level = format!("Reached level {}", w.current_level + 1);
        self.front.put_centered(mid, &level, Color::White);
        self.front.put_centered(mid + 2, hint, Color::Rgb { r: 80, g: 255, b: 80 });
    }

    /// Paint every cell a world rectangle covers.
    fn fill(&mut self, rect: &Rect, offset_x: f32, ch: char, fg: Color) {
        let max_row = self.front.height.saturating_sub(1);
        let Some((c0, c1)) = span(rect.x - offset_x, rect.w, CELL_PX_W, self.front.width) else { return };
        let Some((r0, r1)) = span(rect.y, rect.h, CELL_PX_H, max_row.saturating_sub(MAP_ROW)) else { return };
        for row in r0..r1 {
            for col in c0..c1 {
                self.front.set(col, MAP_ROW + row, Cell::new(ch, fg, Color::Reset));
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Cell range `[start, end)` covered by a pixel run of `len` starting at
/// `pos`, clipped to `limit` cells. Every visible run covers at least one cell.
fn span(pos: f32, len: f32, cell_px: f32, limit: usize) -> Option<(usize, usize)> {
    let start = (pos / cell_px).floor();
    let end = ((pos + len) / cell_px).ceil().max(start + 1.0);
    if end <= 0.0 || start >= limit as f32 { return None; }
    Some((start.max(0.0) as usize, (end as usize).min(limit)))
}
