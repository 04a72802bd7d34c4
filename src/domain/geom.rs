/// Axis-aligned rectangles in world pixels.
///
/// `y` grows downward. Overlap is strict: rectangles that only share an
/// edge do not collide, so an entity resting with `bottom == top` of a
/// platform is not penetrating it.

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    /// Rectangle of the given size whose bottom-left corner is `(x, bottom)`.
    pub fn from_bottomleft(x: f32, bottom: f32, w: f32, h: f32) -> Self {
        Rect { x, y: bottom - h, w, h }
    }

    /// Rectangle of the given size whose bottom edge is centred on `(cx, bottom)`.
    pub fn from_midbottom(cx: f32, bottom: f32, w: f32, h: f32) -> Self {
        Rect { x: cx - w / 2.0, y: bottom - h, w, h }
    }

    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Rect { x: cx - w / 2.0, y: cy - h / 2.0, w, h }
    }

    // ── Edges ──

    pub fn left(&self) -> f32 { self.x }
    pub fn right(&self) -> f32 { self.x + self.w }
    pub fn top(&self) -> f32 { self.y }
    pub fn bottom(&self) -> f32 { self.y + self.h }
    pub fn centerx(&self) -> f32 { self.x + self.w / 2.0 }
    pub fn centery(&self) -> f32 { self.y + self.h / 2.0 }

    pub fn set_left(&mut self, v: f32) { self.x = v; }
    pub fn set_right(&mut self, v: f32) { self.x = v - self.w; }
    pub fn set_top(&mut self, v: f32) { self.y = v; }
    pub fn set_bottom(&mut self, v: f32) { self.y = v - self.h; }
    pub fn set_centerx(&mut self, v: f32) { self.x = v - self.w / 2.0; }

    pub fn set_bottomleft(&mut self, x: f32, bottom: f32) {
        self.x = x;
        self.y = bottom - self.h;
    }

    // ── Queries ──

    pub fn overlaps(&self, other: &Rect) -> bool {
        if self.w <= 0.0 || self.h <= 0.0 || other.w <= 0.0 || other.h <= 0.0 { return false; }
        self.x < other.right() && self.right() > other.x
            && self.y < other.bottom() && self.bottom() > other.y
    }

    pub fn contains_x(&self, x: f32) -> bool {
        self.left() <= x && x <= self.right()
    }

    /// Absolute centre distance on each axis.
    pub fn center_delta(&self, other: &Rect) -> (f32, f32) {
        ((self.centerx() - other.centerx()).abs(), (self.centery() - other.centery()).abs())
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect { x: self.x + dx, y: self.y + dy, ..*self }
    }
}
