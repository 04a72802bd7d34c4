/// Platform collision resolver.
///
/// ## Order
///
///   1. Horizontal: move by `vel.x`, clamp against every overlapping platform.
///   2. Vertical:   add gravity, move by `vel.y`, clamp and zero `vel.y`.
///
/// Horizontal clamping never zeroes `vel.x`: held input keeps pushing into
/// the wall next frame and is pushed back out again.
///
/// Dead bodies skip step 1 and only resolve downward contacts, so a corpse
/// settles onto the floor but is never shoved sideways or popped upward.
///
/// ## Multiple overlaps
///
/// Platforms are visited in slice order and each overlap is resolved on its
/// own. Horizontally every overlap rewrites the edge, so the last platform
/// visited wins. Vertically the first clamp zeroes `vel.y`, so the first
/// overlapping platform visited decides and later ones are left as they are.

use super::geom::Rect;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// The physical part of an entity: where it is and how it moves.
#[derive(Clone, Copy, Debug)]
pub struct Body {
    pub rect: Rect,
    pub vel: Velocity,
    pub on_ground: bool,
}

impl Body {
    pub fn new(rect: Rect) -> Self {
        Body { rect, vel: Velocity::default(), on_ground: false }
    }
}

/// Advance `body` by one frame against `platforms`.
pub fn integrate(body: &mut Body, alive: bool, platforms: &[Rect], gravity: f32) {
    if !alive {
        body.vel.x = 0.0;
        body.vel.y += gravity;
        body.rect.y += body.vel.y;
        for p in platforms {
            if body.rect.overlaps(p) && body.vel.y > 0.0 {
                body.rect.set_bottom(p.top());
                body.vel.y = 0.0;
            }
        }
        return;
    }

    resolve_horizontal(body, platforms);
    resolve_vertical(body, platforms, gravity);
}

fn resolve_horizontal(body: &mut Body, platforms: &[Rect]) {
    body.rect.x += body.vel.x;
    for p in platforms {
        if !body.rect.overlaps(p) { continue; }
        if body.vel.x > 0.0 {
            body.rect.set_right(p.left());
        } else if body.vel.x < 0.0 {
            body.rect.set_left(p.right());
        }
    }
}

fn resolve_vertical(body: &mut Body, platforms: &[Rect], gravity: f32) {
    body.vel.y += gravity;
    body.rect.y += body.vel.y;
    body.on_ground = false;
    for p in platforms {
        if !body.rect.overlaps(p) { continue; }
        if body.vel.y > 0.0 {
            body.rect.set_bottom(p.top());
            body.vel.y = 0.0;
            body.on_ground = true;
        } else if body.vel.y < 0.0 {
            body.rect.set_top(p.bottom());
            body.vel.y = 0.0;
        }
    }
}

/// Is there a platform under the leading edge of `rect` when walking in `dir`?
///
/// Probes a 2x3 sliver just below the ground line, 10 px past the half width.
pub fn ground_ahead(rect: &Rect, dir: f32, platforms: &[Rect]) -> bool {
    let front_x = rect.centerx() + dir * (rect.w / 2.0 + 10.0);
    let probe = Rect::new(front_x, rect.bottom() + 1.0, 2.0, 3.0);
    platforms.iter().any(|p| probe.overlaps(p))
}
