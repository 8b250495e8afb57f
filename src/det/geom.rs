// Collision predicates and the small vector toolbox the simulation is built
// on. Overlap tests stay in integer arithmetic (squared distances, no square
// roots) so they are exact; the float helpers spell out their operation
// order and never reorder it.

/// Axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(cx: i64, cy: i64, w: i64, h: i64) -> Self {
        Self {
            x: cx - w / 2,
            y: cy - h / 2,
            w,
            h,
        }
    }

    pub fn contains_point(&self, px: i64, py: i64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    pub cx: i64,
    pub cy: i64,
    pub r: i64,
}

/// Strict-inequality overlap: touching edges do not collide.
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

pub fn circles_overlap(a: &Circle, b: &Circle) -> bool {
    let dx = a.cx - b.cx;
    let dy = a.cy - b.cy;
    let reach = a.r + b.r;
    dx * dx + dy * dy < reach * reach
}

pub fn circle_rect_overlap(c: &Circle, r: &Rect) -> bool {
    let nearest_x = c.cx.clamp(r.x, r.x + r.w);
    let nearest_y = c.cy.clamp(r.y, r.y + r.h);
    let dx = c.cx - nearest_x;
    let dy = c.cy - nearest_y;
    dx * dx + dy * dy < c.r * c.r
}

/// Axis-separated move-and-slide: resolve X first, then Y, so a blocked
/// diagonal still slides along the free axis. The resolution order is part
/// of the deterministic contract.
pub fn slide_move(moving: &Rect, dx: i64, dy: i64, obstacles: &[Rect]) -> Rect {
    let horizontal = Rect::new(moving.x + dx, moving.y, moving.w, moving.h);
    let x_blocked = obstacles.iter().any(|o| rects_overlap(&horizontal, o));
    let x = if x_blocked { moving.x } else { horizontal.x };

    let vertical = Rect::new(x, moving.y + dy, moving.w, moving.h);
    let y_blocked = obstacles.iter().any(|o| rects_overlap(&vertical, o));
    let y = if y_blocked { moving.y } else { vertical.y };

    Rect::new(x, y, moving.w, moving.h)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Zero vector for near-zero lengths instead of dividing by noise.
    pub fn normalize(self) -> Vec2 {
        let length = self.length();
        if length < 1e-5 {
            return Vec2::ZERO;
        }
        Vec2::new(self.x / length, self.y / length)
    }
}

/// Reflect `v` about the unit normal `n`: computed as `v - 2(v·n)n`, dot
/// product first, then the two scaled subtractions component-wise.
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    let d = v.dot(n);
    Vec2::new(v.x - 2.0 * d * n.x, v.y - 2.0 * d * n.y)
}

/// Rotate `p` about `center` by `angle` radians: translate, rotate with one
/// sin/cos pair, translate back.
pub fn rotate_about(p: Vec2, center: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    let rx = p.x - center.x;
    let ry = p.y - center.y;
    Vec2::new(
        center.x + rx * cos - ry * sin,
        center.y + rx * sin + ry * cos,
    )
}
