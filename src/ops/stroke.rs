use std::iter::FusedIterator;

/// A grid cell in document coordinates.
pub type Cell = (i32, i32);

/// Bresenham walk from one cell to another, both ends included.
///
/// Consecutive cells are always 8-connected, so a stroke applied along this
/// sequence has no gaps however far the pointer jumped between frames.
#[derive(Clone, Debug)]
pub struct LinePoints {
    // i64 so that endpoints anywhere in the i32 range cannot overflow.
    x: i64,
    y: i64,
    x1: i64,
    y1: i64,
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    done: bool,
}

impl LinePoints {
    pub fn new((x0, y0): Cell, (x1, y1): Cell) -> Self {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        Self {
            x: x0,
            y: y0,
            x1,
            y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx - dy,
            done: false,
        }
    }
}

impl Iterator for LinePoints {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.done {
            return None;
        }
        // Every visited cell lies between the two i32 endpoints.
        let current = (self.x as i32, self.y as i32);
        if self.x == self.x1 && self.y == self.y1 {
            self.done = true;
            return Some(current);
        }

        let e2 = 2 * self.err;
        if e2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let remaining = self.x1.abs_diff(self.x).max(self.y1.abs_diff(self.y));
        match usize::try_from(remaining).ok().and_then(|n| n.checked_add(1)) {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}

impl FusedIterator for LinePoints {}

pub fn line_points(from: Cell, to: Cell) -> LinePoints {
    LinePoints::new(from, to)
}

/// Clip the segment `from → to` to the inclusive box `min..=max`
/// (Liang–Barsky).  Returns the clipped endpoints, snapped to cells inside
/// the box, or `None` when the segment misses the box entirely.
pub fn clip_segment(from: Cell, to: Cell, min: Cell, max: Cell) -> Option<(Cell, Cell)> {
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
    let checks = [
        (-dx, x0 - min.0 as f64),
        (dx, max.0 as f64 - x0),
        (-dy, y0 - min.1 as f64),
        (dy, max.1 as f64 - y0),
    ];

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    let snap = |t: f64| -> Cell {
        let x = (x0 + t * dx).round().clamp(min.0 as f64, max.0 as f64);
        let y = (y0 + t * dy).round().clamp(min.1 as f64, max.1 as f64);
        (x as i32, y as i32)
    };
    Some((snap(t0), snap(t1)))
}
