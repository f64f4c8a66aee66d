/// Integer line walk from a start pixel towards an end point.
///
/// Steps one pixel at a time along the major axis and rounds the minor axis
/// to the nearest pixel. The start pixel itself is not yielded. The walk stops
/// at the end point or after `max_steps` pixels, whichever comes first, so it
/// is always finite. Each call to [`LineWalk::new`] starts a fresh walk.
#[derive(Debug, Clone)]
pub struct LineWalk {
    start_x: f64,
    start_y: f64,
    step_x: f64,
    step_y: f64,
    next: usize,
    steps: usize,
}

impl LineWalk {
    /// Walk from `start` towards `end`, truncated at `max_steps` pixels
    pub fn new(start: (i64, i64), end: (f64, f64), max_steps: usize) -> Self {
        let (sx, sy) = (start.0 as f64, start.1 as f64);
        let (dx, dy) = (end.0 - sx, end.1 - sy);
        let major = dx.abs().max(dy.abs());

        let (step_x, step_y, length) = if major > 0.0 && dx.is_finite() && dy.is_finite() {
            (dx / major, dy / major, major.round() as usize)
        } else {
            (0.0, 0.0, 0)
        };

        Self {
            start_x: sx,
            start_y: sy,
            step_x,
            step_y,
            next: 1,
            steps: length.min(max_steps),
        }
    }

    /// Walk the whole segment from `start` to `end`
    pub fn to_end(start: (i64, i64), end: (f64, f64)) -> Self {
        Self::new(start, end, usize::MAX)
    }

    /// Total number of pixels the walk visits
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl Iterator for LineWalk {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.steps {
            return None;
        }
        let i = self.next as f64;
        self.next += 1;
        let x = (self.start_x + i * self.step_x).round() as i64;
        let y = (self.start_y + i * self.step_y).round() as i64;
        Some((x, y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.steps + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LineWalk {}
