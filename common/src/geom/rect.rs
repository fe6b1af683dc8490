use super::point::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point<f64>,
    pub max: Point<f64>,
}

impl Rect {
    pub fn new(min: Point<f64>, max: Point<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest rectangle containing all given points. Empty input yields the
    /// degenerate rectangle at the origin.
    pub fn bounding(points: impl IntoIterator<Item = Point<f64>>) -> Self {
        let mut it = points.into_iter();
        let Some(first) = it.next() else {
            return Rect::default();
        };
        let mut r = Rect::new(first, first);
        for p in it {
            r.min.x = r.min.x.min(p.x);
            r.min.y = r.min.y.min(p.y);
            r.max.x = r.max.x.max(p.x);
            r.max.y = r.max.y.max(p.y);
        }
        r
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: Point<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Grows the rectangle by `d` on every side.
    pub fn expand(&self, d: f64) -> Rect {
        Rect::new(
            Point::new(self.min.x - d, self.min.y - d),
            Point::new(self.max.x + d, self.max.y + d),
        )
    }

    /// Axis-aligned box of half-width `d` around a point.
    pub fn around(p: Point<f64>, d: f64) -> Rect {
        Rect::new(Point::new(p.x - d, p.y - d), Point::new(p.x + d, p.y + d))
    }
}
