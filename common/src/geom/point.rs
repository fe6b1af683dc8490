use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl Point<f64> {
    pub fn dist(&self, other: &Point<f64>) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Angle of the vector from `self` to `other`, in radians, measured
    /// counter-clockwise from the positive x axis (atan2 convention).
    pub fn angle_to(&self, other: &Point<f64>) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}
