//! Rectangles.

use cgmath::{Point2, Vector2};
use std::ops;

/// A rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point2<f64>,

    /// Rectangle size.
    pub size: Vector2<f64>,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<f64>, size: Vector2<f64>) -> Rect {
        Rect { origin, size }
    }

    /// Returns the smallest rectangle containing both rectangles.
    pub fn union(&self, rect: Rect) -> Rect {
        let min_x = self.origin.x.min(rect.origin.x);
        let min_y = self.origin.y.min(rect.origin.y);
        let max_x = (self.origin.x + self.size.x).max(rect.origin.x + rect.size.x);
        let max_y = (self.origin.y + self.size.y).max(rect.origin.y + rect.size.y);

        Rect {
            origin: (min_x, min_y).into(),
            size: (max_x - min_x, max_y - min_y).into(),
        }
    }

    /// Returns a new rectangle with the given size.
    pub fn with_size(&self, size: Vector2<f64>) -> Rect {
        Rect {
            origin: self.origin,
            size,
        }
    }
}

impl ops::Add<Vector2<f64>> for Rect {
    type Output = Rect;
    fn add(self, offset: Vector2<f64>) -> Rect {
        Rect {
            origin: self.origin + offset,
            size: self.size,
        }
    }
}

#[test]
fn test_rect_union_and_offset() {
    let a = Rect::new(Point2::new(0., 0.), Vector2::new(10., 10.));
    let b = Rect::new(Point2::new(5., 5.), Vector2::new(10., 2.));
    let u = a.union(b);
    assert_eq!(u.origin, Point2::new(0., 0.), "union origin");
    assert_eq!(u.size, Vector2::new(15., 10.), "union size");

    let moved = a + Vector2::new(3., 4.);
    assert_eq!(moved.origin, Point2::new(3., 4.), "offset moves origin");
    assert_eq!(moved.size, a.size, "offset keeps size");
}
