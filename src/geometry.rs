//! Convex hull geometry
//!
//! Andrew's monotone chain over single-precision points, plus the shoelace
//! area of the resulting polygon. Pure functions, no shared state.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{HullError, Result};

/// A point in the plane.
///
/// Equality is exact `f32` comparison; `Removepoint` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Lexicographic order by x, then y.
    fn lex_cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Z component of `(a - o) x (b - o)`. Positive for a counter-clockwise turn.
fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Compute the convex hull of `points` in counter-clockwise order.
///
/// The closing vertex is not repeated and collinear points are dropped.
/// The input order does not matter; only the multiset of points does.
///
/// Fails with [`HullError::InsufficientPoints`] when fewer than 3 points
/// are supplied.
pub fn convex_hull(points: &[Point]) -> Result<Vec<Point>> {
    if points.len() < 3 {
        return Err(HullError::InsufficientPoints {
            count: points.len(),
        });
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(Point::lex_cmp);

    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);

    // Lower chain, left to right
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper chain, right to left; never pops into the lower chain
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }

    // Last point equals the first
    hull.pop();
    Ok(hull)
}

/// Shoelace area of a polygon given in boundary order.
///
/// Returns 0 for fewer than 3 vertices.
pub fn polygon_area(hull: &[Point]) -> f32 {
    if hull.len() < 3 {
        return 0.0;
    }
    let twice: f32 = hull
        .iter()
        .zip(hull.iter().cycle().skip(1))
        .map(|(p, q)| p.x * q.y - q.x * p.y)
        .sum();
    twice.abs() * 0.5
}

/// Hull area of an arbitrary point set; 0 when no hull exists.
pub fn hull_area(points: &[Point]) -> f32 {
    convex_hull(points)
        .map(|hull| polygon_area(&hull))
        .unwrap_or(0.0)
}
