// Defines an Axis-Aligned Bounding Box

use serde::{Deserialize, Serialize};

use crate::math::vec2::Vec2;

/// An Axis-Aligned Bounding Box defined by its minimum and maximum corner points.
///
/// An empty box is represented as `Option::<AABB>::None`, never as an
/// inverted rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Vec2,
    pub max: Vec2,
}

/// Coordinate axis used by the k-d tree splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn of(self, v: Vec2) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }
}

impl AABB {
    /// Creates a new AABB.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        // Ensure min coordinates are <= max coordinates
        AABB {
            min: min.component_min(max),
            max: min.component_max(max),
        }
    }

    /// Creates an AABB that encompasses a set of points.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = AABB::new(*first, *first);
        for point in rest {
            aabb.min = aabb.min.component_min(*point);
            aabb.max = aabb.max.component_max(*point);
        }
        Some(aabb)
    }

    /// Checks if this AABB overlaps with another AABB. Touching edges do not count.
    pub fn overlaps(&self, other: &AABB) -> bool {
        let x_overlap = self.max.x > other.min.x && self.min.x < other.max.x;
        let y_overlap = self.max.y > other.min.y && self.min.y < other.max.y;
        x_overlap && y_overlap
    }

    /// True if `inner` lies entirely inside this box (boundaries inclusive).
    pub fn contains(&self, inner: &AABB) -> bool {
        self.min.x <= inner.min.x
            && self.max.x >= inner.max.x
            && self.min.y <= inner.min.y
            && self.max.y >= inner.max.y
    }

    /// Merges another AABB into this one, expanding this AABB to contain both.
    pub fn merge(&mut self, other: &AABB) {
        self.min = self.min.component_min(other.min);
        self.max = self.max.component_max(other.max);
    }

    pub fn merged(mut self, other: &AABB) -> AABB {
        self.merge(other);
        self
    }

    /// Merge where `None` is the empty box.
    pub fn merge_optional(a: Option<AABB>, b: Option<AABB>) -> Option<AABB> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.merged(&b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Grows every side outward by the matching component of `extension`.
    pub fn extend_sides(&self, extension: Vec2) -> AABB {
        AABB {
            min: self.min - extension,
            max: self.max + extension,
        }
    }

    /// Grows every side outward by `margin`.
    pub fn inflate(&self, margin: f64) -> AABB {
        self.extend_sides(Vec2::new(margin, margin))
    }

    pub fn translate(&self, offset: Vec2) -> AABB {
        AABB {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f64 {
        let size = self.size();
        size.x.max(size.y)
    }

    pub fn area(&self) -> f64 {
        let size = self.size();
        size.x * size.y
    }

    /// Length of the box along `axis`.
    pub fn span(&self, axis: Axis) -> f64 {
        axis.of(self.max) - axis.of(self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> AABB {
        AABB::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
    }

    #[test]
    fn test_new_normalizes_corners() {
        let r = AABB::new(Vec2::new(5.0, -1.0), Vec2::new(1.0, 3.0));
        assert_eq!(r.min, Vec2::new(1.0, -1.0));
        assert_eq!(r.max, Vec2::new(5.0, 3.0));
    }

    #[test]
    fn test_overlaps_is_strict() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        assert!(a.overlaps(&rect(1.0, 1.0, 3.0, 3.0)));
        assert!(!a.overlaps(&rect(2.0, 0.0, 4.0, 2.0)));
        assert!(!a.overlaps(&rect(3.0, 3.0, 4.0, 4.0)));
    }

    #[test]
    fn test_contains() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&rect(1.0, 1.0, 9.0, 9.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&rect(-1.0, 1.0, 9.0, 9.0)));
    }

    #[test]
    fn test_merge_and_merge_optional() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(2.0, -1.0, 3.0, 0.5);
        let m = a.merged(&b);
        assert_eq!(m, rect(0.0, -1.0, 3.0, 1.0));
        assert_eq!(AABB::merge_optional(None, None), None);
        assert_eq!(AABB::merge_optional(Some(a), None), Some(a));
        assert_eq!(AABB::merge_optional(None, Some(b)), Some(b));
        assert_eq!(AABB::merge_optional(Some(a), Some(b)), Some(m));
    }

    #[test]
    fn test_from_points() {
        assert_eq!(AABB::from_points(&[]), None);
        let r = AABB::from_points(&[
            Vec2::new(1.0, 5.0),
            Vec2::new(-2.0, 0.0),
            Vec2::new(3.0, 2.0),
        ]);
        assert_eq!(r, Some(rect(-2.0, 0.0, 3.0, 5.0)));
    }

    #[test]
    fn test_inflate_translate_size() {
        let r = rect(0.0, 0.0, 4.0, 2.0);
        assert_eq!(r.inflate(1.0), rect(-1.0, -1.0, 5.0, 3.0));
        assert_eq!(r.translate(Vec2::new(1.0, 1.0)), rect(1.0, 1.0, 5.0, 3.0));
        assert_eq!(r.size(), Vec2::new(4.0, 2.0));
        assert_eq!(r.max_extent(), 4.0);
        assert_eq!(r.area(), 8.0);
        assert_eq!(r.span(Axis::X), 4.0);
        assert_eq!(r.span(Axis::Y), 2.0);
    }
}
