//! Narrow phase: closest points between two world-space capsules.

use crate::math::scalar::{clamp_symmetric, eps_sign, EPS, LARGE_EPS};
use crate::math::vec2::Vec2;
use crate::shapes::{CapsuleCache, Circle};

use super::manifold::ClosestPoints;

/// Closest points between two circles. Coincident centers are degenerate.
pub fn collide_circles(a: &Circle, b: &Circle) -> ClosestPoints {
    let delta = b.center - a.center;
    let center_distance = delta.magnitude();
    let (normal, degenerate) = delta.safe_div_positive(center_distance);
    ClosestPoints {
        degenerate,
        ..ClosestPoints::new(
            a.center + normal * a.radius,
            b.center - normal * b.radius,
            normal,
            center_distance - (a.radius + b.radius),
        )
    }
}

/// Closest points between two capsules.
///
/// Nearly parallel segments take a dedicated path that reports a spread
/// contact. Everything else, circles included, compares two candidate
/// point pairs built from each capsule's end nearest to the other's axis.
/// When `notables` is given, the four candidate points of the general path
/// are appended to it for debug overlays.
pub fn collide(c0: &CapsuleCache, c1: &CapsuleCache, notables: Option<&mut Vec<Vec2>>) -> ClosestPoints {
    if c0.normal.cross(c1.normal).abs() < LARGE_EPS && !c0.is_circle && !c1.is_circle {
        return collide_parallel(c0, c1);
    }
    let r0 = c0.radius();
    let r1 = c1.radius();

    let c0_near = near_end(c0, c1);
    let c1_near = near_end(c1, c0);
    let c0_closest = closest_axis_point(c0, c1_near);
    let c1_closest = closest_axis_point(c1, c0_near);

    if let Some(sink) = notables {
        sink.extend_from_slice(&[c0_near, c1_near, c0_closest, c1_closest]);
    }

    let dir_a = c1_closest - c0_near;
    let dir_b = c1_near - c0_closest;
    let (dir, p0, p1) = if dir_b.magnitude_squared() < dir_a.magnitude_squared() {
        (dir_b, c0_closest, c1_near)
    } else {
        (dir_a, c0_near, c1_closest)
    };

    let distance = dir.magnitude();
    let (normal, degenerate) = dir.safe_div_positive(distance);
    if degenerate {
        return ClosestPoints::degenerate();
    }
    ClosestPoints::new(p0 + normal * r0, p1 - normal * r1, normal, distance - (r0 + r1))
}

/// The endpoint of `subject` closest to the infinite line through `reference`.
fn near_end(subject: &CapsuleCache, reference: &CapsuleCache) -> Vec2 {
    if subject.is_circle {
        return subject.center;
    }
    let p0 = subject.capsule.p0;
    let p1 = subject.capsule.p1;
    let d0 = (p0 - reference.center).dot(reference.normal).abs();
    let d1 = (p1 - reference.center).dot(reference.normal).abs();
    if d0 <= d1 {
        p0
    } else {
        p1
    }
}

/// Projection of `point` onto the segment of `subject`, clamped to its ends.
///
/// A degenerate axis picks an endpoint by the epsilon-sign of the projection
/// instead of dividing by ~0.
fn closest_axis_point(subject: &CapsuleCache, point: Vec2) -> Vec2 {
    let dir = subject.direction();
    let projected = (point - subject.center).dot(dir);
    let dir_sq = dir.magnitude_squared();
    let t = if dir_sq > EPS {
        clamp_symmetric(projected / dir_sq, 0.5)
    } else {
        0.5 * eps_sign(projected)
    };
    subject.center + dir * t
}

fn collide_parallel(c0: &CapsuleCache, c1: &CapsuleCache) -> ClosestPoints {
    let c0p0 = c0.capsule.p0;
    let c0p1 = c0.capsule.p1;
    // Walk the second segment in the same direction as the first.
    let (c1p0, c1p1) = if c1.normal.dot(c0.normal) >= 0.0 {
        (c1.capsule.p0, c1.capsule.p1)
    } else {
        (c1.capsule.p1, c1.capsule.p0)
    };

    let axis = -c0.normal.perpendicular();
    let x00 = 0.0;
    let x01 = c0.length;
    let x10 = (c1p0 - c0p0).dot(axis);
    let x11 = (c1p1 - c0p0).dot(axis);

    if x01 < x10 {
        return collide_circles(
            &Circle { center: c0p1, radius: c0.radius() },
            &Circle { center: c1p0, radius: c1.radius() },
        );
    }
    if x11 < x00 {
        return collide_circles(
            &Circle { center: c0p0, radius: c0.radius() },
            &Circle { center: c1p1, radius: c1.radius() },
        );
    }

    let mut normal = c0.normal;
    let mut separation = (c1.center - c0.center).dot(normal);
    if separation < 0.0 {
        normal = -normal;
        separation = -separation;
    }
    if separation < EPS {
        return ClosestPoints::degenerate();
    }

    let overlap_max = x01.min(x11);
    let overlap_min = x00.max(x10);
    let mid = 0.5 * (overlap_max + overlap_min);

    ClosestPoints::new(
        c0p0 + (c0p1 - c0p0) * (mid * c0.inv_length) + normal * c0.radius(),
        c1p0 + (c1p1 - c1p0) * ((mid - x10) * c1.inv_length) - normal * c1.radius(),
        normal,
        separation - (c0.radius() + c1.radius()),
    )
    .with_spread(overlap_max - overlap_min)
}
