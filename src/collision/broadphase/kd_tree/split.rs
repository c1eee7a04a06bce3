//! Pivot selection for turning a crowded leaf into an inner node.

use std::cmp::Ordering;

use crate::collision::aabb::{Axis, AABB};

/// A feasible split along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AxisCandidate {
    pub axis: Axis,
    pub pivot: f64,
    /// Rectangles that touch or cross the pivot and would land in the middle child.
    pub straddlers: usize,
}

/// Proposes a pivot along `axis` for the given fat rectangles.
///
/// Rectangles at least twice as long as the mean along the axis are ignored
/// when picking the pivot. The rest are ordered by their max coordinate and
/// the pivot is placed between the max of the item before the median and the
/// median's min (or its max, when the two overlap). Returns `None` when fewer
/// than two rectangles are usable.
pub(crate) fn attempt_axis(axis: Axis, rects: &[AABB]) -> Option<AxisCandidate> {
    if rects.is_empty() {
        return None;
    }
    let span_sum: f64 = rects.iter().map(|r| r.span(axis)).sum();
    let max_span = span_sum * 2.0 / rects.len() as f64;

    let mut usable: Vec<&AABB> = rects.iter().filter(|r| r.span(axis) < max_span).collect();
    if usable.len() < 2 {
        return None;
    }
    usable.sort_by(|a, b| {
        axis.of(a.max)
            .partial_cmp(&axis.of(b.max))
            .unwrap_or(Ordering::Equal)
    });

    let median = usable.len() / 2;
    let below_max = axis.of(usable[median - 1].max);
    let median_min = axis.of(usable[median].min);
    let median_max = axis.of(usable[median].max);
    let upper = if median_min > below_max { median_min } else { median_max };
    let pivot = 0.5 * (below_max + upper);

    let straddlers = rects
        .iter()
        .filter(|r| axis.of(r.min) <= pivot && axis.of(r.max) >= pivot)
        .count();

    Some(AxisCandidate {
        axis,
        pivot,
        straddlers,
    })
}

/// Picks the axis with fewer straddlers, preferring Y on ties.
///
/// Returns `None` when neither axis works or when the straddlers would still
/// be at least two thirds of the population.
pub(crate) fn choose_split(rects: &[AABB]) -> Option<AxisCandidate> {
    let x = attempt_axis(Axis::X, rects);
    let y = attempt_axis(Axis::Y, rects);
    let best = match (x, y) {
        (Some(x), Some(y)) if x.straddlers < y.straddlers => x,
        (Some(x), None) => x,
        (_, Some(y)) => y,
        (None, None) => return None,
    };
    if best.straddlers >= rects.len() * 2 / 3 {
        return None;
    }
    Some(best)
}
