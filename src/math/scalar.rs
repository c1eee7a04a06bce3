//! Scalar helpers shared by the solver and the integrator.

use std::f64::consts::PI;

/// Threshold below which a length is treated as zero.
pub const EPS: f64 = 1e-7;
/// Threshold on `|n0 x n1|` under which two capsules count as parallel.
pub const LARGE_EPS: f64 = 5e-4;
pub const TWO_PI: f64 = 2.0 * PI;

/// Returns `(1 / x, false)` for `x >= EPS`, `(0, true)` otherwise.
pub fn try_invert_positive(x: f64) -> (f64, bool) {
    if x < EPS {
        return (0.0, true);
    }
    (1.0 / x, false)
}

/// Sign of `x` with a dead zone of `EPS` around zero.
pub fn eps_sign(x: f64) -> f64 {
    if x < -EPS {
        -1.0
    } else if x > EPS {
        1.0
    } else {
        0.0
    }
}

pub fn clamp_symmetric(x: f64, max: f64) -> f64 {
    x.clamp(-max, max)
}

/// Offset that brings `value` into `[0, modulus)` when added to it.
///
/// The integrator adds the same offset to the current and the previous
/// angle so that their difference, the implicit angular velocity, survives
/// the wrap.
pub fn wrap_offset(value: f64, modulus: f64) -> f64 {
    -(value / modulus).floor() * modulus
}
