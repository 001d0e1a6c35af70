//! Angle arithmetic helpers.

/// Normalize a bearing into [0, 360).
pub fn normalize_bearing(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Signed shortest rotation from `current` to `target`, in (-180, 180].
///
/// Positive means rotate clockwise (toward larger bearings). Inputs may be
/// any finite angle; only their difference matters.
pub fn signed_delta(current: f64, target: f64) -> f64 {
    let diff = (target - current).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Round to two decimal places, ties away from zero.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
