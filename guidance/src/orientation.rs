//! Device attitude estimation from motion sensors.
//!
//! Accelerometer and magnetometer samples arrive independently, are smoothed
//! with a low-pass filter, and are combined into a rotation matrix from which
//! compass azimuth, pitch and roll are extracted. Output angles are in
//! degrees, rounded to two decimal places.

use log::{info, warn};
use nalgebra::{Matrix3, Vector3};

use crate::angles::{normalize_bearing, round_hundredths};
use crate::types::{Attitude, SensorAccuracy};

/// Low-pass smoothing factor. Smaller values smooth harder.
pub const FILTER_ALPHA: f64 = 0.08;

const STANDARD_GRAVITY: f64 = 9.81;

/// Gravity magnitude squared below which the device counts as free falling
/// and no orientation can be derived.
const FREE_FALL_GRAVITY_SQUARED: f64 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;

/// Minimum norm of the field x gravity cross product. Below this the field
/// is close to parallel with gravity and the horizontal reference direction
/// is undefined.
const MIN_HORIZONTAL_NORM: f64 = 0.1;

/// Smooths raw sensor samples and derives the device attitude.
///
/// Samples from the two sensors may interleave in any order and at any
/// rate; the attitude is recomputed whenever both filtered vectors exist.
/// The first sample from each sensor seeds its filter unchanged.
#[derive(Debug, Default)]
pub struct AttitudeFilter {
    filtered_accel: Option<Vector3<f64>>,
    filtered_mag: Option<Vector3<f64>>,
    attitude: Attitude,
    sensors_missing: bool,
}

impl AttitudeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently derived attitude.
    pub fn attitude(&self) -> Attitude {
        self.attitude
    }

    /// Whether the device was declared to have no usable motion sensors.
    pub fn sensors_missing(&self) -> bool {
        self.sensors_missing
    }

    /// Feed an accelerometer sample in device coordinates, m/s^2.
    pub fn ingest_accelerometer(&mut self, sample: Vector3<f64>) -> Attitude {
        if self.sensors_missing {
            return self.attitude;
        }
        self.filtered_accel = Some(low_pass(self.filtered_accel, sample));
        self.recompute();
        self.attitude
    }

    /// Feed a magnetometer sample in device coordinates, microtesla.
    pub fn ingest_magnetometer(&mut self, sample: Vector3<f64>) -> Attitude {
        if self.sensors_missing {
            return self.attitude;
        }
        self.filtered_mag = Some(low_pass(self.filtered_mag, sample));
        self.recompute();
        self.attitude
    }

    /// Record a compass accuracy report.
    ///
    /// Accuracy is attached to every subsequent attitude output until the
    /// next report. It bypasses the smoothing filter entirely.
    pub fn update_accuracy(&mut self, accuracy: SensorAccuracy) {
        if self.sensors_missing {
            return;
        }
        if self.attitude.accuracy != Some(accuracy) {
            match accuracy {
                SensorAccuracy::Unreliable | SensorAccuracy::Low => warn!(
                    "compass accuracy degraded to {:?}, calibration recommended",
                    accuracy
                ),
                _ => info!("compass accuracy now {:?}", accuracy),
            }
        }
        self.attitude.accuracy = Some(accuracy);
    }

    /// Declare that the device has no usable motion sensors.
    ///
    /// Further samples are ignored and the attitude stays in the unknown
    /// state. The flag survives `reset`.
    pub fn mark_sensors_missing(&mut self) {
        if !self.sensors_missing {
            warn!("motion sensors unavailable, attitude will stay unknown");
        }
        self.sensors_missing = true;
        self.filtered_accel = None;
        self.filtered_mag = None;
        self.attitude = Attitude::default();
    }

    /// Clear smoothing state and the reported attitude.
    ///
    /// Used when sensor listening restarts: the next sample from each
    /// sensor reseeds its filter instead of blending into stale state.
    pub fn reset(&mut self) {
        self.filtered_accel = None;
        self.filtered_mag = None;
        self.attitude = Attitude::default();
    }

    fn recompute(&mut self) {
        let (Some(gravity), Some(field)) = (self.filtered_accel, self.filtered_mag) else {
            return;
        };
        match rotation_matrix(&gravity, &field) {
            Some(r) => {
                let (azimuth, pitch, roll) = orientation_angles(&r);
                self.attitude.azimuth = round_hundredths(azimuth);
                self.attitude.pitch = round_hundredths(pitch);
                self.attitude.roll = round_hundredths(roll);
            }
            None => {
                // Free fall or field parallel to gravity. Zero the angles
                // until geometry recovers; accuracy is left untouched.
                warn!("degenerate sensor geometry, attitude zeroed");
                self.attitude.azimuth = 0.0;
                self.attitude.pitch = 0.0;
                self.attitude.roll = 0.0;
            }
        }
    }
}

fn low_pass(previous: Option<Vector3<f64>>, sample: Vector3<f64>) -> Vector3<f64> {
    match previous {
        // First sample seeds the filter unchanged.
        None => sample,
        Some(prev) => prev + (sample - prev) * FILTER_ALPHA,
    }
}

/// Rotation matrix whose rows are east, magnetic north (horizontal) and up,
/// expressed in device coordinates.
///
/// Returns `None` when gravity is too weak (free fall) or the magnetic
/// field has no usable horizontal component.
fn rotation_matrix(gravity: &Vector3<f64>, field: &Vector3<f64>) -> Option<Matrix3<f64>> {
    if gravity.norm_squared() < FREE_FALL_GRAVITY_SQUARED {
        return None;
    }
    let h = field.cross(gravity);
    if h.norm() < MIN_HORIZONTAL_NORM {
        return None;
    }
    let h = h.normalize();
    let a = gravity.normalize();
    let m = a.cross(&h);
    Some(Matrix3::new(
        h.x, h.y, h.z, //
        m.x, m.y, m.z, //
        a.x, a.y, a.z,
    ))
}

/// Extract azimuth, pitch and roll in degrees from a rotation matrix.
///
/// Azimuth is normalized into [0, 360); pitch is in [-90, 90]; roll is in
/// (-180, 180].
fn orientation_angles(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let azimuth = r[(0, 1)].atan2(r[(1, 1)]).to_degrees();
    let pitch = (-r[(2, 1)]).asin().to_degrees();
    let roll = (-r[(2, 0)]).atan2(r[(2, 2)]).to_degrees();
    (normalize_bearing(azimuth), pitch, roll)
}
