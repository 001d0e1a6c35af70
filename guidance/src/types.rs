//! Core data types shared across the guidance pipeline.

use serde::{Deserialize, Serialize};

/// A geographic position fix.
///
/// Snapshots are immutable; a new fix supersedes the previous one wholesale.
/// Absence of a fix (no permission, no signal yet) is represented by
/// `Option<GeoLocation>` at the call sites, never by sentinel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in degrees, positive north, in [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, positive east, in [-180, 180].
    pub longitude: f64,
    /// Altitude above sea level in meters, when the fix includes one.
    pub altitude_m: Option<f64>,
    /// Horizontal accuracy radius in meters, when the fix includes one.
    pub accuracy_m: Option<f64>,
}

impl GeoLocation {
    /// Create a fix from latitude and longitude alone.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m: None,
            accuracy_m: None,
        }
    }
}

/// Panel tilt strategy selected by the user.
///
/// The four fixed strategies orient by latitude and season; `Realtime`
/// follows the live sun position instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltMode {
    /// Fixed compromise orientation for the whole year.
    #[default]
    YearRound,
    /// Fixed orientation favoring the high summer sun.
    Summer,
    /// Fixed orientation favoring the low winter sun.
    Winter,
    /// Fixed orientation for the transitional seasons.
    SpringAutumn,
    /// Track the current sun position.
    Realtime,
}

/// Topocentric sun position reported by the solar oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    /// Degrees clockwise from true north, in [0, 360).
    pub azimuth: f64,
    /// Degrees above the horizon; negative when the sun is below it.
    pub altitude: f64,
}

/// Compass accuracy rating reported by the sensor stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

/// Smoothed device orientation in degrees.
///
/// Angles are rounded to two decimal places. `Default` is the unknown
/// state before any sensor sample has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    /// Compass heading of the device, degrees in [0, 360).
    pub azimuth: f64,
    /// Rotation about the device x axis, degrees. Negative when the top
    /// edge is raised.
    pub pitch: f64,
    /// Rotation about the device y axis, degrees.
    pub roll: f64,
    /// Latest accuracy rating, `None` until the sensor stack reports one.
    pub accuracy: Option<SensorAccuracy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_mode_defaults_to_year_round() {
        assert_eq!(TiltMode::default(), TiltMode::YearRound);
    }

    #[test]
    fn tilt_mode_serializes_snake_case() {
        let json = serde_json::to_string(&TiltMode::SpringAutumn).unwrap();
        assert_eq!(json, "\"spring_autumn\"");
        let back: TiltMode = serde_json::from_str("\"realtime\"").unwrap();
        assert_eq!(back, TiltMode::Realtime);
    }

    #[test]
    fn default_attitude_is_unknown() {
        let att = Attitude::default();
        assert_eq!(att.azimuth, 0.0);
        assert_eq!(att.pitch, 0.0);
        assert_eq!(att.roll, 0.0);
        assert_eq!(att.accuracy, None);
    }

    #[test]
    fn location_new_has_no_optional_fields() {
        let loc = GeoLocation::new(48.21, 16.37);
        assert_eq!(loc.altitude_m, None);
        assert_eq!(loc.accuracy_m, None);
    }
}
