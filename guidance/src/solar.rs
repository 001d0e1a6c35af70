//! Solar position oracle.
//!
//! Sun positions come from the SPA implementation in the `solar-positioning`
//! crate. The trait seam exists so the target calculator can be exercised
//! with canned positions and injected failures.

use chrono::{DateTime, Datelike, Utc};
use solar_positioning::{spa, time::DeltaT, RefractionCorrection};
use thiserror::Error;

use crate::types::SolarPosition;

/// Errors from solar position queries.
#[derive(Error, Debug)]
pub enum SolarError {
    #[error("solar position computation failed: {0}")]
    Computation(String),
    #[error("solar position is not finite: azimuth {azimuth}, altitude {altitude}")]
    NonFinite { azimuth: f64, altitude: f64 },
}

/// Source of topocentric sun positions.
///
/// Implementations must not mask failures: an out-of-domain query or an
/// invalid result is reported as an error, never as a default position.
pub trait SolarPositionOracle: Send {
    /// Sun position at `time` as seen from the given coordinates.
    fn solar_position(
        &self,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        elevation_m: f64,
    ) -> Result<SolarPosition, SolarError>;
}

/// Production oracle backed by the SPA algorithm with standard atmospheric
/// refraction and an estimated delta-T.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaOracle;

impl SolarPositionOracle for SpaOracle {
    fn solar_position(
        &self,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        elevation_m: f64,
    ) -> Result<SolarPosition, SolarError> {
        let delta_t = DeltaT::estimate_from_date(time.year(), time.month())
            .map_err(|e| SolarError::Computation(e.to_string()))?;
        let position = spa::solar_position(
            time,
            latitude,
            longitude,
            elevation_m,
            delta_t,
            Some(RefractionCorrection::standard()),
        )
        .map_err(|e| SolarError::Computation(e.to_string()))?;

        let result = SolarPosition {
            azimuth: position.azimuth(),
            altitude: position.elevation_angle(),
        };
        if !result.azimuth.is_finite() || !result.altitude.is_finite() {
            return Err(SolarError::NonFinite {
                azimuth: result.azimuth,
                altitude: result.altitude,
            });
        }
        Ok(result)
    }
}
