//! Target parameter calculation.
//!
//! Turns a location, tilt strategy and optional magnetic declination into
//! the bearing and tilt the panel should be set to.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::angles::normalize_bearing;
use crate::solar::{SolarError, SolarPositionOracle};
use crate::types::{GeoLocation, TiltMode};

/// Obliquity of the ecliptic in degrees. Seasonal strategies offset the
/// latitude-based tilt by this amount.
pub const EARTH_AXIAL_TILT_DEG: f64 = 23.5;

/// Optimal panel orientation for a location and tilt strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetParameters {
    /// Bearing the panel should face, degrees clockwise from true north.
    pub target_true_azimuth: f64,
    /// The same bearing as a compass reading, present when a declination
    /// is known.
    pub target_magnetic_azimuth: Option<f64>,
    /// Panel tilt up from horizontal, degrees in [0, 90].
    pub target_tilt: f64,
    /// Strategy that produced these parameters.
    pub mode: TiltMode,
    /// Declination applied to the magnetic bearing, degrees east positive.
    pub magnetic_declination: Option<f64>,
}

impl TargetParameters {
    /// Bearing the panel is steered against: magnetic when available,
    /// true north otherwise.
    pub fn panel_azimuth(&self) -> f64 {
        self.target_magnetic_azimuth
            .unwrap_or(self.target_true_azimuth)
    }
}

/// Compute target parameters for the given inputs.
///
/// Returns `Ok(None)` while no location is available. Fixed strategies are
/// pure latitude arithmetic; `Realtime` queries the solar oracle, and an
/// oracle failure propagates to the caller rather than producing a default.
pub fn compute_target_parameters(
    oracle: &dyn SolarPositionOracle,
    location: Option<&GeoLocation>,
    declination: Option<f64>,
    mode: TiltMode,
    time: DateTime<Utc>,
) -> Result<Option<TargetParameters>, SolarError> {
    let Some(location) = location else {
        return Ok(None);
    };

    let latitude = location.latitude;
    let (true_azimuth, tilt) = match mode {
        TiltMode::Realtime => {
            let sun = oracle.solar_position(
                time,
                latitude,
                location.longitude,
                location.altitude_m.unwrap_or(0.0),
            )?;
            (sun.azimuth, sun.altitude.clamp(0.0, 90.0))
        }
        fixed => {
            // Fixed strategies face the equator and tilt by latitude,
            // shifted toward the low or high sun for the seasonal modes.
            let azimuth = if latitude > 0.0 { 180.0 } else { 0.0 };
            let base = latitude.abs();
            let tilt = match fixed {
                TiltMode::Winter => base + EARTH_AXIAL_TILT_DEG,
                TiltMode::Summer => base - EARTH_AXIAL_TILT_DEG,
                _ => base,
            };
            (azimuth, tilt.clamp(0.0, 90.0))
        }
    };

    let target_magnetic_azimuth = declination.map(|d| normalize_bearing(true_azimuth - d));
    debug!(
        "target parameters: mode {:?}, true azimuth {:.2}, tilt {:.2}",
        mode, true_azimuth, tilt
    );

    Ok(Some(TargetParameters {
        target_true_azimuth: true_azimuth,
        target_magnetic_azimuth,
        target_tilt: tilt,
        mode,
        magnetic_declination: declination,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SolarPosition;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Oracle returning a canned position, recording the query it saw.
    struct CannedOracle {
        position: SolarPosition,
        queries: Mutex<Vec<(f64, f64, f64)>>,
    }

    impl CannedOracle {
        fn new(azimuth: f64, altitude: f64) -> Self {
            Self {
                position: SolarPosition { azimuth, altitude },
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl SolarPositionOracle for CannedOracle {
        fn solar_position(
            &self,
            _time: DateTime<Utc>,
            latitude: f64,
            longitude: f64,
            elevation_m: f64,
        ) -> Result<SolarPosition, SolarError> {
            self.queries
                .lock()
                .unwrap()
                .push((latitude, longitude, elevation_m));
            Ok(self.position)
        }
    }

    struct FailingOracle;

    impl SolarPositionOracle for FailingOracle {
        fn solar_position(
            &self,
            _time: DateTime<Utc>,
            _latitude: f64,
            _longitude: f64,
            _elevation_m: f64,
        ) -> Result<SolarPosition, SolarError> {
            Err(SolarError::Computation("injected failure".to_string()))
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()
    }

    fn compute(
        latitude: f64,
        declination: Option<f64>,
        mode: TiltMode,
    ) -> Option<TargetParameters> {
        let oracle = CannedOracle::new(0.0, 0.0);
        compute_target_parameters(
            &oracle,
            Some(&GeoLocation::new(latitude, 0.0)),
            declination,
            mode,
            noon(),
        )
        .unwrap()
    }

    #[test]
    fn no_location_means_no_target() {
        let oracle = CannedOracle::new(0.0, 0.0);
        let result =
            compute_target_parameters(&oracle, None, Some(3.0), TiltMode::Winter, noon()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn northern_winter_tilt_adds_axial_tilt() {
        let target = compute(40.0, None, TiltMode::Winter).unwrap();
        assert_relative_eq!(target.target_true_azimuth, 180.0);
        assert_relative_eq!(target.target_tilt, 63.5);
        assert_eq!(target.target_magnetic_azimuth, None);
        assert_eq!(target.magnetic_declination, None);
    }

    #[test]
    fn southern_summer_tilt_subtracts_axial_tilt() {
        let target = compute(-33.0, None, TiltMode::Summer).unwrap();
        assert_relative_eq!(target.target_true_azimuth, 0.0);
        assert_relative_eq!(target.target_tilt, 9.5);
    }

    #[test]
    fn year_round_and_spring_autumn_use_plain_latitude() {
        let year = compute(40.0, None, TiltMode::YearRound).unwrap();
        let transitional = compute(40.0, None, TiltMode::SpringAutumn).unwrap();
        assert_relative_eq!(year.target_tilt, 40.0);
        assert_relative_eq!(transitional.target_tilt, 40.0);
    }

    #[test]
    fn equator_faces_north() {
        let target = compute(0.0, None, TiltMode::YearRound).unwrap();
        assert_relative_eq!(target.target_true_azimuth, 0.0);
        assert_relative_eq!(target.target_tilt, 0.0);
    }

    #[test]
    fn tilt_is_clamped_to_quarter_turn() {
        let high = compute(70.0, None, TiltMode::Winter).unwrap();
        assert_relative_eq!(high.target_tilt, 90.0);
        let low = compute(10.0, None, TiltMode::Summer).unwrap();
        assert_relative_eq!(low.target_tilt, 0.0);
    }

    #[test]
    fn fixed_mode_tilt_stays_in_range_at_every_latitude() {
        for &latitude in &[-90.0, -66.5, -23.5, -5.0, 0.0, 23.5, 40.0, 66.5, 90.0] {
            for mode in [
                TiltMode::YearRound,
                TiltMode::Summer,
                TiltMode::Winter,
                TiltMode::SpringAutumn,
            ] {
                let target = compute(latitude, None, mode).unwrap();
                assert!(
                    (0.0..=90.0).contains(&target.target_tilt),
                    "tilt {} out of range for {:?} at latitude {}",
                    target.target_tilt,
                    mode,
                    latitude
                );
            }
        }
    }

    #[test]
    fn seasonal_tilts_order_monotonically() {
        // Not strictly: clamping can make neighbors equal near the
        // extremes, so the ordering is non-strict by construction.
        for &latitude in &[5.0, 25.0, 40.0, 70.0, -33.0] {
            let winter = compute(latitude, None, TiltMode::Winter).unwrap();
            let year = compute(latitude, None, TiltMode::YearRound).unwrap();
            let summer = compute(latitude, None, TiltMode::Summer).unwrap();
            assert!(winter.target_tilt >= year.target_tilt);
            assert!(year.target_tilt >= summer.target_tilt);
        }
    }

    #[test]
    fn declination_produces_magnetic_bearing() {
        let target = compute(40.0, Some(-2.0), TiltMode::Winter).unwrap();
        assert_relative_eq!(target.target_true_azimuth, 180.0);
        assert_relative_eq!(target.target_magnetic_azimuth.unwrap(), 182.0);
        assert_relative_eq!(target.magnetic_declination.unwrap(), -2.0);
        assert_relative_eq!(target.panel_azimuth(), 182.0);
    }

    #[test]
    fn magnetic_bearing_wraps_into_range() {
        let target = compute(-33.0, Some(5.0), TiltMode::YearRound).unwrap();
        // 0 - 5 wraps to 355
        assert_relative_eq!(target.target_magnetic_azimuth.unwrap(), 355.0);
    }

    #[test]
    fn panel_azimuth_falls_back_to_true_bearing() {
        let target = compute(40.0, None, TiltMode::Winter).unwrap();
        assert_relative_eq!(target.panel_azimuth(), 180.0);
    }

    #[test]
    fn realtime_follows_the_sun() {
        let oracle = CannedOracle::new(123.4, 45.6);
        let location = GeoLocation::new(40.0, -3.7);
        let target = compute_target_parameters(
            &oracle,
            Some(&location),
            Some(1.5),
            TiltMode::Realtime,
            noon(),
        )
        .unwrap()
        .unwrap();
        assert_relative_eq!(target.target_true_azimuth, 123.4);
        assert_relative_eq!(target.target_tilt, 45.6);
        assert_relative_eq!(target.target_magnetic_azimuth.unwrap(), 121.9);
        assert_eq!(target.mode, TiltMode::Realtime);
    }

    #[test]
    fn realtime_tilt_clamps_sun_below_horizon_to_flat() {
        let oracle = CannedOracle::new(80.0, -5.0);
        let target = compute_target_parameters(
            &oracle,
            Some(&GeoLocation::new(40.0, 0.0)),
            None,
            TiltMode::Realtime,
            noon(),
        )
        .unwrap()
        .unwrap();
        assert_relative_eq!(target.target_tilt, 0.0);
    }

    #[test]
    fn realtime_elevation_defaults_to_sea_level() {
        let oracle = CannedOracle::new(100.0, 30.0);
        let mut location = GeoLocation::new(40.0, 10.0);
        compute_target_parameters(&oracle, Some(&location), None, TiltMode::Realtime, noon())
            .unwrap();
        location.altitude_m = Some(250.0);
        compute_target_parameters(&oracle, Some(&location), None, TiltMode::Realtime, noon())
            .unwrap();

        let queries = oracle.queries.lock().unwrap();
        assert_relative_eq!(queries[0].2, 0.0);
        assert_relative_eq!(queries[1].2, 250.0);
    }

    #[test]
    fn realtime_oracle_failure_propagates() {
        let result = compute_target_parameters(
            &FailingOracle,
            Some(&GeoLocation::new(40.0, 0.0)),
            None,
            TiltMode::Realtime,
            noon(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn fixed_modes_never_touch_the_oracle() {
        let location = GeoLocation::new(40.0, 0.0);
        for mode in [
            TiltMode::YearRound,
            TiltMode::Summer,
            TiltMode::Winter,
            TiltMode::SpringAutumn,
        ] {
            let result =
                compute_target_parameters(&FailingOracle, Some(&location), None, mode, noon());
            assert!(result.unwrap().is_some());
        }
    }
}
