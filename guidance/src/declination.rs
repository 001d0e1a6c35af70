//! Magnetic declination lookup.

use chrono::{DateTime, Utc};

use crate::types::GeoLocation;

/// Source of magnetic declination values.
///
/// Declination is the angle from true north to magnetic north in degrees,
/// east positive. Implementations typically wrap a geomagnetic field model;
/// `None` means no value is available for that place and time, in which
/// case guidance falls back to true bearings.
pub trait DeclinationModel: Send {
    fn declination(&self, location: &GeoLocation, time: DateTime<Utc>) -> Option<f64>;
}

/// Reports the same declination everywhere.
pub struct FixedDeclination(pub f64);

impl DeclinationModel for FixedDeclination {
    fn declination(&self, _location: &GeoLocation, _time: DateTime<Utc>) -> Option<f64> {
        Some(self.0)
    }
}

/// Reports no declination.
pub struct NoDeclination;

impl DeclinationModel for NoDeclination {
    fn declination(&self, _location: &GeoLocation, _time: DateTime<Utc>) -> Option<f64> {
        None
    }
}
