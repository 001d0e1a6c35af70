//! Solar panel alignment guidance.
//!
//! Computes the optimal orientation for a solar panel from a location and
//! tilt strategy, estimates the device attitude from motion sensors, and
//! evaluates how far the device is from the target. The event-driven
//! engine ties the pieces together behind a single input channel.

pub mod alignment;
pub mod angles;
pub mod declination;
pub mod engine;
pub mod orientation;
pub mod solar;
pub mod sources;
pub mod target;
pub mod types;

pub use alignment::{evaluate, AlignmentTolerances, AlignmentVerdict, AxisCheck};
pub use declination::{DeclinationModel, FixedDeclination, NoDeclination};
pub use engine::{
    GuidanceController, GuidanceEngine, GuidanceEvent, GuidanceSnapshot, LOCATION_DEBOUNCE,
};
pub use orientation::{AttitudeFilter, FILTER_ALPHA};
pub use solar::{SolarError, SolarPositionOracle, SpaOracle};
pub use sources::UpdateSource;
pub use target::{compute_target_parameters, TargetParameters, EARTH_AXIAL_TILT_DEG};
pub use types::{Attitude, GeoLocation, SensorAccuracy, SolarPosition, TiltMode};
