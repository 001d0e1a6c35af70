//! Guidance harness for testing and demonstration
//!
//! This module provides scripted input sources, a simulated motion sensor
//! device and terminal rendering for driving the guidance engine without
//! real hardware. It bridges the guidance crate and the demo binary for
//! testing and demonstration purposes.

pub mod device;
pub mod display;
pub mod location;

pub use device::{DevicePose, SimulatedDevice, SimulatedSensorSource};
pub use location::{ScriptedFix, ScriptedLocationSource};
