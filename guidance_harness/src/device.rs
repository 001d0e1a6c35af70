//! Simulated motion sensors for a handheld device.
//!
//! Generates the accelerometer and magnetometer samples a real device would
//! produce at a given pose, with optional Gaussian noise, and feeds them to
//! the guidance engine from a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use guidance::angles::{normalize_bearing, signed_delta};
use guidance::{GuidanceEvent, UpdateSource};
use log::debug;
use nalgebra::{Matrix3, Rotation3, Vector3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const GRAVITY_M_S2: f64 = 9.81;

// Geomagnetic field in the world frame (east, north, up), microtesla.
// Typical northern mid-latitude values with the field dipping downward.
const FIELD_NORTH_UT: f64 = 22.0;
const FIELD_DOWN_UT: f64 = 43.0;

/// Device orientation in degrees: compass azimuth, pitch and roll.
///
/// Pitch is negative when the top edge of the device is raised, matching
/// the convention of the attitude output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePose {
    pub azimuth: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl DevicePose {
    pub fn new(azimuth: f64, pitch: f64, roll: f64) -> Self {
        Self {
            azimuth,
            pitch,
            roll,
        }
    }

    /// Move each angle toward `goal` by at most `max_step` degrees, taking
    /// the short way around the compass for azimuth.
    pub fn step_toward(&self, goal: &DevicePose, max_step: f64) -> DevicePose {
        let azimuth_step = signed_delta(self.azimuth, goal.azimuth).clamp(-max_step, max_step);
        DevicePose {
            azimuth: normalize_bearing(self.azimuth + azimuth_step),
            pitch: self.pitch + (goal.pitch - self.pitch).clamp(-max_step, max_step),
            roll: self.roll + (goal.roll - self.roll).clamp(-max_step, max_step),
        }
    }
}

/// Synthesizes raw sensor samples for a device held at a pose.
///
/// The world-frame gravity and geomagnetic field vectors are rotated into
/// device coordinates and perturbed with seeded Gaussian noise, so runs are
/// reproducible per seed.
pub struct SimulatedDevice {
    pose: DevicePose,
    accel_noise: Normal<f64>,
    mag_noise: Normal<f64>,
    rng: ChaCha8Rng,
}

impl SimulatedDevice {
    /// A device with mild sensor noise, flat and facing north.
    pub fn new(seed: u64) -> Self {
        Self::with_noise(seed, 0.05, 0.3)
    }

    /// A device with explicit noise levels (standard deviation per axis, in
    /// m/s^2 for the accelerometer and microtesla for the magnetometer).
    pub fn with_noise(seed: u64, accel_sigma: f64, mag_sigma: f64) -> Self {
        Self {
            pose: DevicePose::new(0.0, 0.0, 0.0),
            accel_noise: Normal::new(0.0, accel_sigma.max(0.0)).unwrap(),
            mag_noise: Normal::new(0.0, mag_sigma.max(0.0)).unwrap(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn pose(&self) -> DevicePose {
        self.pose
    }

    pub fn set_pose(&mut self, pose: DevicePose) {
        self.pose = pose;
    }

    /// Accelerometer reading in device coordinates, m/s^2.
    pub fn accelerometer_sample(&mut self) -> Vector3<f64> {
        let gravity = self.world_to_device() * Vector3::new(0.0, 0.0, GRAVITY_M_S2);
        let noise = self.noise_vector(self.accel_noise);
        gravity + noise
    }

    /// Magnetometer reading in device coordinates, microtesla.
    pub fn magnetometer_sample(&mut self) -> Vector3<f64> {
        let field =
            self.world_to_device() * Vector3::new(0.0, FIELD_NORTH_UT, -FIELD_DOWN_UT);
        let noise = self.noise_vector(self.mag_noise);
        field + noise
    }

    fn world_to_device(&self) -> Matrix3<f64> {
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), -self.pose.azimuth.to_radians());
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), -self.pose.pitch.to_radians());
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.pose.roll.to_radians());
        (rz * rx * ry).into_inner().transpose()
    }

    fn noise_vector(&mut self, dist: Normal<f64>) -> Vector3<f64> {
        Vector3::new(
            dist.sample(&mut self.rng),
            dist.sample(&mut self.rng),
            dist.sample(&mut self.rng),
        )
    }
}

/// Feeds simulated sensor samples into the guidance engine at a fixed rate.
///
/// The device sits behind a mutex so tests and demos can change its pose
/// while the sampling thread runs.
pub struct SimulatedSensorSource {
    events: Sender<GuidanceEvent>,
    device: Arc<Mutex<SimulatedDevice>>,
    interval: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedSensorSource {
    pub fn new(events: Sender<GuidanceEvent>, device: SimulatedDevice, interval: Duration) -> Self {
        Self {
            events,
            device: Arc::new(Mutex::new(device)),
            interval,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Handle to the device for steering its pose while sampling runs.
    pub fn device(&self) -> Arc<Mutex<SimulatedDevice>> {
        self.device.clone()
    }
}

impl UpdateSource for SimulatedSensorSource {
    fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let events = self.events.clone();
        let device = self.device.clone();
        let running = self.running.clone();
        let interval = self.interval;
        self.handle = Some(thread::spawn(move || {
            debug!("simulated sensor source started");
            while running.load(Ordering::Relaxed) {
                let (accel, mag) = {
                    let mut device = device.lock().unwrap();
                    (device.accelerometer_sample(), device.magnetometer_sample())
                };
                if events.send(GuidanceEvent::AccelerometerSample(accel)).is_err()
                    || events.send(GuidanceEvent::MagnetometerSample(mag)).is_err()
                {
                    break;
                }
                thread::sleep(interval);
            }
            debug!("simulated sensor source stopped");
        }));
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
