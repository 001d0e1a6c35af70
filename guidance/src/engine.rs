//! Event-driven guidance engine.
//!
//! The engine is the single consumer of every update stream: location
//! fixes, tilt mode selections, raw sensor samples and control toggles
//! arrive as `GuidanceEvent` messages on one channel and are folded into a
//! `GuidanceSnapshot`. Producers push at their own cadence and never touch
//! derived state; readers poll the latest snapshot or subscribe to a
//! snapshot channel.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::alignment::{evaluate, AlignmentTolerances, AlignmentVerdict};
use crate::declination::DeclinationModel;
use crate::orientation::AttitudeFilter;
use crate::solar::SolarPositionOracle;
use crate::target::{compute_target_parameters, TargetParameters};
use crate::types::{Attitude, GeoLocation, SensorAccuracy, TiltMode};

/// Window over which rapid location updates are coalesced before being
/// applied. A lone fix is applied once the window elapses; a burst applies
/// only its newest fix.
pub const LOCATION_DEBOUNCE: Duration = Duration::from_millis(300);

/// Input messages accepted by the guidance engine.
#[derive(Debug, Clone)]
pub enum GuidanceEvent {
    /// New location fix, or `None` when the fix is lost or denied.
    LocationChanged(Option<GeoLocation>),
    /// User switched the tilt strategy.
    ModeSelected(TiltMode),
    /// Raw accelerometer sample in device coordinates, m/s^2.
    AccelerometerSample(Vector3<f64>),
    /// Raw magnetometer sample in device coordinates, microtesla.
    MagnetometerSample(Vector3<f64>),
    /// Compass accuracy report from the sensor stack.
    AccuracyChanged(SensorAccuracy),
    /// The device has no usable motion sensors.
    SensorsUnavailable,
    /// Toggle simulated alignment for demos and tests.
    SimulateAlignment(bool),
    /// Stop processing; the engine thread exits.
    Shutdown,
}

/// Latest derived state of the guidance pipeline.
///
/// Every field that depends on an input that has not arrived yet is `None`;
/// nothing ever blocks waiting for another stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuidanceSnapshot {
    pub location: Option<GeoLocation>,
    pub declination: Option<f64>,
    pub mode: TiltMode,
    pub target: Option<TargetParameters>,
    pub attitude: Attitude,
    pub verdict: Option<AlignmentVerdict>,
    pub simulate_aligned: bool,
}

/// Synchronous core of the engine: owns every input slot and recomputes
/// derived state per event.
///
/// `GuidanceEngine` runs one of these on a background thread; tests and
/// single-threaded callers can drive it directly with `apply_at`.
pub struct GuidanceController {
    oracle: Box<dyn SolarPositionOracle>,
    declination_model: Box<dyn DeclinationModel>,
    tolerances: AlignmentTolerances,
    filter: AttitudeFilter,
    snapshot: GuidanceSnapshot,
}

impl GuidanceController {
    pub fn new(
        oracle: Box<dyn SolarPositionOracle>,
        declination_model: Box<dyn DeclinationModel>,
        tolerances: AlignmentTolerances,
    ) -> Self {
        Self {
            oracle,
            declination_model,
            tolerances,
            filter: AttitudeFilter::new(),
            snapshot: GuidanceSnapshot::default(),
        }
    }

    /// The current derived state.
    pub fn snapshot(&self) -> &GuidanceSnapshot {
        &self.snapshot
    }

    /// Apply one event at the current wall clock time.
    pub fn apply(&mut self, event: GuidanceEvent) -> &GuidanceSnapshot {
        self.apply_at(event, Utc::now())
    }

    /// Apply one event at an explicit time.
    ///
    /// The time is used for solar and declination queries, which makes the
    /// whole pipeline reproducible in tests.
    pub fn apply_at(&mut self, event: GuidanceEvent, now: DateTime<Utc>) -> &GuidanceSnapshot {
        match event {
            GuidanceEvent::LocationChanged(location) => {
                self.snapshot.location = location;
                self.snapshot.declination = location
                    .and_then(|loc| self.declination_model.declination(&loc, now));
                self.recompute_target(now);
            }
            GuidanceEvent::ModeSelected(mode) => {
                if self.snapshot.mode != mode {
                    self.snapshot.mode = mode;
                    self.recompute_target(now);
                }
            }
            GuidanceEvent::AccelerometerSample(sample) => {
                self.snapshot.attitude = self.filter.ingest_accelerometer(sample);
            }
            GuidanceEvent::MagnetometerSample(sample) => {
                self.snapshot.attitude = self.filter.ingest_magnetometer(sample);
            }
            GuidanceEvent::AccuracyChanged(accuracy) => {
                self.filter.update_accuracy(accuracy);
                self.snapshot.attitude = self.filter.attitude();
            }
            GuidanceEvent::SensorsUnavailable => {
                self.filter.mark_sensors_missing();
                self.snapshot.attitude = self.filter.attitude();
            }
            GuidanceEvent::SimulateAlignment(on) => {
                self.snapshot.simulate_aligned = on;
            }
            // Handled by the engine loop; inert when applied directly.
            GuidanceEvent::Shutdown => {}
        }
        self.refresh_verdict();
        &self.snapshot
    }

    fn recompute_target(&mut self, now: DateTime<Utc>) {
        match compute_target_parameters(
            self.oracle.as_ref(),
            self.snapshot.location.as_ref(),
            self.snapshot.declination,
            self.snapshot.mode,
            now,
        ) {
            Ok(target) => self.snapshot.target = target,
            // Keep guiding against the previous target rather than
            // dropping to none mid-session.
            Err(e) => warn!("solar oracle failed, keeping previous target: {e}"),
        }
    }

    fn refresh_verdict(&mut self) {
        self.snapshot.verdict = self.snapshot.target.as_ref().map(|target| {
            evaluate(
                &self.snapshot.attitude,
                target,
                &self.tolerances,
                self.snapshot.simulate_aligned,
            )
        });
    }
}

/// Background-thread wrapper around a `GuidanceController`.
///
/// Events are fed through a channel sender that producers clone freely.
/// The latest snapshot sits behind a mutex only the engine thread writes.
pub struct GuidanceEngine {
    sender: Sender<GuidanceEvent>,
    shared: Arc<Mutex<GuidanceSnapshot>>,
    handle: Option<JoinHandle<()>>,
}

impl GuidanceEngine {
    /// Spawn the engine thread around a controller.
    pub fn spawn(controller: GuidanceController) -> Self {
        Self::spawn_with_subscriber(controller, None)
    }

    /// Spawn with an optional subscriber that receives every published
    /// snapshot. A disconnected subscriber is dropped silently.
    pub fn spawn_with_subscriber(
        controller: GuidanceController,
        subscriber: Option<Sender<GuidanceSnapshot>>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(Mutex::new(controller.snapshot().clone()));
        let shared_clone = shared.clone();
        let handle = thread::spawn(move || {
            run_event_loop(controller, receiver, shared_clone, subscriber);
        });
        Self {
            sender,
            shared,
            handle: Some(handle),
        }
    }

    /// A sender for feeding events; clone one per producer.
    pub fn sender(&self) -> Sender<GuidanceEvent> {
        self.sender.clone()
    }

    /// Feed a single event. Returns false once the engine has stopped.
    pub fn send(&self, event: GuidanceEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> GuidanceSnapshot {
        self.shared.lock().unwrap().clone()
    }

    /// Stop the engine and join its thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(GuidanceEvent::Shutdown);
            if handle.join().is_err() {
                warn!("guidance engine thread panicked");
            }
        }
    }
}

impl Drop for GuidanceEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_event_loop(
    mut controller: GuidanceController,
    receiver: Receiver<GuidanceEvent>,
    shared: Arc<Mutex<GuidanceSnapshot>>,
    mut subscriber: Option<Sender<GuidanceSnapshot>>,
) {
    info!("guidance engine started");

    // Latest unapplied location fix and the debounce deadline that resets
    // with every newer fix.
    let mut deferred_location: Option<Option<GeoLocation>> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let event = match deadline {
            Some(at) => match receiver.recv_deadline(at) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match receiver.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            None => {
                // Debounce window elapsed without a newer fix.
                deadline = None;
                if let Some(location) = deferred_location.take() {
                    publish(
                        &mut controller,
                        GuidanceEvent::LocationChanged(location),
                        &shared,
                        &mut subscriber,
                    );
                }
            }
            Some(GuidanceEvent::LocationChanged(location)) => {
                if deferred_location.is_some() {
                    debug!("coalescing location update burst");
                }
                deferred_location = Some(location);
                deadline = Some(Instant::now() + LOCATION_DEBOUNCE);
            }
            Some(GuidanceEvent::Shutdown) => break,
            Some(event) => publish(&mut controller, event, &shared, &mut subscriber),
        }
    }

    info!("guidance engine stopped");
}

fn publish(
    controller: &mut GuidanceController,
    event: GuidanceEvent,
    shared: &Arc<Mutex<GuidanceSnapshot>>,
    subscriber: &mut Option<Sender<GuidanceSnapshot>>,
) {
    let snapshot = controller.apply(event).clone();
    *shared.lock().unwrap() = snapshot.clone();
    if let Some(tx) = subscriber {
        if tx.send(snapshot).is_err() {
            debug!("snapshot subscriber disconnected");
            *subscriber = None;
        }
    }
}
