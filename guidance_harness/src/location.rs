//! Scripted location fixes played back on a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use guidance::{GeoLocation, GuidanceEvent, UpdateSource};
use log::debug;

/// One scripted fix, delivered once `at` has elapsed since `start`.
///
/// `None` plays back a lost or denied fix.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedFix {
    pub at: Duration,
    pub fix: Option<GeoLocation>,
}

/// Replays a fixed sequence of location updates into the guidance engine.
///
/// Stands in for a platform location listener: fixes arrive on their own
/// thread at scripted offsets, and stopping the source cuts the stream
/// without draining the remaining script.
pub struct ScriptedLocationSource {
    events: Sender<GuidanceEvent>,
    script: Vec<ScriptedFix>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedLocationSource {
    pub fn new(events: Sender<GuidanceEvent>, mut script: Vec<ScriptedFix>) -> Self {
        script.sort_by_key(|entry| entry.at);
        Self {
            events,
            script,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl UpdateSource for ScriptedLocationSource {
    fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let events = self.events.clone();
        let script = self.script.clone();
        let running = self.running.clone();
        self.handle = Some(thread::spawn(move || {
            let start = Instant::now();
            for entry in script {
                while start.elapsed() < entry.at {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                if !running.load(Ordering::Relaxed) {
                    return;
                }
                debug!("delivering scripted fix at offset {:?}", entry.at);
                if events
                    .send(GuidanceEvent::LocationChanged(entry.fix))
                    .is_err()
                {
                    return;
                }
            }
        }));
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn fixes_arrive_in_script_order() {
        let (tx, rx) = unbounded();
        let mut source = ScriptedLocationSource::new(
            tx,
            vec![
                ScriptedFix {
                    at: Duration::from_millis(60),
                    fix: None,
                },
                ScriptedFix {
                    at: Duration::ZERO,
                    fix: Some(GeoLocation::new(48.21, 16.37)),
                },
            ],
        );
        source.start();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        match first {
            GuidanceEvent::LocationChanged(Some(loc)) => {
                assert_eq!(loc.latitude, 48.21);
            }
            other => panic!("expected a location fix first, got {other:?}"),
        }
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(second, GuidanceEvent::LocationChanged(None)));
        source.stop();
    }

    #[test]
    fn stop_aborts_the_remaining_script_promptly() {
        let (tx, rx) = unbounded();
        let mut source = ScriptedLocationSource::new(
            tx,
            vec![ScriptedFix {
                at: Duration::from_secs(30),
                fix: Some(GeoLocation::new(0.0, 0.0)),
            }],
        );
        source.start();
        thread::sleep(Duration::from_millis(50));

        let begun = Instant::now();
        source.stop();
        assert!(
            begun.elapsed() < Duration::from_secs(1),
            "stop should not wait out the script"
        );
        assert!(rx.try_recv().is_err(), "no fix should have been delivered");
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (tx, _rx) = unbounded();
        let mut source = ScriptedLocationSource::new(tx, Vec::new());
        source.start();
        source.start();
        source.stop();
        source.stop();

        // A stopped source can be started again with the same script.
        source.start();
        source.stop();
    }
}
