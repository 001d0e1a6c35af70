//! Update source lifecycle.

/// A producer of guidance events running on its own schedule.
///
/// Sources push events into the engine channel and are controlled only
/// through this interface. Both operations are idempotent: starting a
/// running source or stopping a stopped one has no effect.
pub trait UpdateSource {
    /// Begin producing events.
    fn start(&mut self);

    /// Stop producing events and release any worker resources.
    fn stop(&mut self);
}
