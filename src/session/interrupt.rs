use crate::session::playback::{OutputDevice, PlaybackScheduler, SourceRegistry};

/// Barge-in handling: when the user talks over the model, everything queued
/// for playback is dropped at once.
#[derive(Debug, Default)]
pub struct InterruptionHandler {
    interruptions: u64,
}

impl InterruptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interruptions(&self) -> u64 {
        self.interruptions
    }

    /// Stops every live source, including ones scheduled for the future, and
    /// rewinds the cursor to zero. Returns how many sources were stopped.
    pub fn on_interrupt(
        &mut self,
        device: &mut dyn OutputDevice,
        registry: &mut SourceRegistry,
        scheduler: &mut PlaybackScheduler,
    ) -> usize {
        self.interruptions += 1;
        let stopped = registry.stop_all(device);
        scheduler.reset();
        tracing::info!("interrupted: stopped {} sources", stopped);
        stopped
    }
}
