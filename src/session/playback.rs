use crate::types::audio::PLAYBACK_SAMPLE_RATE;
use crate::types::Blob;
use crate::utils::audio::{decode_buffer, AudioBuffer, DecodeError};
use crate::utils::mixer::{SharedMixer, SourceId};

/// The output clock and the sources playing on it.
pub trait OutputDevice: Send {
    /// Seconds on the output clock.
    fn current_time(&self) -> f64;

    /// Starts `buffer` at output time `at`; `at` may be in the future.
    fn start(&mut self, id: SourceId, buffer: AudioBuffer, at: f64);

    /// Stops a source whether or not it has begun playing.
    fn stop(&mut self, id: SourceId);
}

impl OutputDevice for SharedMixer {
    fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    fn start(&mut self, id: SourceId, buffer: AudioBuffer, at: f64) {
        let rate = buffer.sample_rate();
        self.lock().start(id, buffer.into_samples(), rate, at);
    }

    fn stop(&mut self, id: SourceId) {
        self.lock().stop(id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSource {
    id: SourceId,
    start: f64,
    duration: f64,
}

impl ScheduledSource {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Sources that are scheduled or playing.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    next_id: SourceId,
    sources: Vec<ScheduledSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&mut self) -> SourceId {
        self.next_id += 1;
        self.next_id
    }

    pub fn add(&mut self, source: ScheduledSource) {
        self.sources.push(source);
    }

    /// Removes a source that ended on its own. Unknown ids, e.g. sources
    /// already cleared by an interruption, are ignored.
    pub fn remove_if_present(&mut self, id: SourceId) -> Option<ScheduledSource> {
        let index = self.sources.iter().position(|source| source.id == id)?;
        Some(self.sources.remove(index))
    }

    /// Drops sources that finished by `now` without reporting it.
    pub fn remove_ended(&mut self, now: f64) -> usize {
        let before = self.sources.len();
        self.sources.retain(|source| source.end() > now);
        before - self.sources.len()
    }

    /// Stops every registered source on `device` and empties the registry.
    pub fn stop_all(&mut self, device: &mut dyn OutputDevice) -> usize {
        let stopped = self.sources.len();
        for source in self.sources.drain(..) {
            device.stop(source.id);
        }
        stopped
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledSource> {
        self.sources.iter()
    }
}

/// Queues model speech back to back on the output clock.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    cursor: f64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time at which the next buffer will start, unless the clock has passed it.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn init(&mut self, now: f64) {
        self.cursor = now;
    }

    pub fn reset(&mut self) {
        self.cursor = 0.0;
    }

    pub fn schedule(
        &mut self,
        buffer: AudioBuffer,
        device: &mut dyn OutputDevice,
        registry: &mut SourceRegistry,
    ) -> ScheduledSource {
        let now = device.current_time();
        let expired = registry.remove_ended(now);
        if expired > 0 {
            tracing::debug!("pruned {} finished sources", expired);
        }
        self.cursor = self.cursor.max(now);
        let source = ScheduledSource {
            id: registry.allocate(),
            start: self.cursor,
            duration: buffer.duration(),
        };
        device.start(source.id, buffer, source.start);
        self.cursor += source.duration;
        registry.add(source);
        source
    }

    /// Decodes a PCM16 chunk at its declared rate and schedules it. Chunks
    /// that fail to decode are not registered.
    pub fn schedule_chunk(
        &mut self,
        blob: &Blob,
        device: &mut dyn OutputDevice,
        registry: &mut SourceRegistry,
    ) -> Result<ScheduledSource, DecodeError> {
        let rate = match blob.rate_param() {
            None => PLAYBACK_SAMPLE_RATE,
            Some(raw) => raw.parse().map_err(|_| DecodeError::InvalidRate(raw.to_string()))?,
        };
        let buffer = decode_buffer(blob.data(), rate)?;
        Ok(self.schedule(buffer, device, registry))
    }
}
