use crate::tap::SharedTap;
use std::sync::{Arc, Mutex, MutexGuard};

pub type SourceId = u64;

struct Voice {
    id: SourceId,
    samples: Vec<f32>,
    sample_rate: u32,
    start: f64,
}

impl Voice {
    fn end(&self) -> f64 {
        self.start + self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated sample at output time `t`, or `None` outside the voice.
    fn sample_at(&self, t: f64) -> Option<f32> {
        if t < self.start {
            return None;
        }
        let position = (t - self.start) * self.sample_rate as f64;
        let index = position.floor() as usize;
        let current = *self.samples.get(index)?;
        let next = self.samples.get(index + 1).copied().unwrap_or(0.0);
        let frac = (position - index as f64) as f32;
        Some(current + (next - current) * frac)
    }
}

/// Output-side mixer that plays buffers at absolute times on its own clock.
///
/// The clock is the number of frames rendered so far divided by the device
/// rate, so it only advances as the device pulls audio.
pub struct Mixer {
    output_rate: u32,
    frames_rendered: u64,
    voices: Vec<Voice>,
    tap: Option<SharedTap>,
}

impl Mixer {
    pub fn new(output_rate: u32) -> Self {
        Self {
            output_rate: output_rate.max(1),
            frames_rendered: 0,
            voices: Vec::new(),
            tap: None,
        }
    }

    pub fn with_tap(mut self, tap: SharedTap) -> Self {
        self.tap = Some(tap);
        self
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.output_rate as f64
    }

    pub fn active_sources(&self) -> usize {
        self.voices.len()
    }

    /// Schedules `samples` (mono, at `sample_rate`) to begin at output time `at`.
    pub fn start(&mut self, id: SourceId, samples: Vec<f32>, sample_rate: u32, at: f64) {
        if samples.is_empty() || sample_rate == 0 {
            tracing::warn!("Ignoring empty source {}", id);
            return;
        }
        self.voices.push(Voice {
            id,
            samples,
            sample_rate,
            start: at,
        });
    }

    /// Stops a source whether or not it has started. Returns false if it was unknown.
    pub fn stop(&mut self, id: SourceId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|voice| voice.id != id);
        before != self.voices.len()
    }

    /// Fills `out` with interleaved frames and returns the ids of sources that
    /// finished during this call.
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> Vec<SourceId> {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        let mut mono = Vec::with_capacity(frames);

        for (i, frame) in out.chunks_mut(channels).enumerate() {
            let t = (self.frames_rendered + i as u64) as f64 / self.output_rate as f64;
            let value: f32 = self
                .voices
                .iter()
                .filter_map(|voice| voice.sample_at(t))
                .sum::<f32>()
                .clamp(-1.0, 1.0);
            frame.fill(value);
            mono.push(value);
        }
        self.frames_rendered += frames as u64;

        if let Some(tap) = self.tap.as_ref() {
            tap.push(&mono);
        }

        let now = self.current_time();
        let mut ended = Vec::new();
        self.voices.retain(|voice| {
            if voice.end() <= now {
                ended.push(voice.id);
                false
            } else {
                true
            }
        });
        ended
    }
}

/// The mixer as shared between the controller and the audio callback.
#[derive(Clone)]
pub struct SharedMixer(Arc<Mutex<Mixer>>);

impl SharedMixer {
    pub fn new(mixer: Mixer) -> Self {
        Self(Arc::new(Mutex::new(mixer)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tap::AudioTap;

    #[test]
    fn test_silence_before_start() {
        let mut mixer = Mixer::new(100);
        mixer.start(1, vec![0.5; 10], 100, 0.5);
        let mut out = vec![1.0; 20];
        let ended = mixer.render(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(ended.is_empty());
        assert!((mixer.current_time() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_back_to_back_sources_are_gapless() {
        let mut mixer = Mixer::new(100);
        mixer.start(1, vec![0.25; 10], 100, 0.0);
        mixer.start(2, vec![0.5; 10], 100, 0.1);
        let mut out = vec![0.0; 20];
        let ended = mixer.render(&mut out, 1);
        assert_eq!(&out[..9], &[0.25; 9]);
        assert_eq!(&out[10..19], &[0.5; 9]);
        assert_eq!(ended, vec![1, 2]);
        assert_eq!(mixer.active_sources(), 0);
    }

    #[test]
    fn test_resamples_to_output_rate() {
        let mut mixer = Mixer::new(200);
        mixer.start(7, vec![0.0, 1.0, 0.0, 1.0], 100, 0.0);
        let mut out = vec![0.0; 8];
        let ended = mixer.render(&mut out, 1);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 1.0).abs() < 1e-6);
        assert_eq!(ended, vec![7]);
    }

    #[test]
    fn test_stop_and_stereo_output() {
        let tap = SharedTap::new(AudioTap::new(4));
        let mut mixer = Mixer::new(100).with_tap(tap.clone());
        mixer.start(1, vec![0.5; 100], 100, 0.0);
        mixer.start(2, vec![0.5; 100], 100, 5.0);
        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 2);
        assert_eq!(out, vec![0.5; 8]);
        assert_eq!(tap.time_domain_data(), vec![192; 4]);

        assert!(mixer.stop(2));
        assert!(!mixer.stop(2));
        assert!(mixer.stop(1));
        mixer.render(&mut out, 2);
        assert_eq!(out, vec![0.0; 8]);
    }
}
