use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const DEFAULT_FFT_SIZE: usize = 32;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Analyser over the most recent samples of one audio direction.
///
/// Mirrors the Web Audio `AnalyserNode` byte outputs: a Blackman-windowed FFT
/// whose magnitudes are smoothed over successive reads and mapped from
/// `[MIN_DECIBELS, MAX_DECIBELS]` onto `0..=255`, and a time-domain view where
/// silence reads as 128.
pub struct AudioTap {
    fft_size: usize,
    smoothing: f32,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
}

impl AudioTap {
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            fft_size,
            smoothing: DEFAULT_SMOOTHING,
            fft,
            window,
            samples: std::iter::repeat(0.0).take(fft_size).collect(),
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn push(&mut self, samples: &[f32]) {
        for &sample in samples {
            if self.samples.len() == self.fft_size {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Recomputes the spectrum; every call advances the smoothing.
    pub fn frequency_data(&mut self) -> Vec<u8> {
        let mut buffer: Vec<Complex<f32>> = self
            .samples
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let n = self.fft_size as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        self.smoothed
            .iter_mut()
            .zip(buffer.iter())
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() / n;
                *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
                let db = 20.0 * smoothed.log10();
                if !db.is_finite() {
                    return 0;
                }
                (255.0 * (db - MIN_DECIBELS) / range).clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    pub fn time_domain_data(&self) -> Vec<u8> {
        self.samples
            .iter()
            .map(|&s| (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8)
            .collect()
    }
}

impl Default for AudioTap {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

/// Thread-safe handle to an [`AudioTap`], shared between the audio path that
/// feeds it and whoever renders it.
#[derive(Clone, Default)]
pub struct SharedTap(Arc<Mutex<AudioTap>>);

impl SharedTap {
    pub fn new(tap: AudioTap) -> Self {
        Self(Arc::new(Mutex::new(tap)))
    }

    fn with<R>(&self, f: impl FnOnce(&mut AudioTap) -> R) -> R {
        let mut tap = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut tap)
    }

    pub fn push(&self, samples: &[f32]) {
        self.with(|tap| tap.push(samples))
    }

    pub fn frequency_data(&self) -> Vec<u8> {
        self.with(|tap| tap.frequency_data())
    }

    pub fn time_domain_data(&self) -> Vec<u8> {
        self.with(|tap| tap.time_domain_data())
    }
}
