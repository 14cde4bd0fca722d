use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Samples per capture tick at the 16 kHz capture rate.
pub const CAPTURE_FRAME_SIZE: usize = 256;

const RESAMPLER_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(String),
    #[error("PCM16 payload has odd length {0}")]
    OddLength(usize),
    #[error("empty audio payload")]
    Empty,
    #[error("invalid sample rate {0:?}")]
    InvalidRate(String),
}

/// Decoded mono audio at a known rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub fn sample_to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

pub fn pcm16_to_sample(value: i16) -> f32 {
    (value as f32 / i16::MAX as f32).clamp(-1.0, 1.0)
}

pub fn create_resampler(in_sampling_rate: f64, out_sampling_rate: f64, chunk_size: usize) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1
    )?;
    Ok(resampler)
}

/// Base64 of little-endian PCM16.
pub fn encode(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = pcm32.iter().flat_map(|&sample| sample_to_pcm16(sample).to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

pub fn decode(fragment: &str) -> Result<Vec<f32>, DecodeError> {
    let pcm16 = base64::engine::general_purpose::STANDARD
        .decode(fragment)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    if pcm16.is_empty() {
        return Err(DecodeError::Empty);
    }
    if pcm16.len() % 2 != 0 {
        return Err(DecodeError::OddLength(pcm16.len()));
    }
    Ok(pcm16
        .chunks_exact(2)
        .map(|chunk| pcm16_to_sample(i16::from_le_bytes([chunk[0], chunk[1]])))
        .collect())
}

pub fn decode_buffer(fragment: &str, sample_rate: u32) -> Result<AudioBuffer, DecodeError> {
    if sample_rate == 0 {
        return Err(DecodeError::InvalidRate(sample_rate.to_string()));
    }
    decode(fragment).map(|samples| AudioBuffer::new(samples, sample_rate))
}

/// Averages interleaved frames down to mono.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Turns device-rate microphone audio into fixed-size frames at the capture rate.
pub struct FrameAccumulator {
    resampler: Option<FastFixedIn<f32>>,
    frame_size: usize,
    pending_in: Vec<f32>,
    pending_out: Vec<f32>,
}

impl FrameAccumulator {
    pub fn new(in_sampling_rate: u32, out_sampling_rate: u32, frame_size: usize) -> anyhow::Result<Self> {
        if in_sampling_rate == 0 || out_sampling_rate == 0 || frame_size == 0 {
            return Err(anyhow::anyhow!(
                "invalid frame accumulator parameters: {}Hz -> {}Hz, frame size {}",
                in_sampling_rate,
                out_sampling_rate,
                frame_size
            ));
        }
        let resampler = if in_sampling_rate == out_sampling_rate {
            None
        } else {
            Some(create_resampler(in_sampling_rate as f64, out_sampling_rate as f64, RESAMPLER_CHUNK_SIZE)?)
        };
        Ok(Self {
            resampler,
            frame_size,
            pending_in: Vec::new(),
            pending_out: Vec::new(),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Feeds mono samples and returns every frame that became complete.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        match self.resampler.as_mut() {
            None => self.pending_out.extend_from_slice(samples),
            Some(resampler) => {
                self.pending_in.extend_from_slice(samples);
                loop {
                    let needed = resampler.input_frames_next();
                    if self.pending_in.len() < needed {
                        break;
                    }
                    let chunk: Vec<f32> = self.pending_in.drain(..needed).collect();
                    match resampler.process(&[chunk], None) {
                        Ok(mut output) => {
                            if let Some(channel) = output.pop() {
                                self.pending_out.extend(channel);
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to resample capture audio: {}", e);
                        }
                    }
                }
            }
        }

        let complete = self.pending_out.len() / self.frame_size;
        self.pending_out
            .drain(..complete * self.frame_size)
            .collect::<Vec<f32>>()
            .chunks(self.frame_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Drops buffered audio, e.g. when recording stops.
    pub fn reset(&mut self) {
        self.pending_in.clear();
        self.pending_out.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_round_trip_within_one_lsb() {
        let samples = [-1.0, -0.5, -0.000_1, 0.0, 0.25, 0.999, 1.0];
        let decoded = decode(&encode(&samples)).unwrap();
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= 1.0 / 32767.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_encode_clamps_and_rounds() {
        assert_eq!(sample_to_pcm16(2.0), i16::MAX);
        assert_eq!(sample_to_pcm16(-2.0), -i16::MAX);
        assert_eq!(sample_to_pcm16(0.5), 16384);
        assert_eq!(pcm16_to_sample(i16::MIN), -1.0);
        assert_eq!(encode(&[0.0]), "AAA=");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(""), Err(DecodeError::Empty));
        assert_eq!(decode("AAAA"), Err(DecodeError::OddLength(3)));
        assert!(matches!(decode("not base64!"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = decode_buffer(&encode(&vec![0.0; 2400]), 24000).unwrap();
        assert!((buffer.duration() - 0.1).abs() < 1e-9);
        assert_eq!(
            decode_buffer(&encode(&[0.1; 16]), 0),
            Err(DecodeError::InvalidRate("0".to_string()))
        );
    }

    #[test]
    fn test_downmix() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_accumulator_passthrough_frames() {
        let mut acc = FrameAccumulator::new(16000, 16000, CAPTURE_FRAME_SIZE).unwrap();
        let frames = acc.push(&vec![0.1; 600]);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() == CAPTURE_FRAME_SIZE));
        assert_eq!(acc.push(&vec![0.1; 200]).len(), 1);
        acc.reset();
        assert!(acc.push(&vec![0.1; 255]).is_empty());
    }

    #[test]
    fn test_accumulator_resamples_to_capture_rate() {
        let mut acc = FrameAccumulator::new(48000, 16000, CAPTURE_FRAME_SIZE).unwrap();
        let frames = acc.push(&vec![0.0; 48000]);
        assert!(frames.len() >= 55 && frames.len() <= 63, "got {} frames", frames.len());
        assert!(frames.iter().all(|f| f.len() == CAPTURE_FRAME_SIZE));
    }

    #[test]
    fn test_accumulator_rejects_zero_rate() {
        assert!(FrameAccumulator::new(0, 16000, 256).is_err());
    }
}
