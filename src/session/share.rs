use crate::error::LiveError;
use crate::types::Blob;
use crate::utils::frame::{encode_jpeg_frame, JPEG_QUALITY, MAX_FRAME_DIMENSION};
use image::RgbaImage;
#[cfg(test)]
use mockall::automock;
use std::time::Duration;

/// Time between frames sent while sharing.
pub const SHARE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    User,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    #[default]
    None,
    Screen,
    Camera(Facing),
}

/// What a frame source has to offer at a share tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Ready(RgbaImage),
    /// Nothing captured yet.
    Pending,
    /// The platform stopped the capture, e.g. the user ended the share.
    Ended,
}

/// Screen or camera capture, provided by the platform.
#[cfg_attr(test, automock)]
pub trait FrameSource: Send {
    fn open(&mut self, mode: ShareMode) -> Result<(), LiveError>;

    fn current_frame(&mut self) -> Frame;

    fn close(&mut self);
}

#[derive(Debug, Default)]
pub struct NoFrameSource;

impl FrameSource for NoFrameSource {
    fn open(&mut self, _mode: ShareMode) -> Result<(), LiveError> {
        Err(LiveError::Permission("no frame source available".to_string()))
    }

    fn current_frame(&mut self) -> Frame {
        Frame::Ended
    }

    fn close(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Encoded(Blob),
    Skipped,
    Ended,
}

/// Grabs and encodes one frame per share tick.
#[derive(Debug)]
pub struct FrameSampler {
    max_dimension: u32,
    quality: u8,
    sampled: u64,
    skipped: u64,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            max_dimension: MAX_FRAME_DIMENSION,
            quality: JPEG_QUALITY,
            sampled: 0,
            skipped: 0,
        }
    }
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sampled(&self) -> u64 {
        self.sampled
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// A JPEG blob of the current frame, if there is one worth sending.
    pub fn sample(&mut self, source: &mut dyn FrameSource) -> Sample {
        let frame = match source.current_frame() {
            Frame::Ready(frame) => frame,
            Frame::Pending => {
                self.skipped += 1;
                return Sample::Skipped;
            }
            Frame::Ended => return Sample::Ended,
        };
        match encode_jpeg_frame(&frame, self.max_dimension, self.quality) {
            Ok(Some(data)) => {
                self.sampled += 1;
                Sample::Encoded(Blob::jpeg(data))
            }
            Ok(None) => {
                self.skipped += 1;
                Sample::Skipped
            }
            Err(e) => {
                tracing::warn!("failed to encode frame: {}", e);
                self.skipped += 1;
                Sample::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_encodes_jpeg() {
        let mut source = MockFrameSource::new();
        source
            .expect_current_frame()
            .times(1)
            .returning(|| Frame::Ready(RgbaImage::from_pixel(64, 32, image::Rgba([0, 0, 255, 255]))));
        let mut sampler = FrameSampler::new();
        let Sample::Encoded(blob) = sampler.sample(&mut source) else {
            panic!("expected an encoded frame");
        };
        assert_eq!(blob.mime_type(), "image/jpeg");
        assert!(!blob.data().is_empty());
        assert_eq!(sampler.sampled(), 1);
    }

    #[test]
    fn test_sample_skips_unready_frames() {
        let mut source = MockFrameSource::new();
        let mut calls = 0;
        source.expect_current_frame().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Frame::Pending
            } else {
                Frame::Ready(RgbaImage::new(0, 0))
            }
        });
        let mut sampler = FrameSampler::new();
        assert_eq!(sampler.sample(&mut source), Sample::Skipped);
        assert_eq!(sampler.sample(&mut source), Sample::Skipped);
        assert_eq!(sampler.skipped(), 2);
    }

    #[test]
    fn test_sample_reports_ended_source() {
        let mut source = MockFrameSource::new();
        source.expect_current_frame().times(1).returning(|| Frame::Ended);
        let mut sampler = FrameSampler::new();
        assert_eq!(sampler.sample(&mut source), Sample::Ended);
        assert_eq!(sampler.skipped(), 0);
    }
}
