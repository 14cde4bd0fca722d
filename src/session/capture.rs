use crate::channel::LiveChannel;
use crate::error::LiveError;
use crate::session::Input;
use crate::types::audio::CAPTURE_SAMPLE_RATE;
use crate::types::{Blob, ClientMessage};
use crate::utils::audio::encode;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

/// Hands captured audio to the controller without ever blocking the audio thread.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::Sender<Input>,
}

impl FrameSink {
    pub fn new(tx: mpsc::Sender<Input>) -> Self {
        Self { tx }
    }

    /// Mono samples at the rate returned by [`Microphone::acquire`]. Returns
    /// false when the queue is full and the samples were dropped.
    pub fn push(&self, samples: Vec<f32>) -> bool {
        self.tx.try_send(Input::CaptureFrame(samples)).is_ok()
    }
}

#[cfg_attr(test, automock)]
pub trait Microphone: Send {
    /// Starts capture into `sink` and returns the device sample rate.
    fn acquire(&mut self, sink: FrameSink) -> Result<u32, LiveError>;

    /// Stops capture and releases the device. Safe to call when not acquired.
    fn release(&mut self);
}

/// Used when no capture device is configured; every request is refused.
#[derive(Debug, Default)]
pub struct NoMicrophone;

impl Microphone for NoMicrophone {
    fn acquire(&mut self, _sink: FrameSink) -> Result<u32, LiveError> {
        Err(LiveError::Permission("no microphone available".to_string()))
    }

    fn release(&mut self) {}
}

/// Turns capture frames into `realtimeInput` messages.
#[derive(Debug, Default)]
pub struct CaptureEncoder {
    sent: u64,
    dropped: u64,
}

impl CaptureEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn encode_frame(frame: &[f32]) -> Blob {
        Blob::pcm(CAPTURE_SAMPLE_RATE, encode(frame))
    }

    /// Sends one frame on `channel`, or counts it as dropped when there is no
    /// open channel or its queue refuses the message.
    pub fn tick(&mut self, frame: &[f32], channel: Option<&mut Box<dyn LiveChannel>>) -> bool {
        let Some(channel) = channel else {
            self.dropped += 1;
            return false;
        };
        match channel.send(ClientMessage::realtime_media(Self::encode_frame(frame))) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                self.dropped += 1;
                tracing::debug!("dropping capture frame: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::FakeChannel;

    #[test]
    fn test_encode_frame() {
        let blob = CaptureEncoder::encode_frame(&[0.0; 256]);
        assert_eq!(blob.mime_type(), "audio/pcm;rate=16000");
        assert_eq!(crate::utils::audio::decode(blob.data()).unwrap().len(), 256);
    }

    #[test]
    fn test_tick_without_channel_is_dropped() {
        let mut encoder = CaptureEncoder::new();
        assert!(!encoder.tick(&[0.0; 256], None));
        assert_eq!((encoder.sent(), encoder.dropped()), (0, 1));
    }

    #[test]
    fn test_tick_sends_realtime_input() {
        let fake = FakeChannel::new();
        let mut channel: Box<dyn LiveChannel> = Box::new(fake.clone());
        let mut encoder = CaptureEncoder::new();
        assert!(encoder.tick(&[0.5; 256], Some(&mut channel)));

        fake.set_full(true);
        assert!(!encoder.tick(&[0.5; 256], Some(&mut channel)));
        assert_eq!((encoder.sent(), encoder.dropped()), (1, 1));

        let sent = fake.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], ClientMessage::RealtimeInput(input) if input.media_chunks()[0].is_audio()));
    }

    #[test]
    fn test_frame_sink_never_blocks() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = FrameSink::new(tx);
        assert!(sink.push(vec![0.0; 4]));
        assert!(!sink.push(vec![0.0; 4]));
        assert!(matches!(rx.try_recv(), Ok(Input::CaptureFrame(samples)) if samples.len() == 4));
    }

    #[test]
    fn test_no_microphone() {
        let (tx, _rx) = mpsc::channel(1);
        let result = NoMicrophone.acquire(FrameSink::new(tx));
        assert!(matches!(result, Err(LiveError::Permission(_))));
    }
}
