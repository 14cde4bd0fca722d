//! cpal-backed microphone and speaker.
//!
//! A `cpal::Stream` cannot move between threads on every platform, so each
//! stream is built and kept alive on its own thread until it is dropped.

use crate::error::LiveError;
use crate::session::capture::{FrameSink, Microphone};
use crate::session::playback::OutputDevice;
use crate::session::Input;
use crate::utils::audio::{downmix, AudioBuffer};
use crate::utils::device;
use crate::utils::mixer::{Mixer, SharedMixer, SourceId};
use crate::utils::tap::SharedTap;
use cpal::traits::{DeviceTrait, StreamTrait};
use tokio::sync::mpsc;

struct StreamThread {
    stop: Option<std::sync::mpsc::Sender<()>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        // Closing the channel wakes the thread, which then drops its stream.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("audio stream thread panicked");
            }
        }
    }
}

fn spawn_stream<T, F>(name: &str, build: F) -> anyhow::Result<(StreamThread, T)>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<(cpal::Stream, T)> + Send + 'static,
{
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<anyhow::Result<T>>();
    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

    let handle = std::thread::Builder::new().name(name.to_string()).spawn(move || {
        let (stream, value) = match build() {
            Ok(built) => built,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(anyhow::anyhow!("failed to play stream: {}", e)));
            return;
        }
        if ready_tx.send(Ok(value)).is_err() {
            return;
        }
        // Blocks until the owning StreamThread is dropped.
        let _ = stop_rx.recv();
        drop(stream);
    })?;

    let value = ready_rx
        .recv()
        .map_err(|_| anyhow::anyhow!("{} exited before the stream started", name))??;
    Ok((
        StreamThread {
            stop: Some(stop_tx),
            handle: Some(handle),
        },
        value,
    ))
}

/// Speaker output driven by a [`Mixer`]. Finished sources are reported to the
/// controller as [`Input::PlaybackEnded`].
pub struct CpalOutput {
    mixer: SharedMixer,
    _stream: StreamThread,
}

impl CpalOutput {
    pub fn open(device_name: Option<String>, inputs: mpsc::Sender<Input>, tap: SharedTap) -> anyhow::Result<Self> {
        let (stream, mixer) = spawn_stream("gemini-live-output", move || {
            let device = device::get_or_default_output(device_name)?;
            let config = device::output_config(&device)?;
            let channels = config.channels() as usize;
            let rate = config.sample_rate().0;
            tracing::info!("output: device={:?}, rate={}, channels={}", device.name(), rate, channels);

            let mixer = SharedMixer::new(Mixer::new(rate).with_tap(tap));
            let callback_mixer = mixer.clone();
            let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let ended = callback_mixer.lock().render(data, channels);
                for id in ended {
                    if let Err(e) = inputs.try_send(Input::PlaybackEnded(id)) {
                        tracing::warn!("failed to report finished source {}: {}", id, e);
                    }
                }
            };
            let stream = device.build_output_stream(
                &config.config(),
                output_data_fn,
                move |err| tracing::error!("an error occurred on output stream: {}", err),
                None,
            )?;
            Ok((stream, mixer))
        })?;
        Ok(Self { mixer, _stream: stream })
    }
}

impl OutputDevice for CpalOutput {
    fn current_time(&self) -> f64 {
        OutputDevice::current_time(&self.mixer)
    }

    fn start(&mut self, id: SourceId, buffer: AudioBuffer, at: f64) {
        OutputDevice::start(&mut self.mixer, id, buffer, at)
    }

    fn stop(&mut self, id: SourceId) {
        OutputDevice::stop(&mut self.mixer, id)
    }
}

/// Microphone input. The stream only exists between `acquire` and `release`.
pub struct CpalMicrophone {
    device_name: Option<String>,
    stream: Option<StreamThread>,
}

impl CpalMicrophone {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
        }
    }
}

impl Microphone for CpalMicrophone {
    fn acquire(&mut self, sink: FrameSink) -> Result<u32, LiveError> {
        self.release();
        let device_name = self.device_name.clone();
        let (stream, rate) = spawn_stream("gemini-live-input", move || {
            let device = device::get_or_default_input(device_name)?;
            let config = device::input_config(&device)?;
            let channels = config.channels() as usize;
            let rate = config.sample_rate().0;
            tracing::info!("input: device={:?}, rate={}, channels={}", device.name(), rate, channels);

            let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !sink.push(downmix(data, channels)) {
                    tracing::trace!("capture queue full, dropping {} samples", data.len());
                }
            };
            let stream = device.build_input_stream(
                &config.config(),
                input_data_fn,
                move |err| tracing::error!("an error occurred on input stream: {}", err),
                None,
            )?;
            Ok((stream, rate))
        })
        .map_err(|e| LiveError::Permission(e.to_string()))?;
        self.stream = Some(stream);
        Ok(rate)
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("microphone released");
        }
    }
}

/// Human-readable list of input and output devices.
pub fn list_devices() -> anyhow::Result<String> {
    Ok(format!(
        "inputs:\n{}\noutputs:\n{}",
        device::get_available_inputs()?,
        device::get_available_outputs()?
    ))
}
