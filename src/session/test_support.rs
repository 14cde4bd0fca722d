//! Hand-written fakes for the controller's collaborators. Each records its
//! traffic behind a shared handle so tests can inspect it after the fake has
//! been boxed and handed to the controller.

use crate::channel::{ChannelEvents, Connector, LiveChannel};
use crate::error::LiveError;
use crate::session::playback::OutputDevice;
use crate::settings::SessionSettings;
use crate::types::ClientMessage;
use crate::utils::audio::AudioBuffer;
use crate::utils::mixer::SourceId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ChannelLog {
    sent: Vec<ClientMessage>,
    closes: usize,
    full: bool,
}

#[derive(Clone, Default)]
pub struct FakeChannel {
    log: Arc<Mutex<ChannelLog>>,
    closed: bool,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn set_full(&self, full: bool) {
        self.log.lock().unwrap().full = full;
    }
}

impl LiveChannel for FakeChannel {
    fn send(&mut self, message: ClientMessage) -> Result<(), LiveError> {
        if self.closed {
            return Err(LiveError::NotConnected);
        }
        let mut log = self.log.lock().unwrap();
        if log.full {
            return Err(LiveError::Backpressure);
        }
        log.sent.push(message);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.lock().unwrap().closes += 1;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Default)]
struct ConnectorLog {
    settings: Vec<SessionSettings>,
    events: Vec<ChannelEvents>,
    channels: Vec<FakeChannel>,
    fail_with: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    log: Arc<Mutex<ConnectorLog>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        self.log.lock().unwrap().fail_with = Some(message.to_string());
    }

    pub fn connects(&self) -> Vec<SessionSettings> {
        self.log.lock().unwrap().settings.clone()
    }

    /// The event handle given to the `n`th connection.
    pub fn events(&self, n: usize) -> ChannelEvents {
        self.log.lock().unwrap().events[n].clone()
    }

    pub fn channel(&self, n: usize) -> FakeChannel {
        self.log.lock().unwrap().channels[n].clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, settings: &SessionSettings, events: ChannelEvents) -> Result<Box<dyn LiveChannel>, LiveError> {
        let mut log = self.log.lock().unwrap();
        if let Some(message) = log.fail_with.clone() {
            return Err(LiveError::Initialization(message));
        }
        let channel = FakeChannel::new();
        log.settings.push(settings.clone());
        log.events.push(events);
        log.channels.push(channel.clone());
        Ok(Box::new(channel))
    }
}

#[derive(Default)]
struct DeviceLog {
    time: f64,
    started: Vec<(SourceId, f64, f64)>,
    stopped: Vec<SourceId>,
}

#[derive(Clone, Default)]
pub struct FakeDevice {
    log: Arc<Mutex<DeviceLog>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, time: f64) {
        self.log.lock().unwrap().time = time;
    }

    /// `(id, start, duration)` of every started source.
    pub fn started(&self) -> Vec<(SourceId, f64, f64)> {
        self.log.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<SourceId> {
        self.log.lock().unwrap().stopped.clone()
    }
}

impl OutputDevice for FakeDevice {
    fn current_time(&self) -> f64 {
        self.log.lock().unwrap().time
    }

    fn start(&mut self, id: SourceId, buffer: AudioBuffer, at: f64) {
        self.log.lock().unwrap().started.push((id, at, buffer.duration()));
    }

    fn stop(&mut self, id: SourceId) {
        self.log.lock().unwrap().stopped.push(id);
    }
}
