//! The real-time session engine.
//!
//! A [`SessionController`] owns one live channel at a time and every piece of
//! mutable session state. It is driven by a single queue of [`Input`]s: channel
//! callbacks, captured audio, finished playback, share ticks and user commands
//! all arrive there and are handled one at a time, to completion.

pub mod capture;
pub mod dispatch;
pub mod event;
pub mod history;
pub mod interrupt;
pub mod playback;
pub mod share;

#[cfg(test)]
mod test_support;

use crate::channel::{ChannelEvent, ChannelEvents, Connector, LiveChannel};
use crate::error::LiveError;
use crate::settings::SessionSettings;
use crate::types::audio::{Voice, CAPTURE_SAMPLE_RATE};
use crate::types::{Blob, ClientMessage, ServerMessage};
use crate::utils::audio::{FrameAccumulator, CAPTURE_FRAME_SIZE};
use crate::utils::mixer::SourceId;
use crate::utils::tap::SharedTap;
use capture::{CaptureEncoder, FrameSink, Microphone, NoMicrophone};
use dispatch::FunctionDispatcher;
pub use dispatch::DispatchError;
use event::SessionEvent;
use history::{AppendOptions, History, Role, Source};
use interrupt::InterruptionHandler;
use playback::{OutputDevice, PlaybackScheduler, ScheduledSource, SourceRegistry};
use share::{FrameSampler, FrameSource, NoFrameSource, Sample, ShareMode, SHARE_INTERVAL};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

const AUDIO_RESPONSE_PLACEHOLDER: &str = "[Audio Response]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Open,
    /// The old channel is being torn down before a new one is opened.
    Reconfiguring,
    Closed,
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Input {
    Channel { generation: u64, event: ChannelEvent },
    /// Mono microphone samples at the device rate.
    CaptureFrame(Vec<f32>),
    PlaybackEnded(SourceId),
    ShareTick,
    Command(Command),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartRecording,
    StopRecording,
    ToggleRecording,
    SetVoice(Voice),
    SetToolsEnabled(bool),
    ToggleTools,
    StartShare(ShareMode),
    StopShare,
    /// Clear the history and start over with a fresh session.
    Reset,
    Shutdown,
}

/// The latest status and error text. Each holds only its most recent line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    pub status: String,
    pub error: String,
}

/// What the model has produced so far in the current turn.
#[derive(Debug, Default)]
struct TurnState {
    audio_chunks: usize,
    transcript: String,
    user_transcript: String,
    sources: Vec<Source>,
}

impl TurnState {
    fn add_sources(&mut self, sources: Vec<Source>) {
        for source in sources {
            if !self.sources.iter().any(|s| s.uri() == source.uri()) {
                self.sources.push(source);
            }
        }
    }

    fn has_response(&self) -> bool {
        self.audio_chunks > 0 || !self.transcript.trim().is_empty()
    }
}

pub struct SessionController {
    connector: Box<dyn Connector>,
    output: Box<dyn OutputDevice>,
    microphone: Box<dyn Microphone>,
    frames: Box<dyn FrameSource>,
    inputs: mpsc::Sender<Input>,

    settings: SessionSettings,
    state: SessionState,
    channel: Option<Box<dyn LiveChannel>>,
    generation: u64,

    scheduler: PlaybackScheduler,
    registry: SourceRegistry,
    interruption: InterruptionHandler,
    dispatcher: FunctionDispatcher,
    history: History,
    turn: TurnState,

    capture: CaptureEncoder,
    accumulator: Option<FrameAccumulator>,
    recording: bool,
    input_tap: SharedTap,

    share_mode: ShareMode,
    share_timer: Option<tokio::task::JoinHandle<()>>,
    sampler: FrameSampler,

    status: watch::Sender<StatusLine>,
}

impl SessionController {
    /// `inputs` is the sending half of the queue later passed to [`run`](Self::run).
    pub fn new(
        connector: impl Connector + 'static,
        output: impl OutputDevice + 'static,
        inputs: mpsc::Sender<Input>,
    ) -> Self {
        let (status, _) = watch::channel(StatusLine::default());
        Self {
            connector: Box::new(connector),
            output: Box::new(output),
            microphone: Box::new(NoMicrophone),
            frames: Box::new(NoFrameSource),
            inputs,
            settings: SessionSettings::default(),
            state: SessionState::Uninitialized,
            channel: None,
            generation: 0,
            scheduler: PlaybackScheduler::new(),
            registry: SourceRegistry::new(),
            interruption: InterruptionHandler::new(),
            dispatcher: FunctionDispatcher::new(),
            history: History::new(),
            turn: TurnState::default(),
            capture: CaptureEncoder::new(),
            accumulator: None,
            recording: false,
            input_tap: SharedTap::default(),
            share_mode: ShareMode::None,
            share_timer: None,
            sampler: FrameSampler::new(),
            status,
        }
    }

    pub fn with_microphone(mut self, microphone: impl Microphone + 'static) -> Self {
        self.microphone = Box::new(microphone);
        self
    }

    pub fn with_frame_source(mut self, frames: impl FrameSource + 'static) -> Self {
        self.frames = Box::new(frames);
        self
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Starts from previously persisted history.
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    pub fn with_input_tap(mut self, tap: SharedTap) -> Self {
        self.input_tap = tap;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn share_mode(&self) -> ShareMode {
        self.share_mode
    }

    pub fn status(&self) -> String {
        self.status.borrow().status.clone()
    }

    pub fn error(&self) -> String {
        self.status.borrow().error.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusLine> {
        self.status.subscribe()
    }

    pub fn input_tap(&self) -> SharedTap {
        self.input_tap.clone()
    }

    pub fn live_sources(&self) -> usize {
        self.registry.len()
    }

    pub fn playback_cursor(&self) -> f64 {
        self.scheduler.cursor()
    }

    pub fn capture_stats(&self) -> &CaptureEncoder {
        &self.capture
    }

    fn set_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        tracing::info!("status: {}", status);
        self.status.send_modify(|line| line.status = status);
    }

    fn set_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::error!("{}", error);
        self.status.send_modify(|line| line.error = error);
    }

    pub async fn activate(&mut self) {
        if self.state != SessionState::Uninitialized {
            tracing::warn!("activate called in state {:?}", self.state);
            return;
        }
        self.set_status("Initializing...");
        self.scheduler.init(self.output.current_time());
        self.open_session().await;
    }

    async fn open_session(&mut self) {
        self.generation += 1;
        self.state = SessionState::Connecting;
        let events = ChannelEvents::new(self.inputs.clone(), self.generation);
        match self.connector.connect(&self.settings, events).await {
            Ok(channel) => {
                tracing::info!(
                    "session {} connecting (voice {}, tools {})",
                    self.generation,
                    self.settings.voice(),
                    self.settings.tools_enabled()
                );
                self.channel = Some(channel);
            }
            Err(e) => {
                self.set_error(format!(
                    "Initialization failed. Please ensure the API key is configured correctly. Error: {}",
                    e
                ));
                self.state = SessionState::Closed;
            }
        }
    }

    /// Closes the channel and silences playback. History is kept.
    fn teardown(&mut self) {
        self.state = SessionState::Reconfiguring;
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.registry.stop_all(&mut *self.output);
        self.scheduler.reset();
        self.turn = TurnState::default();
    }

    pub fn handle_channel_event(&mut self, generation: u64, event: ChannelEvent) {
        if generation != self.generation {
            tracing::debug!("ignoring event from stale session {}: {:?}", generation, event);
            return;
        }
        match event {
            ChannelEvent::Opened => {
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Open;
                }
                self.set_status("Opened");
            }
            ChannelEvent::Message(message) => self.handle_message(&message),
            ChannelEvent::Error(message) => self.set_error(message),
            ChannelEvent::Closed(reason) => {
                self.set_status(format!("Close:{}", reason));
                self.state = SessionState::Closed;
                if let Some(mut channel) = self.channel.take() {
                    channel.close();
                }
            }
        }
    }

    fn handle_message(&mut self, message: &ServerMessage) {
        if let Some(cancellation) = message.tool_call_cancellation() {
            tracing::info!("tool calls cancelled: {:?}", cancellation.ids());
        }
        for event in SessionEvent::from_server_message(message) {
            self.route(event);
        }
    }

    pub fn route(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AudioChunk(blob) => match self.play_chunk(&blob) {
                Ok(source) => tracing::debug!("scheduled source {} at {:.3}s", source.id(), source.start()),
                Err(e) => tracing::warn!("skipping audio chunk: {}", e),
            },
            SessionEvent::FunctionCall(call) => self.dispatch_call(&call),
            SessionEvent::Interrupted => {
                self.interrupt();
            }
            SessionEvent::Transcript { role, text } => self.on_transcript(role, &text),
            SessionEvent::GroundingSources(sources) => self.turn.add_sources(sources),
            SessionEvent::TurnComplete => self.finish_turn(),
        }
    }

    pub fn play_chunk(&mut self, blob: &Blob) -> Result<ScheduledSource, LiveError> {
        let source = self.scheduler.schedule_chunk(blob, &mut *self.output, &mut self.registry)?;
        self.turn.audio_chunks += 1;
        Ok(source)
    }

    pub fn dispatch_call(&mut self, call: &crate::types::tools::FunctionCall) {
        let response = self.dispatcher.dispatch(call, &mut self.history);
        let Some(channel) = self.channel.as_mut() else {
            tracing::warn!("no session to answer function call {}", call.name());
            return;
        };
        if let Err(e) = channel.send(ClientMessage::tool_response(response)) {
            self.set_error(format!("Failed to send tool response for {}: {}", call.name(), e));
        }
    }

    /// Stops playback immediately and closes out the model's turn.
    pub fn interrupt(&mut self) -> usize {
        let stopped = self
            .interruption
            .on_interrupt(&mut *self.output, &mut self.registry, &mut self.scheduler);
        self.finish_turn();
        stopped
    }

    fn on_transcript(&mut self, role: Role, text: &str) {
        match role {
            Role::User => {
                // Fragments accumulate, so each append extends the same entry.
                self.turn.user_transcript.push_str(text);
                let transcript = self.turn.user_transcript.clone();
                self.history.append(Role::User, &transcript, AppendOptions::new());
            }
            _ => self.turn.transcript.push_str(text),
        }
    }

    fn finish_turn(&mut self) {
        let turn = std::mem::take(&mut self.turn);
        if !turn.has_response() {
            return;
        }
        let content = match turn.transcript.trim() {
            "" => AUDIO_RESPONSE_PLACEHOLDER,
            transcript => transcript,
        };
        self.history
            .append(Role::Ai, content, AppendOptions::new().with_sources(turn.sources.clone()));
    }

    pub fn start_recording(&mut self) -> bool {
        if self.recording {
            return true;
        }
        self.set_status("Requesting microphone access...");

        let acquired = self
            .microphone
            .acquire(FrameSink::new(self.inputs.clone()))
            .and_then(|rate| {
                tracing::info!("microphone running at {}Hz", rate);
                FrameAccumulator::new(rate, CAPTURE_SAMPLE_RATE, CAPTURE_FRAME_SIZE)
                    .map_err(|e| LiveError::Audio(e.to_string()))
            });
        match acquired {
            Ok(accumulator) => {
                self.accumulator = Some(accumulator);
                self.recording = true;
                self.set_status("🔴 Recording...");
                true
            }
            Err(e) => {
                self.microphone.release();
                self.set_status(format!("Error: {}", e));
                false
            }
        }
    }

    pub fn stop_recording(&mut self) {
        if !self.recording && self.accumulator.is_none() {
            return;
        }
        self.set_status("Stopping recording...");
        self.recording = false;
        self.microphone.release();
        self.accumulator = None;
        self.set_status("Recording stopped.");
    }

    pub fn toggle_recording(&mut self) -> bool {
        if self.recording {
            self.stop_recording();
            false
        } else {
            self.start_recording()
        }
    }

    pub fn on_capture_frame(&mut self, samples: &[f32]) {
        if !self.recording {
            return;
        }
        let Some(accumulator) = self.accumulator.as_mut() else {
            return;
        };
        for frame in accumulator.push(samples) {
            self.input_tap.push(&frame);
            let channel = match self.state {
                SessionState::Open => self.channel.as_mut(),
                _ => None,
            };
            self.capture.tick(&frame, channel);
        }
    }

    pub async fn set_voice(&mut self, voice: Voice) {
        if self.settings.voice() == &voice && self.state != SessionState::Closed {
            return;
        }
        self.settings.set_voice(voice);
        self.reconfigure().await;
    }

    pub async fn set_tools_enabled(&mut self, enabled: bool) {
        if self.settings.tools_enabled() == enabled && self.state != SessionState::Closed {
            return;
        }
        self.settings.set_tools_enabled(enabled);
        self.reconfigure().await;
    }

    pub async fn toggle_tools(&mut self) {
        let enabled = !self.settings.tools_enabled();
        self.set_tools_enabled(enabled).await;
    }

    /// Replaces the session with one built from the current settings.
    pub async fn reconfigure(&mut self) {
        tracing::info!("reconfiguring session {}", self.generation);
        self.teardown();
        self.open_session().await;
    }

    /// Starts over: new session, empty history.
    pub async fn reset(&mut self) {
        self.teardown();
        self.history.clear();
        self.open_session().await;
        self.set_status("Session cleared.");
    }

    pub fn start_share(&mut self, mode: ShareMode) {
        if mode == ShareMode::None {
            self.stop_share();
            return;
        }
        if self.share_mode != ShareMode::None {
            return;
        }
        let label = match mode {
            ShareMode::Screen => "Screen",
            _ => "Camera",
        };
        if let Err(e) = self.frames.open(mode) {
            self.frames.close();
            self.set_error(format!("{} share error: {}", label, e));
            return;
        }

        self.share_mode = mode;
        let tx = self.inputs.clone();
        self.share_timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(SHARE_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; frames start one period in.
            interval.tick().await;
            loop {
                interval.tick().await;
                match tx.try_send(Input::ShareTick) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => tracing::debug!("share tick skipped"),
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        }));
        self.set_status(format!("{} sharing started.", label));
    }

    pub fn stop_share(&mut self) {
        if self.share_mode == ShareMode::None {
            return;
        }
        if let Some(timer) = self.share_timer.take() {
            timer.abort();
        }
        self.frames.close();
        self.share_mode = ShareMode::None;
        self.set_status("Sharing stopped.");
    }

    /// Sends the current shared frame. Stops sharing once the source has ended.
    pub fn on_share_tick(&mut self) {
        if self.share_mode == ShareMode::None {
            return;
        }
        let blob = match self.sampler.sample(&mut *self.frames) {
            Sample::Encoded(blob) => blob,
            Sample::Skipped => return,
            Sample::Ended => {
                tracing::info!("share source ended");
                self.stop_share();
                return;
            }
        };
        let channel = match self.state {
            SessionState::Open => self.channel.as_mut(),
            _ => None,
        };
        let Some(channel) = channel else {
            tracing::debug!("no open session, dropping shared frame");
            return;
        };
        if let Err(e) = channel.send(ClientMessage::realtime_media(blob)) {
            tracing::warn!("dropping shared frame: {}", e);
        }
    }

    pub fn shutdown(&mut self) {
        self.stop_recording();
        self.stop_share();
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.registry.stop_all(&mut *self.output);
        self.scheduler.reset();
        self.state = SessionState::Closed;
        tracing::info!("session controller shut down");
    }

    async fn handle_command(&mut self, command: Command) -> bool {
        tracing::debug!("command: {:?}", command);
        match command {
            Command::StartRecording => {
                self.start_recording();
            }
            Command::StopRecording => self.stop_recording(),
            Command::ToggleRecording => {
                self.toggle_recording();
            }
            Command::SetVoice(voice) => self.set_voice(voice).await,
            Command::SetToolsEnabled(enabled) => self.set_tools_enabled(enabled).await,
            Command::ToggleTools => self.toggle_tools().await,
            Command::StartShare(mode) => self.start_share(mode),
            Command::StopShare => self.stop_share(),
            Command::Reset => self.reset().await,
            Command::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// Handles one input to completion. Returns false after a shutdown.
    pub async fn handle_input(&mut self, input: Input) -> bool {
        match input {
            Input::Channel { generation, event } => self.handle_channel_event(generation, event),
            Input::CaptureFrame(samples) => self.on_capture_frame(&samples),
            Input::PlaybackEnded(id) => {
                self.registry.remove_if_present(id);
            }
            Input::ShareTick => self.on_share_tick(),
            Input::Command(command) => return self.handle_command(command).await,
        }
        true
    }

    /// Activates the session and processes inputs until shutdown or until every
    /// sender is gone. Returns the conversation history.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) -> History {
        if self.state == SessionState::Uninitialized {
            self.activate().await;
        }
        while let Some(input) = inputs.recv().await {
            if !self.handle_input(input).await {
                break;
            }
        }
        if self.state != SessionState::Closed || self.recording || self.share_mode != ShareMode::None {
            self.shutdown();
        }
        self.history
    }
}
