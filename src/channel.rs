use crate::error::LiveError;
use crate::session::Input;
use crate::settings::SessionSettings;
use crate::types::{ClientMessage, ServerMessage};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Callbacks from one live channel, in the order the transport produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The server acknowledged the setup message.
    Opened,
    Message(ServerMessage),
    Error(String),
    Closed(String),
}

/// Where a channel delivers its events. Every event is tagged with the
/// generation of the session that opened the channel, so the controller can
/// tell events of a torn-down channel from those of the current one.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: mpsc::Sender<Input>,
    generation: u64,
}

impl ChannelEvents {
    pub fn new(tx: mpsc::Sender<Input>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the controller has gone away.
    pub async fn emit(&self, event: ChannelEvent) -> bool {
        self.tx
            .send(Input::Channel {
                generation: self.generation,
                event,
            })
            .await
            .is_ok()
    }
}

/// The sending half of an open session.
pub trait LiveChannel: Send {
    /// Queues a message without waiting on the socket.
    fn send(&mut self, message: ClientMessage) -> Result<(), LiveError>;

    /// Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a channel configured from `settings`. The setup message is the
    /// first thing sent on it.
    async fn connect(&self, settings: &SessionSettings, events: ChannelEvents) -> Result<Box<dyn LiveChannel>, LiveError>;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for Arc<C> {
    async fn connect(&self, settings: &SessionSettings, events: ChannelEvents) -> Result<Box<dyn LiveChannel>, LiveError> {
        (**self).connect(settings, events).await
    }
}
