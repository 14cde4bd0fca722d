use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;
use crate::channel::{ChannelEvent, ChannelEvents, Connector, LiveChannel};
use crate::error::LiveError;
use crate::settings::SessionSettings;
use crate::types::{ClientMessage, ServerMessage, Setup};

mod config;
pub(crate) mod consts;
mod stats;
mod utils;

pub use config::{Config, ConfigBuilder};
pub use stats::Stats;

/// Serialized JSON frames on their way to the writer task.
pub type ClientTx = tokio::sync::mpsc::Sender<String>;

pub struct Connection {
    pub(crate) send_handle: tokio::task::JoinHandle<()>,
    pub(crate) recv_handle: tokio::task::JoinHandle<()>,
}

/// One WebSocket connection to the Live endpoint.
///
/// Outbound messages go through a bounded queue drained by a writer task;
/// inbound frames are parsed by a reader task and delivered as
/// [`ChannelEvent`]s.
pub struct Client {
    c_tx: Option<ClientTx>,
    connection: Option<Connection>,
}

impl Client {
    async fn connect(
        capacity: usize,
        config: &Config,
        setup: Setup,
        events: ChannelEvents,
        stats: Arc<Mutex<Stats>>,
    ) -> Result<Self, LiveError> {
        if config.api_key().expose_secret().is_empty() {
            return Err(LiveError::Initialization("API key is not configured".to_string()));
        }

        let request = utils::build_request(config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        tracing::info!("connected to {} (model {})", config.base_url(), setup.model());

        let (mut write, mut read) = ws_stream.split();
        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<String>(capacity.max(1));

        let send_handle = tokio::spawn(async move {
            while let Some(text) = c_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    tracing::error!("failed to send message: {}", e);
                    break;
                }
            }
            if let Err(e) = write.send(Message::Close(None)).await {
                tracing::debug!("failed to send close frame: {}", e);
            }
        });

        let recv_handle = tokio::spawn(async move {
            let reason = loop {
                let message = match read.next().await {
                    None => break "connection ended".to_string(),
                    Some(Err(e)) => {
                        tracing::error!("failed to read message: {}", e);
                        events.emit(ChannelEvent::Error(e.to_string())).await;
                        break e.to_string();
                    }
                    Some(Ok(message)) => message,
                };
                let parsed = match message {
                    Message::Text(text) => parse_server_message(text.as_bytes()),
                    Message::Binary(bin) => parse_server_message(&bin),
                    Message::Close(frame) => {
                        tracing::info!("connection closed: {:?}", frame);
                        break frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    }
                    _ => continue,
                };
                let message = match parsed {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!("failed to deserialize server message: {}", e);
                        continue;
                    }
                };

                if let Some(usage) = message.usage_metadata() {
                    if let Ok(mut stats_guard) = stats.lock() {
                        stats_guard.update_usage(usage);
                    } else {
                        tracing::error!("failed to update stats");
                    }
                }
                if let Some(go_away) = message.go_away() {
                    tracing::warn!("server is going away, time left: {:?}", go_away.time_left());
                }

                let event = if message.is_setup_complete() {
                    ChannelEvent::Opened
                } else {
                    ChannelEvent::Message(message)
                };
                if !events.emit(event).await {
                    tracing::debug!("event receiver dropped, stopping reader");
                    return;
                }
            };
            events.emit(ChannelEvent::Closed(reason)).await;
        });

        let mut client = Self {
            c_tx: Some(c_tx),
            connection: Some(Connection {
                send_handle,
                recv_handle,
            }),
        };
        // The setup message must be the first frame on the socket.
        client.send(ClientMessage::Setup(setup))?;
        Ok(client)
    }

    fn is_finished(&self) -> bool {
        self.connection
            .as_ref()
            .map_or(true, |c| c.send_handle.is_finished() && c.recv_handle.is_finished())
    }
}

impl LiveChannel for Client {
    fn send(&mut self, message: ClientMessage) -> Result<(), LiveError> {
        let text = serialize_client_message(&message)?;
        match self.c_tx {
            Some(ref tx) => match tx.try_send(text) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(LiveError::Backpressure),
                Err(TrySendError::Closed(_)) => Err(LiveError::NotConnected),
            },
            None => Err(LiveError::NotConnected),
        }
    }

    fn close(&mut self) {
        // Dropping the sender lets the writer flush and send a close frame.
        if self.c_tx.take().is_some() {
            tracing::info!("closing connection");
        }
    }

    fn is_closed(&self) -> bool {
        self.c_tx.as_ref().map_or(true, |tx| tx.is_closed()) || self.is_finished()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

fn serialize_client_message(message: &ClientMessage) -> Result<String, LiveError> {
    Ok(serde_json::to_string(message)?)
}

fn parse_server_message(bytes: &[u8]) -> Result<ServerMessage, serde_json::Error> {
    let message = serde_json::from_slice::<ServerMessage>(bytes)?;
    tracing::debug!(
        "received message: setup_complete={}, content={}, tool_call={}",
        message.is_setup_complete(),
        message.server_content().is_some(),
        message.tool_call().is_some()
    );
    Ok(message)
}

/// Opens [`Client`]s for the session controller and keeps token usage
/// across all of them.
pub struct GeminiConnector {
    capacity: usize,
    config: Config,
    stats: Arc<Mutex<Stats>>,
}

impl GeminiConnector {
    pub fn new(config: Config) -> Self {
        Self {
            capacity: consts::DEFAULT_CAPACITY,
            config,
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> Stats {
        match self.stats.lock() {
            Ok(stats_guard) => stats_guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Connector for GeminiConnector {
    async fn connect(&self, settings: &SessionSettings, events: ChannelEvents) -> Result<Box<dyn LiveChannel>, LiveError> {
        let setup = settings.to_setup(self.config.model());
        let client = Client::connect(self.capacity, &self.config, setup, events, self.stats.clone()).await?;
        Ok(Box::new(client))
    }
}

pub async fn connect_with_config(
    capacity: usize,
    config: Config,
    settings: &SessionSettings,
    events: ChannelEvents,
) -> Result<Client, LiveError> {
    let setup = settings.to_setup(config.model());
    Client::connect(capacity, &config, setup, events, Arc::new(Mutex::new(Stats::new()))).await
}

pub async fn connect(settings: &SessionSettings, events: ChannelEvents) -> Result<Client, LiveError> {
    let config = Config::new();
    connect_with_config(consts::DEFAULT_CAPACITY, config, settings, events).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Input;

    #[test]
    fn test_parse_text_and_binary_frames() {
        let json = br#"{"serverContent":{"turnComplete":true}}"#;
        let message = parse_server_message(json).unwrap();
        assert!(message.server_content().unwrap().turn_complete());

        let message = parse_server_message(br#"{"setupComplete":{}}"#).unwrap();
        assert!(message.is_setup_complete());

        assert!(parse_server_message(b"not json").is_err());
    }

    #[test]
    fn test_client_message_serialization() {
        let text = serialize_client_message(&ClientMessage::realtime_media(crate::types::Blob::pcm(16000, "AAA=".to_string())))
            .unwrap();
        assert_eq!(text, r#"{"realtimeInput":{"mediaChunks":[{"mimeType":"audio/pcm;rate=16000","data":"AAA="}]}}"#);
    }

    #[test]
    fn test_send_on_closed_client() {
        let mut client = Client {
            c_tx: None,
            connection: None,
        };
        assert!(client.is_closed());
        let result = client.send(ClientMessage::realtime_media(crate::types::Blob::pcm(16000, "AAA=".to_string())));
        assert!(matches!(result, Err(LiveError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_without_api_key_fails() {
        let (tx, _rx) = tokio::sync::mpsc::channel::<Input>(4);
        let config = Config::builder().with_api_key("").build();
        let connector = GeminiConnector::new(config);
        let result = connector
            .connect(&SessionSettings::default(), ChannelEvents::new(tx, 1))
            .await;
        assert!(matches!(result, Err(LiveError::Initialization(_))));
        assert_eq!(connector.stats(), Stats::new());
    }
}
