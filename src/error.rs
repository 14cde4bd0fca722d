use gemini_live_utils::audio::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("not connected")]
    NotConnected,
    #[error("outbound queue is full")]
    Backpressure,
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("audio error: {0}")]
    Audio(String),
}
