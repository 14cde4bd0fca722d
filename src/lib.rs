mod channel;
mod client;
mod error;
pub mod session;
pub mod settings;

#[cfg(feature = "native")]
pub mod native;

pub use gemini_live_types as types;
pub use gemini_live_utils as utils;

pub use channel::{ChannelEvent, ChannelEvents, Connector, LiveChannel};
pub use client::{connect, connect_with_config, Client, Config, ConfigBuilder, GeminiConnector, Stats};
pub use error::LiveError;
pub use session::{Command, Input, SessionController, SessionState, StatusLine};
pub use settings::{AppConfig, ConfigError, SessionSettings};
