//! Session and application configuration.
//!
//! [`SessionSettings`] is what a single connection is configured with; changing
//! any of it means tearing the connection down and opening a new one.
//! [`AppConfig`] is loaded once from the environment.

use crate::client::consts::DEFAULT_MODEL;
use crate::session::dispatch;
use crate::types::audio::Voice;
use crate::types::session::SetupConfigurator;
use crate::types::Setup;
use secrecy::SecretString;
use std::env;
use tracing::Level;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Your name is Morpheus. You are a friendly, concise voice assistant. \
Answer in short spoken sentences. Use the available tools when they help: look up the weather, \
schedule meetings, search the web for current information, and draw bar charts when the user asks \
to visualize numbers.";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    voice: Voice,
    tools_enabled: bool,
    system_instruction: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            voice: Voice::default(),
            tools_enabled: false,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl SessionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    pub fn with_system_instruction(mut self, instruction: &str) -> Self {
        self.system_instruction = instruction.to_string();
        self
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn tools_enabled(&self) -> bool {
        self.tools_enabled
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub(crate) fn set_voice(&mut self, voice: Voice) {
        self.voice = voice;
    }

    pub(crate) fn set_tools_enabled(&mut self, enabled: bool) {
        self.tools_enabled = enabled;
    }

    /// The setup message for a connection to `model`.
    pub fn to_setup(&self, model: &str) -> Setup {
        let mut configurator = SetupConfigurator::new(model)
            .with_voice(self.voice.clone())
            .with_input_audio_transcription()
            .with_output_audio_transcription();
        if !self.system_instruction.trim().is_empty() {
            configurator = configurator.with_system_instruction(&self.system_instruction);
        }
        if self.tools_enabled {
            configurator = configurator.with_tools(dispatch::tools());
        }
        configurator.build()
    }
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct AppConfig {
    pub api_key: SecretString,
    pub model: String,
    pub log_level: Level,
    pub session: SessionSettings,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY` (or `API_KEY`): Required.
    // *   `GEMINI_LIVE_MODEL`: Defaults to the native-audio dialog model.
    // *   `GEMINI_LIVE_VOICE`: One of the preset voices or any other voice name. Defaults to "Puck".
    // *   `GEMINI_LIVE_TOOLS`: "true"/"false". Defaults to "false".
    // *   `GEMINI_LIVE_INSTRUCTION`: Overrides the built-in system instruction.
    // *   `RUST_LOG`: Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Ignored if there is no .env file.
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let model = var("GEMINI_LIVE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let voice = match var("GEMINI_LIVE_VOICE") {
            Some(name) if !name.trim().is_empty() => name.trim().parse().unwrap_or_default(),
            _ => Voice::default(),
        };

        let tools_enabled = match var("GEMINI_LIVE_TOOLS") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidValue("GEMINI_LIVE_TOOLS".to_string(), value))?,
            None => false,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let mut session = SessionSettings::new().with_voice(voice).with_tools_enabled(tools_enabled);
        if let Some(instruction) = var("GEMINI_LIVE_INSTRUCTION") {
            session = session.with_system_instruction(&instruction);
        }

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            log_level,
            session,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tools::Tool;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(vars(&[("API_KEY", "k")])).unwrap();
        assert_eq!(config.api_key.expose_secret(), "k");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.session, SessionSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("GEMINI_API_KEY", "g"),
            ("API_KEY", "ignored"),
            ("GEMINI_LIVE_VOICE", "kore"),
            ("GEMINI_LIVE_TOOLS", "yes"),
            ("GEMINI_LIVE_INSTRUCTION", "Be terse."),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.expose_secret(), "g");
        assert_eq!(config.session.voice(), &Voice::Kore);
        assert!(config.session.tools_enabled());
        assert_eq!(config.session.system_instruction(), "Be terse.");
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(AppConfig::from_vars(vars(&[])), Err(ConfigError::MissingVar(_))));
        assert!(matches!(
            AppConfig::from_vars(vars(&[("API_KEY", "k"), ("GEMINI_LIVE_TOOLS", "maybe")])),
            Err(ConfigError::InvalidValue(_, _))
        ));
        assert!(matches!(
            AppConfig::from_vars(vars(&[("API_KEY", "k"), ("RUST_LOG", "loud")])),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_setup_follows_settings() {
        let setup = SessionSettings::new().with_voice(Voice::Zephyr).to_setup(DEFAULT_MODEL);
        assert_eq!(setup.voice(), Some(&Voice::Zephyr));
        assert!(setup.tools().is_empty());

        let value = serde_json::to_value(&setup).unwrap();
        assert!(value.get("inputAudioTranscription").is_some());
        assert!(value.get("outputAudioTranscription").is_some());

        let setup = SessionSettings::new().with_tools_enabled(true).to_setup(DEFAULT_MODEL);
        assert!(matches!(setup.tools()[0], Tool::GoogleSearch(_)));
        match &setup.tools()[1] {
            Tool::FunctionDeclarations(declarations) => assert_eq!(declarations.len(), 3),
            other => panic!("unexpected tool {:?}", other),
        }
    }
}
