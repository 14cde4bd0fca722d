/// Enables server-side transcription of one audio direction.
///
/// The protocol takes an empty object; its presence is the switch.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioTranscriptionConfig {}

impl AudioTranscriptionConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A transcription fragment delivered inside `serverContent`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transcription {
    #[serde(default)]
    text: String,
}

impl Transcription {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
