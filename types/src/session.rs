use crate::audio::{AudioTranscriptionConfig, Voice};
use crate::content::parts::Content;
use crate::tools::Tool;

/// The first message of every connection. The model is configured once per
/// connection; changing any of this means opening a new one.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Fully qualified model name, e.g. `models/gemini-2.0-flash-live-001`.
    model: String,

    generation_config: GenerationConfig,

    /// The system instructions prepended to the conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    /// Tools available to the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,

    /// Transcribe the user's speech and stream it back.
    #[serde(skip_serializing_if = "Option::is_none")]
    input_audio_transcription: Option<AudioTranscriptionConfig>,

    /// Transcribe the model's speech and stream it back.
    #[serde(skip_serializing_if = "Option::is_none")]
    output_audio_transcription: Option<AudioTranscriptionConfig>,
}

impl Setup {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }

    pub fn system_instruction(&self) -> Option<&Content> {
        self.system_instruction.as_ref()
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.generation_config
            .speech_config
            .as_ref()
            .map(|speech| &speech.voice_config.prebuilt_voice_config.voice_name)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    response_modalities: Vec<Modality>,

    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

impl GenerationConfig {
    pub fn response_modalities(&self) -> &[Modality] {
        &self.response_modalities
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Audio,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    voice_name: Voice,
}

pub struct SetupConfigurator {
    setup: Setup,
}

impl SetupConfigurator {
    pub fn new(model: &str) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        Self {
            setup: Setup {
                model,
                generation_config: GenerationConfig {
                    response_modalities: vec![Modality::Audio],
                    speech_config: None,
                },
                system_instruction: None,
                input_audio_transcription: None,
                output_audio_transcription: None,
                tools: vec![],
            },
        }
    }

    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.setup.generation_config.response_modalities = modalities;
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.setup.generation_config.speech_config = Some(SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice },
            },
        });
        self
    }

    pub fn with_system_instruction(mut self, instruction: &str) -> Self {
        self.setup.system_instruction = Some(Content::from_text(instruction));
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.setup.tools = tools;
        self
    }

    pub fn with_input_audio_transcription(mut self) -> Self {
        self.setup.input_audio_transcription = Some(AudioTranscriptionConfig::new());
        self
    }

    pub fn with_output_audio_transcription(mut self) -> Self {
        self.setup.output_audio_transcription = Some(AudioTranscriptionConfig::new());
        self
    }

    pub fn build(self) -> Setup {
        self.setup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setup_wire_format() {
        let setup = SetupConfigurator::new("gemini-2.5-flash-preview-native-audio-dialog")
            .with_voice(Voice::Charon)
            .with_system_instruction("Be brief.")
            .with_input_audio_transcription()
            .build();

        let value = serde_json::to_value(&setup).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "models/gemini-2.5-flash-preview-native-audio-dialog",
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Charon"}}}
                },
                "systemInstruction": {"parts": [{"text": "Be brief."}]},
                "inputAudioTranscription": {}
            })
        );
        assert_eq!(setup.voice(), Some(&Voice::Charon));
    }

    #[test]
    fn test_model_prefix_is_not_doubled() {
        let setup = SetupConfigurator::new("models/gemini-2.0-flash-live-001").build();
        assert_eq!(setup.model(), "models/gemini-2.0-flash-live-001");
        assert!(setup.tools().is_empty());
        assert_eq!(setup.voice(), None);
    }
}
