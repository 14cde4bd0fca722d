use crate::audio::Transcription;
use crate::content::parts::Content;

/// `setupComplete` server message. Carries no data.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SetupComplete {}

/// `serverContent` server message
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_turn: Option<Content>,

    /// The model finished its turn.
    #[serde(default)]
    turn_complete: bool,

    /// The user barged in; pending model audio should be discarded.
    #[serde(default)]
    interrupted: bool,

    #[serde(default)]
    generation_complete: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    grounding_metadata: Option<GroundingMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_transcription: Option<Transcription>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_transcription: Option<Transcription>,
}

impl ServerContent {
    pub fn with_model_turn(mut self, content: Content) -> Self {
        self.model_turn = Some(content);
        self
    }

    pub fn with_turn_complete(mut self) -> Self {
        self.turn_complete = true;
        self
    }

    pub fn with_interrupted(mut self) -> Self {
        self.interrupted = true;
        self
    }

    pub fn with_grounding_metadata(mut self, metadata: GroundingMetadata) -> Self {
        self.grounding_metadata = Some(metadata);
        self
    }

    pub fn with_input_transcription(mut self, text: &str) -> Self {
        self.input_transcription = Some(Transcription::new(text));
        self
    }

    pub fn with_output_transcription(mut self, text: &str) -> Self {
        self.output_transcription = Some(Transcription::new(text));
        self
    }

    pub fn model_turn(&self) -> Option<&Content> {
        self.model_turn.as_ref()
    }

    pub fn turn_complete(&self) -> bool {
        self.turn_complete
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn generation_complete(&self) -> bool {
        self.generation_complete
    }

    pub fn grounding_metadata(&self) -> Option<&GroundingMetadata> {
        self.grounding_metadata.as_ref()
    }

    pub fn input_transcription(&self) -> Option<&Transcription> {
        self.input_transcription.as_ref()
    }

    pub fn output_transcription(&self) -> Option<&Transcription> {
        self.output_transcription.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

impl GroundingMetadata {
    pub fn new(grounding_chunks: Vec<GroundingChunk>) -> Self {
        Self { grounding_chunks }
    }

    pub fn grounding_chunks(&self) -> &[GroundingChunk] {
        &self.grounding_chunks
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    web: Option<WebChunk>,
}

impl GroundingChunk {
    pub fn web(uri: &str, title: &str) -> Self {
        Self {
            web: Some(WebChunk {
                uri: Some(uri.to_string()),
                title: Some(title.to_string()),
            }),
        }
    }

    pub fn as_web(&self) -> Option<&WebChunk> {
        self.web.as_ref()
    }
}

/// A web page the model used to ground its answer.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WebChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

impl WebChunk {
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

/// `goAway` server message: the server will close the connection soon.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_left: Option<String>,
}

impl GoAway {
    pub fn time_left(&self) -> Option<&str> {
        self.time_left.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,

    #[serde(default)]
    response_token_count: u32,

    #[serde(default)]
    total_token_count: u32,
}

impl UsageMetadata {
    pub fn new(prompt_token_count: u32, response_token_count: u32) -> Self {
        Self {
            prompt_token_count,
            response_token_count,
            total_token_count: prompt_token_count + response_token_count,
        }
    }

    pub fn prompt_token_count(&self) -> u32 {
        self.prompt_token_count
    }

    pub fn response_token_count(&self) -> u32 {
        self.response_token_count
    }

    pub fn total_token_count(&self) -> u32 {
        self.total_token_count
    }
}
