use crate::audio::Blob;
use crate::tools::FunctionResponse;

/// `realtimeInput` client message
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    media_chunks: Vec<Blob>,
}

impl RealtimeInput {
    pub fn new(media_chunks: Vec<Blob>) -> Self {
        Self { media_chunks }
    }

    pub fn media_chunks(&self) -> &[Blob] {
        &self.media_chunks
    }
}

/// `toolResponse` client message
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    function_responses: Vec<FunctionResponse>,
}

impl ToolResponse {
    pub fn new(function_responses: Vec<FunctionResponse>) -> Self {
        Self { function_responses }
    }

    pub fn function_responses(&self) -> &[FunctionResponse] {
        &self.function_responses
    }
}
