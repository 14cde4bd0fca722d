pub mod client;
pub mod server;

pub use client::*;
pub use server::*;

/// Messages the client writes to the socket. Exactly one top-level key per frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(crate::session::Setup),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
}

impl ClientMessage {
    /// Wraps a single media chunk (audio or video frame) as realtime input.
    pub fn realtime_media(blob: crate::Blob) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput::new(vec![blob]))
    }

    pub fn tool_response(response: crate::tools::FunctionResponse) -> Self {
        ClientMessage::ToolResponse(ToolResponse::new(vec![response]))
    }
}

/// Messages the server writes to the socket.
///
/// Unlike the client side this is not a tagged union: a single frame can
/// carry several of these fields at once, so each one is optional.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    setup_complete: Option<SetupComplete>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_content: Option<ServerContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call: Option<crate::tools::ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_cancellation: Option<crate::tools::ToolCallCancellation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    go_away: Option<GoAway>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage_metadata: Option<UsageMetadata>,
}

impl ServerMessage {
    pub fn setup_complete() -> Self {
        Self {
            setup_complete: Some(SetupComplete {}),
            ..Default::default()
        }
    }

    pub fn from_content(content: ServerContent) -> Self {
        Self {
            server_content: Some(content),
            ..Default::default()
        }
    }

    pub fn from_tool_call(tool_call: crate::tools::ToolCall) -> Self {
        Self {
            tool_call: Some(tool_call),
            ..Default::default()
        }
    }

    pub fn with_usage_metadata(mut self, usage: UsageMetadata) -> Self {
        self.usage_metadata = Some(usage);
        self
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    pub fn server_content(&self) -> Option<&ServerContent> {
        self.server_content.as_ref()
    }

    pub fn tool_call(&self) -> Option<&crate::tools::ToolCall> {
        self.tool_call.as_ref()
    }

    pub fn tool_call_cancellation(&self) -> Option<&crate::tools::ToolCallCancellation> {
        self.tool_call_cancellation.as_ref()
    }

    pub fn go_away(&self) -> Option<&GoAway> {
        self.go_away.as_ref()
    }

    pub fn usage_metadata(&self) -> Option<&UsageMetadata> {
        self.usage_metadata.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FunctionResponse, ToolCall};
    use crate::Blob;
    use serde_json::json;

    #[test]
    fn test_realtime_input_wire_format() {
        let message = ClientMessage::realtime_media(Blob::pcm(16000, "AAA=".to_string()));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"realtimeInput": {"mediaChunks": [{"mimeType": "audio/pcm;rate=16000", "data": "AAA="}]}})
        );
    }

    #[test]
    fn test_tool_response_wire_format() {
        let response = FunctionResponse::new("get_current_weather", json!({"weather": "sunny"})).with_id(Some("call-1"));
        let value = serde_json::to_value(ClientMessage::tool_response(response)).unwrap();
        assert_eq!(
            value,
            json!({"toolResponse": {"functionResponses": [
                {"id": "call-1", "name": "get_current_weather", "response": {"weather": "sunny"}}
            ]}})
        );
    }

    #[test]
    fn test_parse_setup_complete() {
        let message: ServerMessage = serde_json::from_str(r#"{"setupComplete":{}}"#).unwrap();
        assert!(message.is_setup_complete());
        assert!(message.server_content().is_none());
    }

    #[test]
    fn test_parse_model_turn() {
        let json = r#"{
            "serverContent": {
                "modelTurn": {"parts": [
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}},
                    {"text": "hello"}
                ]},
                "outputTranscription": {"text": "Hello"},
                "groundingMetadata": {"groundingChunks": [{"web": {"uri": "https://example.com", "title": "Example"}}]}
            },
            "usageMetadata": {"promptTokenCount": 10, "responseTokenCount": 4, "totalTokenCount": 14}
        }"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let content = message.server_content().unwrap();
        let parts = content.model_turn().unwrap().parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_inline_data().unwrap().sample_rate(), Some(24000));
        assert_eq!(parts[1].as_text(), Some("hello"));
        assert!(!content.turn_complete());
        assert!(!content.interrupted());
        assert_eq!(content.output_transcription().unwrap().text(), "Hello");
        let web = content.grounding_metadata().unwrap().grounding_chunks()[0].as_web().unwrap();
        assert_eq!(web.uri(), Some("https://example.com"));
        assert_eq!(web.title(), Some("Example"));
        assert_eq!(message.usage_metadata().unwrap().total_token_count(), 14);
    }

    #[test]
    fn test_parse_tool_call_and_unknown_fields() {
        let json = r#"{"toolCall":{"functionCalls":[{"id":"1","name":"draw_chart","args":{"type":"bar"}}]},"somethingNew":{}}"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let call = &message.tool_call().unwrap().function_calls()[0];
        assert_eq!(call.name(), "draw_chart");
        assert_eq!(call.args()["type"], "bar");
        assert_eq!(message, ServerMessage::from_tool_call(ToolCall::new(vec![call.clone()])));
    }
}
