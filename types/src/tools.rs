use serde_json::{Map, Value};

/// A capability attached to the session at setup time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    GoogleSearch(GoogleSearch),
    FunctionDeclarations(Vec<FunctionDeclaration>),
}

/// Grounding through web search. Serialized as an empty object.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionDeclaration {
    /// The name of the function
    name: String,

    /// The description of the function
    description: String,

    /// The parameters of the function in OpenAPI schema format
    parameters: Value,
}

impl FunctionDeclaration {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    name: String,

    #[serde(default)]
    args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: &str, args: Map<String, Value>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            args,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }
}

/// The result of one [`FunctionCall`], attributed to the function by name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    name: String,

    response: Value,
}

impl FunctionResponse {
    pub fn new(name: &str, response: Value) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            response,
        }
    }

    pub fn with_id(mut self, id: Option<&str>) -> Self {
        self.id = id.map(str::to_string);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn response(&self) -> &Value {
        &self.response
    }

    /// The `error` field of the response, when the call failed.
    pub fn error(&self) -> Option<&str> {
        self.response.get("error").and_then(Value::as_str)
    }
}

/// `toolCall` server message
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    function_calls: Vec<FunctionCall>,
}

impl ToolCall {
    pub fn new(function_calls: Vec<FunctionCall>) -> Self {
        Self { function_calls }
    }

    pub fn function_calls(&self) -> &[FunctionCall] {
        &self.function_calls
    }
}

/// `toolCallCancellation` server message
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallCancellation {
    #[serde(default)]
    ids: Vec<String>,
}

impl ToolCallCancellation {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_wire_format() {
        let tools = vec![
            Tool::GoogleSearch(GoogleSearch::default()),
            Tool::FunctionDeclarations(vec![FunctionDeclaration::new(
                "get_current_weather",
                "Get the current weather in a given location",
                json!({"type": "OBJECT"}),
            )]),
        ];
        let value = serde_json::to_value(&tools).unwrap();
        assert_eq!(
            value,
            json!([
                {"googleSearch": {}},
                {"functionDeclarations": [{
                    "name": "get_current_weather",
                    "description": "Get the current weather in a given location",
                    "parameters": {"type": "OBJECT"}
                }]}
            ])
        );
    }

    #[test]
    fn test_function_call_without_args() {
        let call: FunctionCall = serde_json::from_str(r#"{"id":"c1","name":"frobnicate"}"#).unwrap();
        assert_eq!(call.id(), Some("c1"));
        assert_eq!(call.name(), "frobnicate");
        assert!(call.args().is_empty());
    }

    #[test]
    fn test_function_response_error() {
        let response = FunctionResponse::new("frobnicate", json!({"error": "Function frobnicate not found."}));
        assert_eq!(response.error(), Some("Function frobnicate not found."));
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"name":"frobnicate","response":{"error":"Function frobnicate not found."}}"#);
    }
}
