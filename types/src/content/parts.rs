use crate::audio::Blob;
use crate::tools::FunctionCall;

/// A role-tagged list of parts, as used for system instructions and model turns.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,

    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { role: None, parts }
    }

    /// A single text part without a role, the shape of a system instruction.
    pub fn from_text(text: &str) -> Self {
        Self::new(vec![Part::text(text)])
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Inline media, e.g. a chunk of model speech.
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,

    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn inline_data(blob: Blob) -> Self {
        Self {
            inline_data: Some(blob),
            ..Default::default()
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Default::default()
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn as_inline_data(&self) -> Option<&Blob> {
        self.inline_data.as_ref()
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        self.function_call.as_ref()
    }
}
