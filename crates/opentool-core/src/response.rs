//! Tool results and catalog descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The payload of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Plain text for the calling agent
    Text { text: String },

    /// Structured JSON
    Json { value: Value },

    /// Binary payload, base64 encoded
    File {
        data: String,
        mime_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        size: usize,
    },

    /// The call was not executed; the caller must confirm first
    ConfirmationRequired { tool: String, message: String },

    /// Not a final result; continue with `resume_token`
    Partial { text: String, resume_token: String },
}

/// Tool execution response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub output: ToolOutput,

    #[serde(default)]
    pub is_error: bool,

    /// Input schema echoed back so the caller can correct its arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    /// Arguments the call was made with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Suggested follow-up commands such as `list` or `schema <tool>`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
}

impl ToolResponse {
    pub fn new(output: ToolOutput) -> Self {
        Self {
            output,
            is_error: false,
            schema: None,
            arguments: None,
            usage: None,
            next_steps: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ToolOutput::Text { text: text.into() })
    }

    pub fn json(value: Value) -> Self {
        Self::new(ToolOutput::Json { value })
    }

    /// A text result flagged as an error
    pub fn error_text(text: impl Into<String>) -> Self {
        Self::text(text).with_error(true)
    }

    pub fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_next_step(mut self, step: impl Into<String>) -> Self {
        self.next_steps.push(step.into());
        self
    }

    /// Text carried by text-like outputs
    pub fn text_content(&self) -> Option<&str> {
        match &self.output {
            ToolOutput::Text { text } | ToolOutput::Partial { text, .. } => Some(text.as_str()),
            ToolOutput::ConfirmationRequired { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.output, ToolOutput::Partial { .. })
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self.output, ToolOutput::ConfirmationRequired { .. })
    }
}

/// Behavioral hints describing a tool to the calling agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Annotations for a tool that only reads local catalog data
    pub fn read_only(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(false),
        }
    }
}

/// Machine-readable description of one registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

impl ToolDescriptor {
    /// Descriptor for a tool whose input is an empty object
    pub fn without_arguments(
        name: impl Into<String>,
        description: impl Into<String>,
        annotations: ToolAnnotations,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
            annotations,
        }
    }

    pub fn from_tool(tool: &dyn crate::Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.schema(),
            annotations: tool.annotations(),
        }
    }
}
