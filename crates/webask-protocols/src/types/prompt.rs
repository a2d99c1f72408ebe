//! Prompt submitted to the chat interface.

use serde::{Deserialize, Serialize};

/// Text submitted to the assistant. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format_hints: Option<String>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format_hints: None,
        }
    }

    /// Attach a free-form formatting instruction appended on submit.
    pub fn with_format_hints(mut self, hints: impl Into<String>) -> Self {
        self.format_hints = Some(hints.into());
        self
    }

    /// Ask for a JSON answer carrying `fields`.
    ///
    /// The instruction is not repeated if the text already ends with it.
    pub fn with_json_fields(text: impl Into<String>, fields: &[String]) -> Self {
        let text = text.into();
        let instruction = json_instruction(fields);
        if fields.is_empty() || text.trim_end().ends_with(instruction.trim()) {
            return Self::new(text);
        }
        Self::new(text).with_format_hints(instruction)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format_hints(&self) -> Option<&str> {
        self.format_hints.as_deref()
    }

    /// The exact text typed into the chat input.
    pub fn rendered(&self) -> String {
        match &self.format_hints {
            Some(hints) if hints.starts_with(' ') => format!("{}{}", self.text, hints),
            Some(hints) => format!("{} {}", self.text, hints),
            None => self.text.clone(),
        }
    }
}

fn json_instruction(fields: &[String]) -> String {
    format!(" Return in well-ordered JSON with fields: {}", fields.join(","))
}
