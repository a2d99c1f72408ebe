//! Structured answers recovered from page text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A recovered JSON object.
pub type JsonObject = Map<String, Value>;

/// Which recovered objects the caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Only the last recovered object.
    #[default]
    Last,
    /// Every recovered object, in order of appearance.
    All,
}

/// Layer of the extraction strategy that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    FencedBlock,
    BalancedBraces,
    Fallback,
}

/// Outcome of one extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub objects: Vec<JsonObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_text: Option<String>,
    pub source: ExtractionSource,
}

impl ExtractionResult {
    pub fn structured(objects: Vec<JsonObject>, source: ExtractionSource) -> Self {
        Self {
            objects,
            fallback_text: None,
            source,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            objects: Vec::new(),
            fallback_text: Some(text.into()),
            source: ExtractionSource::Fallback,
        }
    }

    /// No structured object was recovered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Render the result the way callers print it: one object in `Last`
    /// mode, an array in `All` mode, or the fallback text wrapped in an object.
    pub fn to_output(&self, mode: ExtractionMode) -> Value {
        if self.objects.is_empty() {
            let text = self.fallback_text.clone().unwrap_or_default();
            return serde_json::json!({ "fallback_text": text });
        }
        match mode {
            ExtractionMode::Last => self
                .objects
                .last()
                .cloned()
                .map(Value::Object)
                .unwrap_or(Value::Null),
            ExtractionMode::All => Value::Array(
                self.objects.iter().cloned().map(Value::Object).collect(),
            ),
        }
    }
}
