//! Structured-answer extraction.
//!
//! Recovers JSON objects from assistant reply text in layers:
//!
//! 1. fenced code blocks (```` ```json ````, ```` ``` ````, `~~~`)
//! 2. balanced-brace substrings anywhere in the text
//! 3. the full page text as unstructured fallback
//!
//! Each candidate gets one strict parse and one parse after light repair
//! (trailing commas, typographic quotes). Candidates that still fail are
//! skipped. Extraction is pure: the same input always yields the same
//! result, and nothing here can fail.

mod braces;
mod fence;
mod repair;

use serde_json::Value;
use tracing::debug;

use webask_protocols::{ExtractionMode, ExtractionResult, ExtractionSource, JsonObject, Snapshot};

/// Caller preferences for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub mode: ExtractionMode,
    /// Keys to keep in each object; empty keeps every key.
    pub fields: Vec<String>,
    /// Accept fallback text when no object is recovered.
    pub allow_fallback: bool,
}

impl ExtractOptions {
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }
}

/// Layered JSON recovery.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract from arbitrary text. Fallback text is `text` itself.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        self.extract_structured(text)
            .unwrap_or_else(|| ExtractionResult::fallback(text))
    }

    /// Extract from a snapshot.
    ///
    /// The response region is tried first, then the whole page text. The
    /// fallback is always the whole page text.
    pub fn extract_snapshot(&self, snapshot: &Snapshot) -> ExtractionResult {
        if let Some(region) = snapshot.response_text.as_deref() {
            if let Some(result) = self.extract_structured(region) {
                return result;
            }
            debug!(layout = ?snapshot.layout, "No JSON in response region, scanning page text");
        }
        self.extract(&snapshot.raw_text)
    }

    /// Whether `result` is an acceptable answer under these options.
    pub fn accepts(&self, result: &ExtractionResult) -> bool {
        if !result.is_empty() {
            return true;
        }
        self.options.allow_fallback
            && result
                .fallback_text
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
    }

    fn extract_structured(&self, text: &str) -> Option<ExtractionResult> {
        let fenced = self.finish(objects_from_fences(text));
        if !fenced.is_empty() {
            return Some(ExtractionResult::structured(fenced, ExtractionSource::FencedBlock));
        }

        let braced = self.finish(objects_from_braces(text));
        if !braced.is_empty() {
            return Some(ExtractionResult::structured(braced, ExtractionSource::BalancedBraces));
        }

        None
    }

    /// Apply field filtering and mode selection.
    fn finish(&self, objects: Vec<JsonObject>) -> Vec<JsonObject> {
        let mut objects: Vec<JsonObject> = if self.options.fields.is_empty() {
            objects
        } else {
            objects
                .into_iter()
                .filter_map(|object| self.filter_fields(object))
                .collect()
        };

        if self.options.mode == ExtractionMode::Last && objects.len() > 1 {
            objects.drain(..objects.len() - 1);
        }
        objects
    }

    fn filter_fields(&self, object: JsonObject) -> Option<JsonObject> {
        let filtered: JsonObject = object
            .into_iter()
            .filter(|(key, _)| self.options.fields.iter().any(|f| f == key))
            .collect();
        (!filtered.is_empty()).then_some(filtered)
    }
}

fn objects_from_fences(text: &str) -> Vec<JsonObject> {
    let mut objects = Vec::new();

    for block in fence::fenced_blocks(text) {
        if !block.is_json_candidate() {
            continue;
        }
        match repair::parse_lenient(block.body.trim()) {
            Some(Value::Object(map)) => objects.push(map),
            Some(Value::Array(items)) => {
                objects.extend(items.into_iter().filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                }));
            }
            Some(_) => {}
            // Commentary around the JSON inside the fence.
            None => objects.extend(objects_from_braces(&block.body)),
        }
    }

    objects
}

/// Bytes of nested retries allowed per byte of text.
const NESTED_PARSE_BUDGET: usize = 4;

/// Objects from balanced-brace spans, outermost first.
///
/// Spans inside a recovered object are skipped. When a span fails to
/// parse, the spans nested in it are tried in turn; those retries share a
/// byte budget proportional to the text so deeply nested junk stays
/// linear. Top-level spans are disjoint and always tried.
fn objects_from_braces(text: &str) -> Vec<JsonObject> {
    let mut objects = Vec::new();
    let mut covered = 0;
    let mut outer_end = 0;
    let mut budget = text.len().saturating_mul(NESTED_PARSE_BUDGET);
    let mut skipped = 0usize;

    for (start, end) in braces::balanced_spans(text) {
        if start < covered {
            continue;
        }
        let nested = start < outer_end;
        outer_end = outer_end.max(end);
        if nested {
            let len = end - start;
            if len > budget {
                skipped += 1;
                continue;
            }
            budget -= len;
        }

        if let Some(Value::Object(map)) = repair::parse_lenient(&text[start..end]) {
            objects.push(map);
            covered = end;
        }
    }

    if skipped > 0 {
        debug!(skipped, "Nested brace retries over budget");
    }
    objects
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
