//! Page observations and their classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which page-extractor strategy produced a snapshot's response region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    Qwen,
    Perplexity,
    Generic,
    #[default]
    Raw,
}

/// One immutable observation of the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Full visible text of the page.
    pub raw_text: String,
    /// Full serialized HTML of the page.
    pub raw_html: String,
    pub captured_at: DateTime<Utc>,
    pub url: String,
    /// Text of the latest assistant response, when a layout strategy found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default)]
    pub layout: PageLayout,
    /// Number of assistant turns the layout strategy saw on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turns: Option<usize>,
    /// Page text outside the conversation: banners, toasts, interstitials.
    /// Block phrases are matched here so prompts and replies quoting them
    /// do not count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_text: Option<String>,
}

impl Snapshot {
    /// Build a snapshot stamped with the current time.
    pub fn new(url: impl Into<String>, raw_text: impl Into<String>, raw_html: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            raw_html: raw_html.into(),
            captured_at: Utc::now(),
            url: url.into(),
            response_text: None,
            layout: PageLayout::Raw,
            turns: None,
            notice_text: None,
        }
    }

    pub fn with_response(mut self, layout: PageLayout, text: impl Into<String>) -> Self {
        self.layout = layout;
        self.response_text = Some(text.into());
        self
    }

    pub fn with_turns(mut self, turns: usize) -> Self {
        self.turns = Some(turns);
        self
    }

    pub fn with_notice_text(mut self, text: impl Into<String>) -> Self {
        self.notice_text = Some(text.into());
        self
    }

    /// Text the completion heuristic and extractor work on: the response
    /// region when known, otherwise the whole page text.
    pub fn content_text(&self) -> &str {
        self.response_text.as_deref().unwrap_or(&self.raw_text)
    }

    /// Whether the response region carries any non-whitespace text.
    pub fn has_response(&self) -> bool {
        self.response_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

/// Classification of a snapshot with respect to anti-automation friction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockVerdict {
    Clear,
    ChallengePresent,
    RateLimited,
    Unknown,
}

impl BlockVerdict {
    /// Terminal verdicts end the current attempt immediately.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ChallengePresent | Self::RateLimited)
    }
}

impl std::fmt::Display for BlockVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Clear => "clear",
            Self::ChallengePresent => "challenge_present",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
