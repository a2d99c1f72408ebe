//! Browser target types.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

/// Opaque locator for one browser tab.
///
/// Adapters fill in whatever identifiers they need to re-activate and
/// query the tab later; the engine never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabHandle {
    /// Window identifier (adapter-specific).
    pub window_id: String,
    /// Tab identifier (adapter-specific, e.g. a CDP target id).
    pub tab_id: String,
    /// Current URL of the tab at enumeration time.
    pub url: String,
    /// Tab title at enumeration time.
    #[serde(default)]
    pub title: String,
}

impl TabHandle {
    pub fn new(
        window_id: impl Into<String>,
        tab_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            window_id: window_id.into(),
            tab_id: tab_id.into(),
            url: url.into(),
            title: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// A browser window and its tabs, in native tab order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserWindow {
    pub id: String,
    pub tabs: Vec<TabHandle>,
}

/// Predicate matched against a tab's current URL.
///
/// Parsed from a string: a `re:` prefix selects a regular expression,
/// anything else is a plain substring match.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    Substring(String),
    Regex(Regex),
}

impl UrlPattern {
    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        match pattern.strip_prefix("re:") {
            Some(expr) => Ok(Self::Regex(Regex::new(expr)?)),
            None => Ok(Self::Substring(pattern.to_string())),
        }
    }

    /// Whether `url` satisfies this pattern.
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Substring(needle) => url.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(url),
        }
    }

    /// The pattern as it was written.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Substring(needle) => needle,
            Self::Regex(re) => re.as_str(),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(needle) => write!(f, "{}", needle),
            Self::Regex(re) => write!(f, "re:{}", re.as_str()),
        }
    }
}

impl Serialize for UrlPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One browser tab matched against the target pattern.
///
/// Created by the target locator and borrowed by every other component for
/// the duration of a run.
#[derive(Debug, Clone)]
pub struct Session {
    pub target_url_pattern: UrlPattern,
    pub handle: TabHandle,
    pub focused: bool,
}

impl Session {
    pub fn new(target_url_pattern: UrlPattern, handle: TabHandle) -> Self {
        Self {
            target_url_pattern,
            handle,
            focused: false,
        }
    }
}
