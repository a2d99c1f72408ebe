//! CAPTCHA and rate-limit detection.
//!
//! Classifies a snapshot by scanning for known anti-automation markers.
//! Widget markers (patterns without whitespace) are searched in the page
//! HTML. Challenge and rate-limit phrasing is searched in the page's notice
//! text, the visible text outside the conversation, so a prompt or reply
//! that quotes "too many requests" never reads as a block. Snapshots that
//! carry no notice text fall back to the whole visible text unless a
//! conversation layout found the reply, in which case phrasing is not
//! scanned at all.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use tracing::debug;

use webask_protocols::{BlockVerdict, PageLayout, Snapshot};

use crate::error::DetectorError;

/// Challenge widget markers and "verify you are human" phrasing.
pub const DEFAULT_CHALLENGE_PATTERNS: &[&str] = &[
    // Widgets
    "www.google.com/recaptcha/",
    "recaptcha/api2/anchor",
    "recaptcha/enterprise/",
    "g-recaptcha",
    "hcaptcha.com/captcha",
    "newassets.hcaptcha.com",
    "data-hcaptcha-widget-id",
    "challenges.cloudflare.com",
    "cf-turnstile",
    "cf-challenge",
    "cf_chl_opt",
    "geetest_widget",
    "captcha-delivery.com",
    "arkoselabs.com",
    // Phrasing
    "verifying you are human",
    "verify you are human",
    "please verify you are a human",
    "checking your browser before accessing",
    "checking if the site connection is secure",
    "review the security of your connection",
    "prove you are human",
    "are you a robot",
    "unusual traffic from your computer network",
    "press & hold to confirm you are",
];

/// Rate-limit and quota phrasing.
pub const DEFAULT_RATE_LIMIT_PATTERNS: &[&str] = &[
    "too many requests",
    "rate limit exceeded",
    "you have been rate limited",
    "you've reached the current usage cap",
    "you've reached your limit",
    "you have reached your daily limit",
    "request limit reached",
    "please try again later",
    "429 too many",
    "error 1015",
];

/// Marker-based snapshot classifier.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    widgets: Option<Matcher>,
    challenge_phrases: Option<Matcher>,
    rate_limit: Option<Matcher>,
}

#[derive(Debug, Clone)]
struct Matcher {
    automaton: AhoCorasick,
    patterns: Vec<String>,
}

impl Matcher {
    fn build(patterns: &[String]) -> Result<Option<Self>, DetectorError> {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if patterns.is_empty() {
            return Ok(None);
        }
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .map_err(|e| DetectorError::InvalidPatterns(e.to_string()))?;
        Ok(Some(Self {
            automaton,
            patterns,
        }))
    }

    fn find(&self, haystack: &str) -> Option<&str> {
        self.automaton
            .find(haystack)
            .map(|m| self.patterns[m.pattern().as_usize()].as_str())
    }
}

impl BlockDetector {
    /// Build a detector from explicit pattern lists. An empty list disables
    /// that class of detection.
    ///
    /// Challenge patterns without whitespace are widget markers, matched in
    /// the HTML; the rest are phrases, matched in the notice text.
    pub fn new(
        challenge_patterns: &[String],
        rate_limit_patterns: &[String],
    ) -> Result<Self, DetectorError> {
        let (widgets, phrases): (Vec<String>, Vec<String>) = challenge_patterns
            .iter()
            .map(|p| p.trim().to_string())
            .partition(|p| !p.contains(char::is_whitespace));
        Ok(Self {
            widgets: Matcher::build(&widgets)?,
            challenge_phrases: Matcher::build(&phrases)?,
            rate_limit: Matcher::build(rate_limit_patterns)?,
        })
    }

    /// Default markers.
    pub fn with_defaults() -> Self {
        let challenge = to_owned(DEFAULT_CHALLENGE_PATTERNS);
        let rate_limit = to_owned(DEFAULT_RATE_LIMIT_PATTERNS);
        Self::new(&challenge, &rate_limit).expect("valid default block patterns")
    }

    /// Classify one snapshot.
    ///
    /// Precedence: challenge, then rate limit, then `Clear` when an
    /// assistant response region is present, else `Unknown`.
    pub fn classify(&self, snapshot: &Snapshot) -> BlockVerdict {
        if let Some(marker) = self.challenge_marker(snapshot) {
            debug!(marker, url = %snapshot.url, "Challenge marker found");
            return BlockVerdict::ChallengePresent;
        }

        if let Some(marker) = self.rate_limit_marker(snapshot) {
            debug!(marker, url = %snapshot.url, "Rate-limit marker found");
            return BlockVerdict::RateLimited;
        }

        if snapshot.has_response() {
            BlockVerdict::Clear
        } else {
            BlockVerdict::Unknown
        }
    }

    /// The first challenge marker present in the snapshot.
    pub fn challenge_marker(&self, snapshot: &Snapshot) -> Option<&str> {
        let widget = self
            .widgets
            .as_ref()
            .and_then(|m| m.find(&snapshot.raw_html));
        widget.or_else(|| self.challenge_phrases.as_ref()?.find(notice_text(snapshot)?))
    }

    /// The first rate-limit phrase in the snapshot's notice text.
    pub fn rate_limit_marker(&self, snapshot: &Snapshot) -> Option<&str> {
        self.rate_limit.as_ref()?.find(notice_text(snapshot)?)
    }
}

/// Text scanned for block phrasing, `None` when there is nothing safe to
/// scan.
fn notice_text(snapshot: &Snapshot) -> Option<&str> {
    if let Some(text) = &snapshot.notice_text {
        return Some(text);
    }
    if snapshot.has_response() && snapshot.layout != PageLayout::Raw {
        return None;
    }
    Some(&snapshot.raw_text)
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Owned copy of a static pattern list.
pub fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str, html: &str) -> Snapshot {
        Snapshot::new("https://chat.qwen.ai/", text, html)
    }

    #[test]
    fn test_clear_with_response() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot("The answer is Paris", "<div>The answer is Paris</div>")
            .with_response(PageLayout::Qwen, "The answer is Paris");
        assert_eq!(detector.classify(&snap), BlockVerdict::Clear);
    }

    #[test]
    fn test_unknown_without_response() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot("New chat", "<div>New chat</div>");
        assert_eq!(detector.classify(&snap), BlockVerdict::Unknown);
    }

    #[test]
    fn test_challenge_in_html() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot(
            "",
            r#"<iframe src="https://www.google.com/recaptcha/api2/anchor?k=x"></iframe>"#,
        );
        assert_eq!(detector.classify(&snap), BlockVerdict::ChallengePresent);
    }

    #[test]
    fn test_challenge_phrase_case_insensitive() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot("Verify You Are Human by completing the action below.", "");
        assert_eq!(detector.classify(&snap), BlockVerdict::ChallengePresent);
        assert_eq!(detector.challenge_marker(&snap), Some("verify you are human"));
    }

    #[test]
    fn test_challenge_beats_rate_limit_and_response() {
        let notice = "Too many requests. Checking your browser before accessing.";
        let detector = BlockDetector::with_defaults();
        let snap = snapshot(notice, "")
            .with_response(PageLayout::Generic, "partial answer")
            .with_notice_text(notice);
        assert_eq!(detector.classify(&snap), BlockVerdict::ChallengePresent);
    }

    #[test]
    fn test_rate_limit_toast_beside_reply() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot("old answer\nToo Many Requests - please slow down", "")
            .with_response(PageLayout::Generic, "old answer")
            .with_notice_text("Too Many Requests - please slow down");
        assert_eq!(detector.classify(&snap), BlockVerdict::RateLimited);
    }

    #[test]
    fn test_rate_limit_phrase_in_conversation_is_clear() {
        let detector = BlockDetector::with_defaults();
        let text = "What does HTTP 429 Too Many Requests mean?\n\
                    {\"answer\": \"The server asks you to try again later.\"}";
        let reply = "{\"answer\": \"The server asks you to try again later.\"}";
        let quoted = snapshot(text, "").with_response(PageLayout::Generic, reply);
        assert_eq!(detector.classify(&quoted), BlockVerdict::Clear);

        let with_notice = quoted.clone().with_notice_text("New chat");
        assert_eq!(detector.classify(&with_notice), BlockVerdict::Clear);
    }

    #[test]
    fn test_challenge_phrase_in_reply_is_clear() {
        let detector = BlockDetector::with_defaults();
        let reply = "A CAPTCHA asks: are you a robot? Then: verify you are human.";
        let snap = snapshot(reply, "<div class=\"prose\"></div>")
            .with_response(PageLayout::Perplexity, reply)
            .with_notice_text("");
        assert_eq!(detector.classify(&snap), BlockVerdict::Clear);
    }

    #[test]
    fn test_raw_layout_still_scans_page_text() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot("Rate limit exceeded", "")
            .with_response(PageLayout::Raw, "Rate limit exceeded");
        assert_eq!(detector.classify(&snap), BlockVerdict::RateLimited);
    }

    #[test]
    fn test_rate_limit_ignores_html() {
        let detector = BlockDetector::with_defaults();
        let snap = snapshot(
            "Hello",
            r#"<script>const msg = "too many requests";</script>"#,
        );
        assert_eq!(detector.classify(&snap), BlockVerdict::Unknown);
    }

    #[test]
    fn test_custom_patterns() {
        let detector =
            BlockDetector::new(&["access denied".to_string()], &["slow down".to_string()]).unwrap();
        assert_eq!(
            detector.classify(&snapshot("Access Denied", "")),
            BlockVerdict::ChallengePresent
        );
        assert_eq!(
            detector.classify(&snapshot("please SLOW DOWN", "")),
            BlockVerdict::RateLimited
        );
        // Defaults are replaced, not merged.
        assert_eq!(
            detector.classify(&snapshot("verify you are human", "")),
            BlockVerdict::Unknown
        );
    }

    #[test]
    fn test_custom_widget_marker_matches_html_only() {
        let detector = BlockDetector::new(&["px-captcha".to_string()], &[]).unwrap();
        let widget = snapshot("", r#"<div id="px-captcha"></div>"#);
        assert_eq!(detector.classify(&widget), BlockVerdict::ChallengePresent);
        let mentioned = snapshot("what is px-captcha?", "");
        assert_eq!(detector.classify(&mentioned), BlockVerdict::Unknown);
    }

    #[test]
    fn test_empty_pattern_lists_disable_detection() {
        let detector = BlockDetector::new(&[], &["  ".to_string()]).unwrap();
        let snap = snapshot("verify you are human, too many requests", "g-recaptcha");
        assert_eq!(detector.classify(&snap), BlockVerdict::Unknown);
    }
}
