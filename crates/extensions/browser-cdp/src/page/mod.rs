//! Response-region selection.
//!
//! Each chat UI renders the assistant reply differently. A list of
//! [`PageExtractor`] strategies is tried in order; the first one that
//! recognizes the page and finds a non-blank region wins.
//!
//! The page's notice text, everything visible outside the conversation,
//! is rendered separately for the block detector.

mod render;
mod strategies;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use webask_protocols::PageLayout;

pub use render::{render_text, render_text_excluding};
pub use strategies::{GenericChatExtractor, PerplexityExtractor, QwenExtractor, RawPageExtractor};

/// Conversation turns, chat history and input fields. Error toasts and
/// interstitials live outside these.
static CONVERSATION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "nav, aside, textarea, input, [contenteditable], [role=\"textbox\"], \
         [data-message-author-role], [class*=\"chat-message\"], [class*=\"user-message\"], \
         [class*=\"message-item\"], [class*=\"chat-item\"], [class*=\"assistant\"], \
         [class*=\"chat-response\"], [class*=\"markdown\"], [class*=\"sidebar\"], \
         [class*=\"history\"], [class*=\"query\"], .prose, #response-content-container, \
         .bot-response, .ai-message, .response, .answer, .question",
    )
    .expect("valid built-in selector")
});

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid built-in selector"));

/// A response region found by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub text: String,
    /// Assistant turns on the page, when the strategy can tell them apart.
    pub turns: Option<usize>,
}

impl Region {
    pub fn new(text: impl Into<String>, turns: Option<usize>) -> Self {
        Self {
            text: text.into(),
            turns,
        }
    }
}

/// A captured page, parsed once for every strategy.
pub struct RenderedPage {
    url: String,
    text: String,
    document: Html,
}

impl RenderedPage {
    pub fn parse(url: &str, html: &str, text: &str) -> Self {
        Self {
            url: url.to_string(),
            text: text.to_string(),
            document: Html::parse_document(html),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Visible text of the whole page.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Visible text outside the conversation.
    pub fn notice_text(&self) -> String {
        let root = self
            .document
            .select(&BODY)
            .next()
            .unwrap_or_else(|| self.document.root_element());
        render_text_excluding(root, &CONVERSATION)
    }

    /// Elements matching `selector` that hold any non-whitespace text.
    pub fn count_nonblank(&self, selector: &Selector) -> usize {
        self.document
            .select(selector)
            .filter(|element| element.text().any(|t| !t.trim().is_empty()))
            .count()
    }

    /// Rendered text of the last element matching `selector` whose text is
    /// not blank, with the number of such elements as the turn count.
    pub fn last_match(&self, selector: &Selector) -> Option<Region> {
        self.last_match_where(selector, |_| true)
    }

    /// Like [`last_match`](Self::last_match), restricted to elements
    /// accepted by `keep`.
    pub fn last_match_where<F>(&self, selector: &Selector, keep: F) -> Option<Region>
    where
        F: Fn(ElementRef<'_>) -> bool,
    {
        let mut turns = 0;
        let mut last = None;
        for text in self
            .document
            .select(selector)
            .filter(|element| keep(*element))
            .map(render_text)
            .filter(|text| !text.trim().is_empty())
        {
            turns += 1;
            last = Some(text);
        }
        last.map(|text| Region::new(text, Some(turns)))
    }
}

/// One way of finding the assistant response on a page.
pub trait PageExtractor: Send + Sync {
    /// Layout reported on snapshots this strategy produced.
    fn layout(&self) -> PageLayout;

    /// Whether this strategy applies to the page at all.
    fn can_handle(&self, page: &RenderedPage) -> bool;

    /// The latest response, if one is present.
    fn extract(&self, page: &RenderedPage) -> Option<Region>;
}

/// Strategies in the order they are tried.
pub fn default_extractors() -> Vec<Box<dyn PageExtractor>> {
    vec![
        Box::new(QwenExtractor::new()),
        Box::new(PerplexityExtractor::new()),
        Box::new(GenericChatExtractor::new()),
        Box::new(RawPageExtractor::default()),
    ]
}

/// Run `extractors` in order and return the first region found.
pub fn select_response(
    page: &RenderedPage,
    extractors: &[Box<dyn PageExtractor>],
) -> Option<(PageLayout, Region)> {
    extractors
        .iter()
        .filter(|extractor| extractor.can_handle(page))
        .find_map(|extractor| {
            extractor
                .extract(page)
                .filter(|region| !region.text.trim().is_empty())
                .map(|region| (extractor.layout(), region))
        })
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
