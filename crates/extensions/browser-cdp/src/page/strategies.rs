//! Built-in page extractor strategies.

use scraper::Selector;
use webask_protocols::PageLayout;

use super::{PageExtractor, Region, RenderedPage};

/// Characters of page text kept by [`RawPageExtractor`].
pub const RAW_TAIL_CHARS: usize = 4000;

fn selectors(sources: &[&str]) -> Vec<Selector> {
    sources
        .iter()
        .map(|source| Selector::parse(source).expect("valid built-in selector"))
        .collect()
}

/// chat.qwen.ai
pub struct QwenExtractor {
    selectors: Vec<Selector>,
}

impl QwenExtractor {
    pub fn new() -> Self {
        Self {
            selectors: selectors(&[
                "#response-content-container",
                ".markdown-content-container",
                ".chat-response-message",
            ]),
        }
    }
}

impl Default for QwenExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor for QwenExtractor {
    fn layout(&self) -> PageLayout {
        PageLayout::Qwen
    }

    fn can_handle(&self, page: &RenderedPage) -> bool {
        page.url().contains("qwen.ai")
    }

    /// The response container id is usually unique, so turns are the
    /// largest count any of the selectors sees.
    fn extract(&self, page: &RenderedPage) -> Option<Region> {
        let region = self.selectors.iter().find_map(|s| page.last_match(s))?;
        let turns = self
            .selectors
            .iter()
            .map(|s| page.count_nonblank(s))
            .max()
            .unwrap_or(0);
        Some(Region::new(region.text, Some(turns)))
    }
}

/// perplexity.ai
pub struct PerplexityExtractor {
    prose: Selector,
}

impl PerplexityExtractor {
    pub fn new() -> Self {
        Self {
            prose: Selector::parse(".prose").expect("valid built-in selector"),
        }
    }
}

impl Default for PerplexityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor for PerplexityExtractor {
    fn layout(&self) -> PageLayout {
        PageLayout::Perplexity
    }

    fn can_handle(&self, page: &RenderedPage) -> bool {
        page.url().contains("perplexity.ai")
    }

    fn extract(&self, page: &RenderedPage) -> Option<Region> {
        page.last_match(&self.prose)
    }
}

/// Any chat UI that marks assistant turns with common attributes or class
/// names.
pub struct GenericChatExtractor {
    conversational: Selector,
    assistant_class: Selector,
    message_class: Selector,
}

impl GenericChatExtractor {
    pub fn new() -> Self {
        Self {
            conversational: Selector::parse(
                "[data-message-author-role=\"assistant\"], .chat-item-assistant, .assistant, \
                 .bot-response, .ai-message, .response, .answer",
            )
            .expect("valid built-in selector"),
            assistant_class: Selector::parse("[class*=\"assistant\"]")
                .expect("valid built-in selector"),
            message_class: Selector::parse("[class*=\"message\"]")
                .expect("valid built-in selector"),
        }
    }
}

impl Default for GenericChatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor for GenericChatExtractor {
    fn layout(&self) -> PageLayout {
        PageLayout::Generic
    }

    fn can_handle(&self, _page: &RenderedPage) -> bool {
        true
    }

    fn extract(&self, page: &RenderedPage) -> Option<Region> {
        page.last_match(&self.conversational)
            .or_else(|| page.last_match(&self.assistant_class))
            .or_else(|| {
                page.last_match_where(&self.message_class, |element| {
                    !element
                        .value()
                        .attr("class")
                        .is_some_and(|class| class.to_ascii_lowercase().contains("user"))
                })
            })
    }
}

/// Last resort: the tail of the visible page text.
pub struct RawPageExtractor {
    tail_chars: usize,
}

impl RawPageExtractor {
    pub fn new(tail_chars: usize) -> Self {
        Self { tail_chars }
    }
}

impl Default for RawPageExtractor {
    fn default() -> Self {
        Self::new(RAW_TAIL_CHARS)
    }
}

impl PageExtractor for RawPageExtractor {
    fn layout(&self) -> PageLayout {
        PageLayout::Raw
    }

    fn can_handle(&self, _page: &RenderedPage) -> bool {
        true
    }

    fn extract(&self, page: &RenderedPage) -> Option<Region> {
        let text = page.text().trim();
        if text.is_empty() {
            return None;
        }
        let count = text.chars().count();
        let tail: String = text.chars().skip(count.saturating_sub(self.tail_chars)).collect();
        Some(Region::new(tail, None))
    }
}
