//! Text rendering of a response region.
//!
//! Approximates `innerText`: block elements start new lines, source
//! whitespace collapses, and `<pre>` blocks come out as fenced code with
//! their contents untouched so fenced JSON survives rendering.

use scraper::{ElementRef, Node, Selector};

const SKIPPED: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "button",
];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "section", "summary", "table", "tr", "ul",
];

/// Render `element` and its descendants as plain text.
pub fn render_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    render_children(element, None, &mut out);
    tidy(&out)
}

/// Like [`render_text`], leaving out every descendant matching `skip`.
pub fn render_text_excluding(element: ElementRef<'_>, skip: &Selector) -> String {
    let mut out = String::new();
    render_children(element, Some(skip), &mut out);
    tidy(&out)
}

fn render_children(element: ElementRef<'_>, skip: Option<&Selector>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            render_element(child_element, skip, out);
        } else if let Node::Text(text) = child.value() {
            push_collapsed(out, text);
        }
    }
}

fn render_element(element: ElementRef<'_>, skip: Option<&Selector>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED.contains(&name) || skip.is_some_and(|s| s.matches(&element)) {
        return;
    }
    match name {
        "br" => out.push('\n'),
        "pre" => render_pre(element, out),
        "td" | "th" => {
            render_children(element, skip, out);
            out.push('\t');
        }
        _ if BLOCKS.contains(&name) => {
            out.push('\n');
            render_children(element, skip, out);
            out.push('\n');
        }
        _ => render_children(element, skip, out),
    }
}

fn render_pre(element: ElementRef<'_>, out: &mut String) {
    let code: String = element.text().collect();
    out.push_str("\n```");
    if let Some(language) = code_language(element) {
        out.push_str(&language);
    }
    out.push('\n');
    out.push_str(code.trim_end_matches('\n'));
    out.push_str("\n```\n");
}

/// Language from a `language-xxx` or `lang-xxx` class on the `<pre>` or
/// its `<code>` child.
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    pre.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "pre" | "code"))
        .flat_map(|e| e.value().classes())
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .map(|lang| lang.to_ascii_lowercase())
        })
}

fn push_collapsed(out: &mut String, text: &str) {
    let mut in_space = out.ends_with(char::is_whitespace);
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{a0}' {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
}

/// Trim lines outside fences and squeeze blank runs to one line.
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = false;

    for line in raw.lines() {
        if in_fence {
            let trimmed = line.trim_end();
            if trimmed.trim_start() == "```" {
                in_fence = false;
            }
            lines.push(trimmed);
            continue;
        }

        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = true;
            blank_run = false;
            lines.push(trimmed);
            continue;
        }
        if trimmed.is_empty() {
            if !blank_run && !lines.is_empty() {
                lines.push("");
            }
            blank_run = true;
        } else {
            lines.push(trimmed);
            blank_run = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
