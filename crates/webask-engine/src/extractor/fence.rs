//! Fenced code block scanning (```` ``` ```` and `~~~`).

/// A fenced block found in reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FencedBlock {
    /// Info string after the opening fence, lowercased (`json`, `` or a language).
    pub info: String,
    pub body: String,
}

impl FencedBlock {
    /// Whether the block may hold JSON: untagged or tagged `json`-like.
    pub fn is_json_candidate(&self) -> bool {
        self.info.is_empty() || self.info.starts_with("json")
    }
}

/// Collect fenced blocks in order of appearance.
///
/// A block is closed by a line starting with the same fence character
/// repeated at least as many times as the opener. An unterminated block
/// runs to the end of the text.
pub(crate) fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(char, usize, String, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        match open.as_mut() {
            None => {
                if let Some((ch, len)) = fence_marker(trimmed) {
                    let rest = &trimmed[len..];
                    // Single-line fences: ```json {"a": 1}```
                    if let Some(inner) = rest.strip_suffix(&ch.to_string().repeat(len)) {
                        let (info, body) = split_inline(inner);
                        blocks.push(FencedBlock { info, body });
                        continue;
                    }
                    let info = rest.trim().to_lowercase();
                    open = Some((ch, len, info, Vec::new()));
                }
            }
            Some((ch, len, _, lines)) => {
                if closes(trimmed, *ch, *len) {
                    if let Some((_, _, info, lines)) = open.take() {
                        blocks.push(FencedBlock {
                            info,
                            body: lines.join("\n"),
                        });
                    }
                } else {
                    lines.push(line);
                }
            }
        }
    }

    if let Some((_, _, info, lines)) = open {
        blocks.push(FencedBlock {
            info,
            body: lines.join("\n"),
        });
    }

    blocks
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = line.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn closes(line: &str, ch: char, len: usize) -> bool {
    match fence_marker(line) {
        Some((c, n)) => c == ch && n >= len && line[n..].trim().is_empty(),
        None => false,
    }
}

fn split_inline(inner: &str) -> (String, String) {
    let inner = inner.trim();
    match inner.find(|c: char| c == '{' || c == '[') {
        Some(0) | None => (String::new(), inner.to_string()),
        Some(pos) => (
            inner[..pos].trim().to_lowercase(),
            inner[pos..].to_string(),
        ),
    }
}
