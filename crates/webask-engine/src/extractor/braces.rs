//! Balanced-brace scanning over free-form text.

/// Byte ranges of every balanced `{...}` span, ordered by start.
///
/// One pass with a stack of open positions. String literals and escapes
/// are honored while a brace is open, so braces in JSON strings do not
/// affect nesting; outside braces quotes are plain prose. A string literal
/// never spans a line break, which keeps a stray quote from swallowing the
/// rest of the text. Openers that never close are dropped while the spans
/// nested inside them are kept.
pub(crate) fn balanced_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' || b == b'\n' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|&(start, _)| start);
    spans
}
