//! Light repair of almost-JSON produced by chat assistants.

use serde_json::Value;

/// Parse `candidate` as JSON, retrying once on a repaired copy.
pub(crate) fn parse_lenient(candidate: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }
    let repaired = repair(candidate);
    if repaired == candidate {
        return None;
    }
    serde_json::from_str::<Value>(&repaired).ok()
}

/// Normalize typographic quotes and drop trailing commas before `}`/`]`.
pub(crate) fn repair(candidate: &str) -> String {
    let normalized: String = candidate
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{00A0}' => ' ',
            c => c,
        })
        .collect();

    strip_trailing_commas(&normalized)
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
