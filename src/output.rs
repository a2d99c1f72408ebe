//! Result printing and snapshot persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::Value;
use webask_protocols::{ExtractionMode, Outcome};

const SLUG_MAX_CHARS: usize = 40;

/// JSON printed on stdout for a finished run.
///
/// Success prints the extracted value alone; failure prints the tagged
/// outcome with its reason and attempt history.
pub(crate) fn render_outcome(outcome: &Outcome, mode: ExtractionMode) -> Value {
    match outcome {
        Outcome::Success { result, .. } => result.to_output(mode),
        Outcome::Failure { .. } => serde_json::to_value(outcome).unwrap_or_else(|e| {
            serde_json::json!({ "status": "failure", "reason": e.to_string() })
        }),
    }
}

pub(crate) fn to_json_string(value: &Value, pretty: bool) -> String {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.unwrap_or_else(|_| value.to_string())
}

/// Filename for a saved snapshot: prompt slug, target host and local time.
pub(crate) fn html_filename(prompt: &str, url: &str, at: DateTime<Local>) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(slugify))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "page".to_string());

    let mut slug = slugify(prompt);
    if slug.is_empty() {
        slug = "prompt".to_string();
    }

    format!("{}_{}_{}.html", slug, host, at.format("%Y%m%d_%H%M%S"))
}

/// Lowercase ASCII words joined by `_`, cut at a word boundary.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for word in text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let extra = if slug.is_empty() { word.len() } else { word.len() + 1 };
        if slug.len() + extra > SLUG_MAX_CHARS {
            if slug.is_empty() {
                slug.push_str(&word[..SLUG_MAX_CHARS].to_ascii_lowercase());
            }
            break;
        }
        if !slug.is_empty() {
            slug.push('_');
        }
        slug.push_str(&word.to_ascii_lowercase());
    }
    slug
}

/// Where the last snapshot goes: the explicit path, else a generated name
/// under `dir` when saving is enabled.
pub(crate) fn snapshot_path(
    explicit: Option<&Path>,
    save_snapshots: bool,
    dir: &str,
    prompt: &str,
    url: &str,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    save_snapshots.then(|| {
        let dir = webask_config::ConfigLoader::expand_path(dir);
        PathBuf::from(dir).join(html_filename(prompt, url, Local::now()))
    })
}

pub(crate) fn save_html(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
}
