//! Text and timestamp helpers shared by the normalizer and the store.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

use crate::types::SentenceSpan;

pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Current UTC time in ISO 8601 with a Z suffix.
pub fn now_iso() -> String {
    Utc::now().format(ISO_FORMAT).to_string()
}

/// Epoch seconds to ISO UTC. Out-of-range timestamps fall back to now.
pub fn to_iso(epoch_secs: f64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs as i64, 0)
        .unwrap_or_else(Utc::now)
        .format(ISO_FORMAT)
        .to_string()
}

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)\]}>'"]+"#).unwrap());

/// Scan free text for outbound URLs. No validation beyond the scheme match.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Host of a URL with any leading `www.` stripped. None when unparseable.
pub fn url_to_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let domain = host.strip_prefix("www.").unwrap_or(host);
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]").unwrap());

/// Simple sentence segmentation: split on `.`, `!`, `?`, trim whitespace,
/// return non-empty byte-offset spans into the input.
pub fn sentence_spans(text: &str) -> Vec<SentenceSpan> {
    let mut spans = Vec::new();
    if text.is_empty() {
        return spans;
    }
    let mut start = 0usize;
    for m in SENTENCE_END_RE.find_iter(text) {
        push_trimmed(&mut spans, text, start, m.end());
        start = m.end();
    }
    if start < text.len() {
        push_trimmed(&mut spans, text, start, text.len());
    }
    spans
}

fn push_trimmed(spans: &mut Vec<SentenceSpan>, text: &str, start: usize, end: usize) {
    let seg = &text[start..end];
    if seg.trim().is_empty() {
        return;
    }
    let ltrim = seg.len() - seg.trim_start().len();
    let rtrim = seg.len() - seg.trim_end().len();
    spans.push(SentenceSpan {
        start: start + ltrim,
        end: end - rtrim,
    });
}

/// Stable SHA-256 hash over `|`-separated parts, hex encoded.
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize())
}
