//! Relevance scoring: pure, stateless, deterministic.
//!
//! Three functions compose into the single scalar used both for the admission
//! decision and for the priority of descendant frontier tasks:
//! `content_score` (lexical match), `recency_boost` (half-life decay), and
//! `final_priority` (their combination).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9_+-]+").unwrap());

/// Lowercase token runs of letters, digits, `_`, `+`, `-`.
fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Literal, case-insensitive, non-overlapping occurrences of `term` in `text`.
pub fn term_hits(text: &str, term: &str) -> usize {
    let term = term.trim().to_lowercase();
    if term.is_empty() || text.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(term.as_str()).count()
}

fn phrase_hits(text: &str, phrases: &[String]) -> usize {
    phrases.iter().map(|p| term_hits(text, p)).sum()
}

/// Lexical content relevance.
///
/// Base: +0.2 per unique text token that appears in any keyword phrase,
/// +0.6 per literal keyword-phrase occurrence. Bonuses: `brand_bonus` per
/// brand hit, `policy_bonus` per policy hit. Unbounded above, never negative.
pub fn content_score(
    text: &str,
    keywords: &[String],
    brand_terms: &[String],
    policy_terms: &[String],
    brand_bonus: f64,
    policy_bonus: f64,
) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let tokens: HashSet<String> = tokenize(text).into_iter().collect();
    let mut keyword_tokens: HashSet<String> = HashSet::new();
    for kw in keywords {
        keyword_tokens.extend(tokenize(kw));
    }
    let overlap = tokens.intersection(&keyword_tokens).count();

    let mut score = 0.2 * overlap as f64;
    score += 0.6 * phrase_hits(text, keywords) as f64;
    score += brand_bonus * phrase_hits(text, brand_terms) as f64;
    score += policy_bonus * phrase_hits(text, policy_terms) as f64;
    score
}

/// Exponential half-life decay in `(0, 1]`. Non-positive age or half-life
/// short-circuits to 1.0.
pub fn recency_boost(hours_since: f64, half_life_hours: f64) -> f64 {
    if hours_since <= 0.0 || half_life_hours <= 0.0 {
        return 1.0;
    }
    2.0_f64.powf(-hours_since / half_life_hours)
}

/// Combine content and recency with optional authority/penalty adjustments:
/// `content * recency * (1 + author_auth + url_auth) * (1 - off_topic_penalty)`,
/// every input clamped to its valid range first.
pub fn final_priority(
    content: f64,
    recency: f64,
    author_auth: f64,
    url_auth: f64,
    off_topic_penalty: f64,
) -> f64 {
    let content = content.max(0.0);
    let recency = recency.clamp(0.0, 1.0);
    let multiplier =
        (1.0 + author_auth.max(0.0) + url_auth.max(0.0)) * (1.0 - off_topic_penalty.max(0.0));
    content * recency * multiplier.max(0.0)
}
