//! Normalization of raw platform items into `CanonicalRecord`s.
//!
//! One constructor per raw shape; all shared derivation (text join, sentence
//! spans, outbound links, timestamps, content hash) lives in `assemble`.

use serde_json::json;

use driftnet_common::text::{content_hash, extract_urls, now_iso, sentence_spans, to_iso, url_to_domain};
use driftnet_common::{
    CanonicalRecord, Platform, RawReply, RawStory, RawSubmission, RecordKind, RelevanceFeatures,
};

/// Join title and body the way the dataset expects: both present means
/// newline-joined and trimmed, otherwise whichever is non-empty.
pub fn join_text(title: &str, body: &str) -> String {
    if !title.is_empty() && !body.is_empty() {
        format!("{title}\n{body}").trim().to_string()
    } else if !title.is_empty() {
        title.to_string()
    } else {
        body.to_string()
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    platform: Platform,
    kind: RecordKind,
    id: &str,
    author_id: Option<&str>,
    author_name: Option<&str>,
    container_id: &str,
    container_name: &str,
    created_utc: f64,
    title: &str,
    body: &str,
    url: &str,
    score_upvotes: i64,
    num_comments: Option<i64>,
    parent_id: Option<String>,
    root_post_id: &str,
    depth: u32,
    relevance_features: Option<RelevanceFeatures>,
    provenance: serde_json::Value,
) -> CanonicalRecord {
    let text = join_text(title, body);
    let sentences = sentence_spans(&text);
    let outbound_urls = extract_urls(&text);
    let outbound_domains: Vec<String> =
        outbound_urls.iter().filter_map(|u| url_to_domain(u)).collect();
    let content_hash = content_hash(&[platform.as_str(), id, &text]);

    CanonicalRecord {
        id: id.to_string(),
        platform,
        kind,
        author_id: author_id.unwrap_or_default().to_string(),
        author_name: author_name.unwrap_or_default().to_string(),
        container_id: container_id.to_string(),
        container_name: container_name.to_string(),
        created_utc,
        created_iso: to_iso(created_utc),
        fetched_iso: now_iso(),
        title: title.to_string(),
        body: body.to_string(),
        text,
        sentences,
        url: url.to_string(),
        outbound_urls,
        outbound_domains,
        score_upvotes,
        num_comments,
        parent_id,
        root_post_id: root_post_id.to_string(),
        depth,
        relevance_score: relevance_features.map(|f| f.content).unwrap_or(0.0),
        relevance_features,
        provenance,
        content_hash,
    }
}

/// A search-admitted submission from the threaded platform.
pub fn submission_record(
    s: &RawSubmission,
    features: RelevanceFeatures,
    query: &str,
) -> CanonicalRecord {
    assemble(
        Platform::Reddit,
        RecordKind::Post,
        &s.id,
        s.author_id.as_deref(),
        s.author_name.as_deref(),
        &s.community,
        &s.community,
        s.created_utc,
        &s.title,
        &s.body,
        &s.url,
        s.score,
        Some(s.num_comments),
        None,
        &s.id,
        0,
        Some(features),
        json!({
            "endpoint": "reddit.search",
            "subreddit": s.community,
            "query": query,
        }),
    )
}

/// A reply from a comment thread. Ungated, so it carries no relevance triple.
pub fn reply_record(c: &RawReply, thread_id: &str) -> CanonicalRecord {
    assemble(
        Platform::Reddit,
        RecordKind::Comment,
        &c.id,
        c.author_id.as_deref(),
        c.author_name.as_deref(),
        "",
        "",
        c.created_utc,
        "",
        &c.body,
        "",
        c.score,
        None,
        c.parent_ref.clone(),
        thread_id,
        c.depth,
        None,
        json!({
            "endpoint": "reddit.comments",
            "submission_id": thread_id,
        }),
    )
}

/// A story from the flat-feed platform.
pub fn story_record(s: &RawStory, features: RelevanceFeatures) -> CanonicalRecord {
    assemble(
        Platform::Hn,
        RecordKind::Post,
        &s.id,
        Some(s.author.as_str()),
        Some(s.author.as_str()),
        "hn",
        "HackerNews",
        s.created_utc,
        &s.title,
        &s.text,
        &s.url,
        s.score,
        Some(s.descendants),
        None,
        &s.id,
        0,
        Some(features),
        json!({
            "endpoint": "hn.newstories",
            "id": s.id,
        }),
    )
}
