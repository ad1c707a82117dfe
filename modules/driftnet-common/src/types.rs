//! Shared record and raw-item types.
//!
//! `CanonicalRecord` is the normalized, graph-ready shape handed to the store.
//! The `Raw*` structs are the opaque attribute bags the fetch clients yield;
//! the core never reaches past their fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Hn,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Hn => "hn",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Post,
    Comment,
}

/// Sentence byte-offset span within `CanonicalRecord::text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
}

/// The relevance triple captured on admitted items. Ephemeral elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceFeatures {
    pub content: f64,
    pub recency: f64,
    pub priority: f64,
}

/// Normalized, dataset-ready representation of one fetched item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub platform: Platform,
    pub kind: RecordKind,
    pub author_id: String,
    pub author_name: String,
    pub container_id: String,
    pub container_name: String,
    pub created_utc: f64,
    pub created_iso: String,
    pub fetched_iso: String,
    pub title: String,
    pub body: String,
    pub text: String,
    pub sentences: Vec<SentenceSpan>,
    pub url: String,
    pub outbound_urls: Vec<String>,
    pub outbound_domains: Vec<String>,
    pub score_upvotes: i64,
    pub num_comments: Option<i64>,
    pub parent_id: Option<String>,
    pub root_post_id: String,
    pub depth: u32,
    pub relevance_score: f64,
    pub relevance_features: Option<RelevanceFeatures>,
    pub provenance: serde_json::Value,
    pub content_hash: String,
}

/// A top-level item from the threaded platform (search hit or author timeline).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmission {
    pub id: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub community: String,
    pub created_utc: f64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub score: i64,
    pub num_comments: i64,
}

/// A reply from a comment thread. `parent_ref` keeps the platform's typed
/// reference (e.g. `t3_xxx` for a top-level item, `t1_xxx` for a reply).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReply {
    pub id: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_utc: f64,
    pub body: String,
    pub score: i64,
    pub parent_ref: Option<String>,
    pub depth: u32,
}

/// A story from the flat-feed platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStory {
    pub id: String,
    pub author: String,
    pub created_utc: f64,
    pub title: String,
    pub text: String,
    pub url: String,
    pub score: i64,
    pub descendants: i64,
}
