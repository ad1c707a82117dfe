//! Reddit client over the public OAuth API (client-credentials grant).
//!
//! `login` fetches the bearer token up front; a failure there is the run's
//! one fatal precondition. Listing responses are navigated as loose JSON and
//! mapped into the shared raw-item bags; malformed children are skipped.

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use driftnet_common::{RawReply, RawSubmission};

use super::gate::RateGate;
use crate::traits::ThreadClient;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

#[derive(Error, Debug)]
pub enum RedditError {
    #[error("missing client credentials")]
    MissingCredentials,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, RedditError>;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct RedditClient {
    http: reqwest::Client,
    token: String,
    gate: Mutex<RateGate>,
}

impl RedditClient {
    /// Authenticate with the client-credentials grant. Credentials are opaque
    /// pass-through from config; empty ones fail fast without a request.
    pub async fn login(
        client_id: &str,
        client_secret: &str,
        user_agent: &str,
        qps: f64,
    ) -> Result<Self> {
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(RedditError::MissingCredentials);
        }
        let http = reqwest::Client::builder().user_agent(user_agent.to_string()).build()?;
        let resp = http
            .post(TOKEN_URL)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RedditError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let token: TokenResponse = resp.json().await?;
        Ok(Self {
            http,
            token: token.access_token,
            gate: Mutex::new(RateGate::new(qps)),
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.gate.lock().await.wait().await;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RedditError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

fn listing_children(value: &serde_json::Value) -> Vec<&serde_json::Value> {
    value
        .pointer("/data/children")
        .and_then(|c| c.as_array())
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

fn submission_from_child(child: &serde_json::Value) -> Option<RawSubmission> {
    let data = child.get("data")?;
    Some(RawSubmission {
        id: data.get("id")?.as_str()?.to_string(),
        author_id: data
            .get("author_fullname")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        author_name: data
            .get("author")
            .and_then(|v| v.as_str())
            .filter(|a| !a.is_empty() && *a != "[deleted]")
            .map(str::to_string),
        community: data
            .get("subreddit")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        created_utc: data.get("created_utc").and_then(|v| v.as_f64()).unwrap_or(0.0),
        title: data
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        body: data
            .get("selftext")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        url: data
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        score: data.get("score").and_then(|v| v.as_i64()).unwrap_or(0),
        num_comments: data.get("num_comments").and_then(|v| v.as_i64()).unwrap_or(0),
    })
}

/// Walk a comment forest depth-first, flattening `t1` nodes and skipping
/// `more` stubs.
fn collect_replies(children: &[&serde_json::Value], depth: u32, out: &mut Vec<RawReply>) {
    for child in children {
        if child.get("kind").and_then(|k| k.as_str()) != Some("t1") {
            continue;
        }
        let Some(data) = child.get("data") else { continue };
        let Some(id) = data.get("id").and_then(|v| v.as_str()) else { continue };
        out.push(RawReply {
            id: id.to_string(),
            author_id: data
                .get("author_fullname")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            author_name: data
                .get("author")
                .and_then(|v| v.as_str())
                .filter(|a| !a.is_empty() && *a != "[deleted]")
                .map(str::to_string),
            created_utc: data.get("created_utc").and_then(|v| v.as_f64()).unwrap_or(0.0),
            body: data
                .get("body")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            score: data.get("score").and_then(|v| v.as_i64()).unwrap_or(0),
            parent_ref: data
                .get("parent_id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            depth,
        });
        if let Some(nested) = data.pointer("/replies/data/children").and_then(|c| c.as_array()) {
            let nested_refs: Vec<&serde_json::Value> = nested.iter().collect();
            collect_replies(&nested_refs, depth + 1, out);
        }
    }
}

#[async_trait::async_trait]
impl ThreadClient for RedditClient {
    async fn search(
        &self,
        community: &str,
        query: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<RawSubmission>> {
        let url = format!(
            "{OAUTH_BASE}/r/{community}/search?q={}&sort=new&restrict_sr=1&t=year&limit={limit}&raw_json=1",
            urlencode(query)
        );
        let listing = self.get_json(&url).await?;
        let items: Vec<RawSubmission> = listing_children(&listing)
            .into_iter()
            .filter_map(submission_from_child)
            .collect();
        debug!(community, query, count = items.len(), "Search page fetched");
        Ok(items)
    }

    async fn replies(&self, thread_id: &str) -> anyhow::Result<Vec<RawReply>> {
        let url = format!("{OAUTH_BASE}/comments/{thread_id}?limit=500&raw_json=1");
        let value = self.get_json(&url).await?;
        // Response is a two-element array: [submission listing, comment forest].
        let mut replies = Vec::new();
        if let Some(forest) = value.get(1) {
            collect_replies(&listing_children(forest), 1, &mut replies);
        }
        debug!(thread_id, count = replies.len(), "Thread replies fetched");
        Ok(replies)
    }

    async fn author_timeline(&self, name: &str, limit: u32) -> anyhow::Result<Vec<RawSubmission>> {
        let url = format!("{OAUTH_BASE}/user/{name}/submitted?sort=new&limit={limit}&raw_json=1");
        let listing = self.get_json(&url).await?;
        Ok(listing_children(&listing)
            .into_iter()
            .filter_map(submission_from_child)
            .collect())
    }
}

/// Minimal query-string escaping for the search endpoint.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_search_listing_children() {
        let listing = json!({
            "data": { "children": [
                { "kind": "t3", "data": {
                    "id": "p1", "author": "alice", "author_fullname": "t2_a",
                    "subreddit": "evs", "created_utc": 1_700_000_000.0,
                    "title": "T", "selftext": "B", "url": "https://x.y",
                    "score": 5, "num_comments": 2
                }},
                { "kind": "t3", "data": { "title": "no id, skipped" } }
            ]}
        });
        let items: Vec<RawSubmission> = listing_children(&listing)
            .into_iter()
            .filter_map(submission_from_child)
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "p1");
        assert_eq!(items[0].author_name.as_deref(), Some("alice"));
        assert_eq!(items[0].num_comments, 2);
    }

    #[test]
    fn deleted_author_becomes_none() {
        let listing = json!({
            "data": { "children": [
                { "kind": "t3", "data": { "id": "p2", "author": "[deleted]" } }
            ]}
        });
        let items: Vec<RawSubmission> = listing_children(&listing)
            .into_iter()
            .filter_map(submission_from_child)
            .collect();
        assert!(items[0].author_name.is_none());
    }

    #[test]
    fn flattens_nested_comment_forest() {
        let forest = json!({
            "data": { "children": [
                { "kind": "t1", "data": {
                    "id": "c1", "author": "bob", "body": "top", "score": 1,
                    "created_utc": 1.0, "parent_id": "t3_p1",
                    "replies": { "data": { "children": [
                        { "kind": "t1", "data": {
                            "id": "c2", "author": "carol", "body": "nested",
                            "score": 1, "created_utc": 2.0, "parent_id": "t1_c1",
                            "replies": ""
                        }}
                    ]}}
                }},
                { "kind": "more", "data": { "count": 12 } }
            ]}
        });
        let mut out = Vec::new();
        collect_replies(&listing_children(&forest), 1, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "c1");
        assert_eq!(out[0].depth, 1);
        assert_eq!(out[1].id, "c2");
        assert_eq!(out[1].depth, 2);
        assert_eq!(out[1].parent_ref.as_deref(), Some("t1_c1"));
    }

    #[test]
    fn urlencode_escapes_query() {
        assert_eq!(urlencode("battery swap"), "battery+swap");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
    }
}
