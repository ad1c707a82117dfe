//! Hacker News client over the Firebase v0 API.
//!
//! The feed is a flat list of story ids drained newest-first; each item fetch
//! goes through the rate gate and a small bounded retry.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use driftnet_common::RawStory;

use super::gate::RateGate;
use crate::traits::FeedClient;

const BASE: &str = "https://hacker-news.firebaseio.com/v0";
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct HnItem {
    id: i64,
    #[serde(rename = "type")]
    item_type: Option<String>,
    by: Option<String>,
    time: Option<f64>,
    title: Option<String>,
    text: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
}

pub struct HackerNewsClient {
    http: reqwest::Client,
    gate: Mutex<RateGate>,
}

impl HackerNewsClient {
    pub fn new(qps: f64) -> Self {
        Self {
            http: reqwest::Client::new(),
            gate: Mutex::new(RateGate::new(qps)),
        }
    }

    /// GET with up to three attempts and doubling backoff between them.
    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let mut delay = RETRY_BASE_DELAY;
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..RETRY_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            match self.try_get(url).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(url, attempt, error = %e, "Feed request failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("feed request failed: {url}")))
    }

    async fn try_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl FeedClient for HackerNewsClient {
    async fn recent_stories(&self, limit: usize) -> anyhow::Result<Vec<RawStory>> {
        self.gate.lock().await.wait().await;
        let ids: Vec<i64> = self.get_with_retry(&format!("{BASE}/newstories.json")).await?;
        debug!(available = ids.len(), limit, "Fetched newstories id list");

        let mut stories = Vec::new();
        for id in ids {
            if stories.len() >= limit {
                break;
            }
            self.gate.lock().await.wait().await;
            let item: Option<HnItem> =
                match self.get_with_retry(&format!("{BASE}/item/{id}.json")).await {
                    Ok(item) => item,
                    Err(e) => {
                        warn!(id, error = %e, "Skipping unfetchable item");
                        continue;
                    }
                };
            let Some(item) = item else { continue };
            if item.item_type.as_deref() != Some("story") {
                continue;
            }
            stories.push(RawStory {
                id: item.id.to_string(),
                author: item.by.unwrap_or_default(),
                created_utc: item.time.unwrap_or(0.0),
                title: item.title.unwrap_or_default(),
                text: item.text.unwrap_or_default(),
                url: item.url.unwrap_or_default(),
                score: item.score.unwrap_or(0),
                descendants: item.descendants.unwrap_or(0),
            });
        }
        Ok(stories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_deserializes_with_missing_fields() {
        let item: HnItem = serde_json::from_str(r#"{"id": 7, "type": "story"}"#).unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(item.item_type.as_deref(), Some("story"));
        assert!(item.by.is_none());
        assert!(item.descendants.is_none());
    }

    #[test]
    fn comment_items_are_not_stories() {
        let item: HnItem =
            serde_json::from_str(r#"{"id": 8, "type": "comment", "text": "hi"}"#).unwrap();
        assert_ne!(item.item_type.as_deref(), Some("story"));
    }
}
