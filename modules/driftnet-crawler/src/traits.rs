// Trait seams for the fetch collaborators.
//
// The orchestrator never talks to a platform API directly; it sees these two
// traits and treats whatever they yield as opaque attribute bags. Tests drive
// the full crawl with in-memory stubs: no network, no credentials.

use anyhow::Result;
use async_trait::async_trait;

use driftnet_common::{RawReply, RawStory, RawSubmission};

/// The threaded (frontier-driven) platform: search, thread replies, author
/// timelines. Rate limiting happens inside implementations.
#[async_trait]
pub trait ThreadClient: Send + Sync {
    /// Search a community for a query, newest first.
    async fn search(&self, community: &str, query: &str, limit: u32) -> Result<Vec<RawSubmission>>;

    /// All replies in a thread, flattened in traversal order.
    async fn replies(&self, thread_id: &str) -> Result<Vec<RawReply>>;

    /// Recent submissions by one author.
    async fn author_timeline(&self, name: &str, limit: u32) -> Result<Vec<RawSubmission>>;
}

/// The flat-feed platform: a bounded iterator of recent stories.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn recent_stories(&self, limit: usize) -> Result<Vec<RawStory>>;
}
