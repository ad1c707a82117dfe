//! The crawl orchestrator.
//!
//! Owns one frontier, one set of relevance parameters, and one set of output
//! sinks per run; nothing is process-global, so repeated runs are independent.
//! Dispatch is a task-kind state machine over the frontier for the threaded
//! platform, and a flat drain of the story feed for the secondary platform.
//! The metrics row is flushed on every exit path, including the fatal
//! client-initialization path where nothing is ever fetched.

use anyhow::Result;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use driftnet_common::config::{Config, DomainConfig, RelevanceConfig};
use driftnet_common::text::now_iso;
use driftnet_common::{CanonicalRecord, RawReply, RawStory, RawSubmission, RelevanceFeatures};
use driftnet_store::{MetricsRow, StoreWriter};

use crate::frontier::{Frontier, FrontierTask};
use crate::normalize;
use crate::relevance::{content_score, final_priority, recency_boost, term_hits};
use crate::traits::{FeedClient, ThreadClient};

/// Search page size for the threaded platform.
const SEARCH_LIMIT: u32 = 50;
/// Author timeline page size.
const AUTHOR_LIMIT: u32 = 25;

/// Per-run counters, flushed to the metrics table exactly once.
#[derive(Debug, Clone, Copy)]
pub struct CrawlStats {
    pub items_fetched: u64,
    pub items_written: u64,
    /// Present in the metrics schema; no code path increments it yet.
    pub success_calls: u64,
    pub error_calls: u64,
    pub dedup_skipped: u64,
    started: Instant,
}

impl CrawlStats {
    fn new() -> Self {
        Self {
            items_fetched: 0,
            items_written: 0,
            success_calls: 0,
            error_calls: 0,
            dedup_skipped: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed_sec(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn metrics_row(&self) -> MetricsRow {
        MetricsRow {
            ts_iso: now_iso(),
            items_fetched: self.items_fetched,
            items_written: self.items_written,
            elapsed_sec: self.elapsed_sec(),
            success_calls: self.success_calls,
            error_calls: self.error_calls,
            dedup_skipped: self.dedup_skipped,
        }
    }
}

impl std::fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Crawl Run Complete ===")?;
        writeln!(f, "Items fetched: {}", self.items_fetched)?;
        writeln!(f, "Items written: {}", self.items_written)?;
        writeln!(f, "Errors:        {}", self.error_calls)?;
        writeln!(f, "Dedup skipped: {}", self.dedup_skipped)?;
        writeln!(f, "Elapsed:       {:.1}s", self.elapsed_sec())?;
        Ok(())
    }
}

/// How one fetched item was handled. `Err` from the processing step means a
/// recoverable per-item failure counted in `error_calls`; the loop continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Persisted and expanded (descendant tasks enqueued).
    Admitted,
    /// Not persisted, but descendants enqueued past the exploration bar.
    Explored,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    TooShort,
    BelowThreshold,
}

pub struct Crawler {
    relevance: RelevanceConfig,
    domain: DomainConfig,
    min_text_len: usize,
    max_items: u64,
    seeds: Vec<(String, String)>,
    writer: StoreWriter,
    frontier: Frontier,
    stats: CrawlStats,
}

impl Crawler {
    pub fn new(cfg: &Config, writer: StoreWriter) -> Self {
        Self {
            relevance: cfg.relevance.clone(),
            domain: cfg.domain.clone(),
            min_text_len: cfg.crawler.min_text_len,
            max_items: cfg.run.max_items,
            seeds: cfg.seed_pairs(),
            writer,
            frontier: Frontier::new(),
            stats: CrawlStats::new(),
        }
    }

    /// Crawl the threaded platform: seed searches, then drive the frontier
    /// until it empties or the item cap is reached.
    pub async fn run_threaded(mut self, client: &dyn ThreadClient) -> Result<CrawlStats> {
        for (community, query) in self.seeds.clone() {
            self.frontier.push(1.0, FrontierTask::Search { community, query });
        }
        info!(seeds = self.frontier.len(), "Seeded frontier");

        while !self.frontier.is_empty() && self.stats.items_written < self.max_items {
            let Some((priority, task)) = self.frontier.pop() else {
                break;
            };
            debug!(?task, priority, pending = self.frontier.len(), "Dispatching task");
            match task {
                FrontierTask::Search { community, query } => {
                    self.handle_search(client, &community, &query).await;
                }
                FrontierTask::Comments { thread_id } => {
                    self.handle_comments(client, &thread_id).await;
                }
                FrontierTask::Author { name } => {
                    self.handle_author(client, &name).await;
                }
                // Author-discovered items are always explored, no re-check.
                FrontierTask::Submission { id, .. } => {
                    self.frontier.push(1.0, FrontierTask::Comments { thread_id: id });
                }
            }
        }
        self.finish()
    }

    /// Drain the flat story feed of the secondary platform.
    pub async fn run_feed(mut self, client: &dyn FeedClient) -> Result<CrawlStats> {
        let limit = self.max_items.saturating_mul(5).max(500) as usize;
        match client.recent_stories(limit).await {
            Ok(stories) => {
                for story in stories {
                    if self.stats.items_written >= self.max_items {
                        break;
                    }
                    self.stats.items_fetched += 1;
                    match self.process_story(&story) {
                        Ok(outcome) => {
                            debug!(id = story.id.as_str(), ?outcome, "Story processed");
                        }
                        Err(e) => {
                            self.stats.error_calls += 1;
                            warn!(id = story.id.as_str(), error = %e, "Story failed, continuing");
                        }
                    }
                }
            }
            Err(e) => {
                self.stats.error_calls += 1;
                error!(error = %e, "Story feed fetch failed");
            }
        }
        self.finish()
    }

    /// Fatal-precondition exit: the platform client never came up. Counts the
    /// failure and still flushes the metrics row without fetching anything.
    pub fn abort_without_crawl(mut self) -> Result<CrawlStats> {
        self.stats.error_calls += 1;
        self.finish()
    }

    fn finish(&mut self) -> Result<CrawlStats> {
        self.writer.write_metrics(&self.stats.metrics_row())?;
        info!(
            items_fetched = self.stats.items_fetched,
            items_written = self.stats.items_written,
            error_calls = self.stats.error_calls,
            dedup_skipped = self.stats.dedup_skipped,
            "Metrics row flushed"
        );
        Ok(self.stats)
    }

    // --- Threaded platform transitions -----------------------------------

    async fn handle_search(&mut self, client: &dyn ThreadClient, community: &str, query: &str) {
        let items = match client.search(community, query, SEARCH_LIMIT).await {
            Ok(items) => items,
            Err(e) => {
                self.stats.error_calls += 1;
                warn!(community, query, error = %e, "Search fetch failed");
                return;
            }
        };
        for item in items {
            self.stats.items_fetched += 1;
            if self.frontier.seen(&item.id) {
                self.stats.dedup_skipped += 1;
                continue;
            }
            self.frontier.mark_seen(item.id.clone());
            match self.process_search_item(&item, query) {
                Ok(outcome) => debug!(id = item.id.as_str(), ?outcome, "Search item processed"),
                Err(e) => {
                    self.stats.error_calls += 1;
                    warn!(id = item.id.as_str(), error = %e, "Search item failed, continuing");
                }
            }
        }
    }

    /// Two-tier admission: harvest at `tau_data` on content alone, explore
    /// descendants at the lower `tau_frontier` bar on the combined priority.
    fn process_search_item(&mut self, item: &RawSubmission, query: &str) -> Result<ItemOutcome> {
        let text = normalize::join_text(&item.title, &item.body);
        if text.chars().count() < self.min_text_len {
            return Ok(ItemOutcome::Dropped(DropReason::TooShort));
        }
        let (content, recency, priority) = self.score(&text, item.created_utc);

        if content >= self.relevance.tau_data {
            let features = RelevanceFeatures {
                content,
                recency,
                priority,
            };
            let record = normalize::submission_record(item, features, query);
            self.writer.write_record(&record)?;
            self.stats.items_written += 1;
            self.emit_post_graph(
                &record,
                serde_json::json!({ "subreddit": item.community }),
                &format!("reddit:container:{}", item.community),
            )?;
            self.frontier.push(
                priority,
                FrontierTask::Comments {
                    thread_id: item.id.clone(),
                },
            );
            if let Some(author) = &item.author_name {
                self.frontier.push(priority, FrontierTask::Author { name: author.clone() });
            }
            Ok(ItemOutcome::Admitted)
        } else if priority >= self.relevance.tau_frontier {
            self.frontier.push(
                priority,
                FrontierTask::Comments {
                    thread_id: item.id.clone(),
                },
            );
            Ok(ItemOutcome::Explored)
        } else {
            Ok(ItemOutcome::Dropped(DropReason::BelowThreshold))
        }
    }

    async fn handle_comments(&mut self, client: &dyn ThreadClient, thread_id: &str) {
        let replies = match client.replies(thread_id).await {
            Ok(replies) => replies,
            Err(e) => {
                self.stats.error_calls += 1;
                warn!(thread_id, error = %e, "Replies fetch failed");
                return;
            }
        };
        for reply in replies {
            match self.process_reply(&reply, thread_id) {
                Ok(outcome) => debug!(id = reply.id.as_str(), ?outcome, "Reply processed"),
                Err(e) => {
                    self.stats.error_calls += 1;
                    warn!(id = reply.id.as_str(), error = %e, "Reply failed, continuing");
                }
            }
        }
    }

    /// Replies are not re-gated on relevance: the owning thread already
    /// cleared a threshold when it was discovered. Only the length filter
    /// applies here.
    fn process_reply(&mut self, reply: &RawReply, thread_id: &str) -> Result<ItemOutcome> {
        if reply.body.trim().chars().count() < self.min_text_len {
            return Ok(ItemOutcome::Dropped(DropReason::TooShort));
        }
        let record = normalize::reply_record(reply, thread_id);
        self.writer.write_record(&record)?;
        self.stats.items_written += 1;

        let comment_node = format!("reddit:comment:{}", record.id);
        if !record.author_name.is_empty() {
            let author_node = format!("reddit:author:{}", record.author_name);
            self.writer.write_node(&author_node, "author", &serde_json::json!({}))?;
            self.writer
                .write_edge(&comment_node, &author_node, "AUTHORED_BY", 1.0, &serde_json::json!({}))?;
        }
        self.writer.write_node(&comment_node, "comment", &serde_json::json!({}))?;
        if let Some(parent_ref) = &record.parent_id {
            let dst = resolve_parent_node(parent_ref);
            self.writer
                .write_edge(&comment_node, &dst, "REPLY_TO", 1.0, &serde_json::json!({}))?;
        }
        Ok(ItemOutcome::Admitted)
    }

    async fn handle_author(&mut self, client: &dyn ThreadClient, name: &str) {
        let items = match client.author_timeline(name, AUTHOR_LIMIT).await {
            Ok(items) => items,
            Err(e) => {
                self.stats.error_calls += 1;
                warn!(author = name, error = %e, "Author timeline fetch failed");
                return;
            }
        };
        for item in items {
            self.frontier.push(
                1.0,
                FrontierTask::Submission {
                    id: item.id.clone(),
                    community: item.community.clone(),
                },
            );
        }
    }

    // --- Flat-feed platform -----------------------------------------------

    /// Single-tier OR policy: a story is admitted when either threshold
    /// clears. Deliberately looser than the threaded platform's two tiers.
    fn process_story(&mut self, story: &RawStory) -> Result<ItemOutcome> {
        let text = story.text.replace("<p>", "\n").replace("</p>", "");
        let combined = normalize::join_text(&story.title, &text);
        if combined.chars().count() < self.min_text_len {
            return Ok(ItemOutcome::Dropped(DropReason::TooShort));
        }
        let (content, recency, priority) = self.score(&combined, story.created_utc);

        if content >= self.relevance.tau_data || priority >= self.relevance.tau_frontier {
            let features = RelevanceFeatures {
                content,
                recency,
                priority,
            };
            let mut story = story.clone();
            story.text = text;
            let record = normalize::story_record(&story, features);
            self.writer.write_record(&record)?;
            self.stats.items_written += 1;
            self.emit_post_graph(&record, serde_json::json!({}), "hn:container:HN")?;
            Ok(ItemOutcome::Admitted)
        } else {
            Ok(ItemOutcome::Dropped(DropReason::BelowThreshold))
        }
    }

    // --- Shared helpers ---------------------------------------------------

    fn score(&self, text: &str, created_utc: f64) -> (f64, f64, f64) {
        let content = content_score(
            text,
            &self.domain.keywords,
            &self.domain.brands,
            &self.domain.policies,
            self.relevance.brand_bonus,
            self.relevance.policy_bonus,
        );
        let hours_since = (Utc::now().timestamp() as f64 - created_utc) / 3600.0;
        let recency = recency_boost(hours_since, self.relevance.half_life_hours);
        let priority = final_priority(content, recency, 0.0, 0.0, 0.0);
        (content, recency, priority)
    }

    /// Emit the node/edge pattern for an admitted top-level item: the item
    /// node, author and container links, one edge per outbound domain, and
    /// occurrence-weighted brand/policy mention edges.
    fn emit_post_graph(
        &mut self,
        record: &CanonicalRecord,
        post_attrs: serde_json::Value,
        container_node: &str,
    ) -> Result<()> {
        let platform = record.platform.as_str();
        let post_node = format!("{platform}:post:{}", record.id);
        self.writer.write_node(&post_node, "post", &post_attrs)?;

        if !record.author_name.is_empty() {
            let author_node = format!("{platform}:author:{}", record.author_name);
            self.writer.write_node(&author_node, "author", &serde_json::json!({}))?;
            self.writer
                .write_edge(&post_node, &author_node, "AUTHORED_BY", 1.0, &serde_json::json!({}))?;
        }

        self.writer.write_node(container_node, "container", &serde_json::json!({}))?;
        self.writer
            .write_edge(&post_node, container_node, "IN_CONTAINER", 1.0, &serde_json::json!({}))?;

        for domain in &record.outbound_domains {
            let domain_node = format!("domain:{domain}");
            self.writer.write_node(&domain_node, "domain", &serde_json::json!({}))?;
            self.writer
                .write_edge(&post_node, &domain_node, "LINKS_TO_DOMAIN", 1.0, &serde_json::json!({}))?;
        }

        for brand in &self.domain.brands {
            let count = term_hits(&record.text, brand);
            if count > 0 {
                self.writer.write_edge(
                    &post_node,
                    "BRAND",
                    "MENTIONS_BRAND",
                    count as f64,
                    &serde_json::json!({}),
                )?;
            }
        }
        for policy in &self.domain.policies {
            let count = term_hits(&record.text, policy);
            if count > 0 {
                self.writer.write_edge(
                    &post_node,
                    "POLICY",
                    "MENTIONS_POLICY",
                    count as f64,
                    &serde_json::json!({}),
                )?;
            }
        }
        Ok(())
    }
}

/// Map a raw typed parent reference onto a graph node id: `t3_` prefixes a
/// top-level item, `t1_` another reply; anything else passes through
/// platform-qualified.
fn resolve_parent_node(parent_ref: &str) -> String {
    if let Some(id) = parent_ref.strip_prefix("t3_") {
        format!("reddit:post:{id}")
    } else if let Some(id) = parent_ref.strip_prefix("t1_") {
        format!("reddit:comment:{id}")
    } else {
        format!("reddit:{parent_ref}")
    }
}
