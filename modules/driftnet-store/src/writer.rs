//! Append-only output sinks: the JSONL record log, the node/edge CSV tables,
//! and the per-run metrics table.
//!
//! The on-disk contract is fixed for downstream tooling:
//! - `records.jsonl` appends across runs, one JSON object per line.
//! - `nodes.csv` / `edges.csv` hold one crawl's graph (truncated per run).
//! - `metrics.csv` appends one row per run; the header is written once.
//!
//! Every write flushes, so a crash mid-run leaves valid partial output.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use driftnet_common::CanonicalRecord;

pub const NODE_HEADER: [&str; 3] = ["node_id", "node_type", "attrs_json"];
pub const EDGE_HEADER: [&str; 5] = ["src_id", "dst_id", "edge_type", "weight", "attrs_json"];
pub const METRICS_HEADER: [&str; 7] = [
    "ts_iso",
    "items_fetched",
    "items_written",
    "elapsed_sec",
    "success_calls",
    "error_calls",
    "dedup_skipped",
];

/// One metrics row, written exactly once per run.
#[derive(Debug, Clone)]
pub struct MetricsRow {
    pub ts_iso: String,
    pub items_fetched: u64,
    pub items_written: u64,
    pub elapsed_sec: f64,
    pub success_calls: u64,
    pub error_calls: u64,
    pub dedup_skipped: u64,
}

pub struct StoreWriter {
    records_path: PathBuf,
    records: BufWriter<File>,
    nodes: csv::Writer<File>,
    edges: csv::Writer<File>,
    metrics: csv::Writer<File>,
}

impl StoreWriter {
    /// Open all four sinks under `out_dir`, creating the directory and any
    /// missing files. Node/edge tables start fresh with a header; the record
    /// log and metrics table append to whatever previous runs left behind.
    pub fn open(out_dir: impl AsRef<Path>) -> Result<Self> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating output dir {}", out_dir.display()))?;

        let records_path = out_dir.join("records.jsonl");
        let records_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&records_path)
            .with_context(|| format!("opening {}", records_path.display()))?;

        let nodes_path = out_dir.join("nodes.csv");
        let mut nodes = csv::Writer::from_writer(
            File::create(&nodes_path)
                .with_context(|| format!("creating {}", nodes_path.display()))?,
        );
        nodes.write_record(NODE_HEADER)?;
        nodes.flush()?;

        let edges_path = out_dir.join("edges.csv");
        let mut edges = csv::Writer::from_writer(
            File::create(&edges_path)
                .with_context(|| format!("creating {}", edges_path.display()))?,
        );
        edges.write_record(EDGE_HEADER)?;
        edges.flush()?;

        let metrics_path = out_dir.join("metrics.csv");
        let metrics_is_new = fs::metadata(&metrics_path).map(|m| m.len() == 0).unwrap_or(true);
        let metrics_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&metrics_path)
            .with_context(|| format!("opening {}", metrics_path.display()))?;
        let mut metrics = csv::Writer::from_writer(metrics_file);
        if metrics_is_new {
            metrics.write_record(METRICS_HEADER)?;
            metrics.flush()?;
        }

        info!(out_dir = %out_dir.display(), "Opened output sinks");

        Ok(Self {
            records_path,
            records: BufWriter::new(records_file),
            nodes,
            edges,
            metrics,
        })
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Append one record as a JSON line.
    pub fn write_record(&mut self, record: &CanonicalRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.records.write_all(line.as_bytes())?;
        self.records.write_all(b"\n")?;
        self.records.flush()?;
        Ok(())
    }

    pub fn write_node(&mut self, node_id: &str, node_type: &str, attrs: &serde_json::Value) -> Result<()> {
        let attrs_json = attrs.to_string();
        self.nodes
            .write_record([node_id, node_type, attrs_json.as_str()])?;
        self.nodes.flush()?;
        Ok(())
    }

    pub fn write_edge(
        &mut self,
        src_id: &str,
        dst_id: &str,
        edge_type: &str,
        weight: f64,
        attrs: &serde_json::Value,
    ) -> Result<()> {
        let weight_str = format!("{weight:?}");
        let attrs_json = attrs.to_string();
        self.edges.write_record([
            src_id,
            dst_id,
            edge_type,
            weight_str.as_str(),
            attrs_json.as_str(),
        ])?;
        self.edges.flush()?;
        Ok(())
    }

    /// Append the run's metrics row. `elapsed_sec` is rounded to milliseconds
    /// but stays positive for any run that took time at all.
    pub fn write_metrics(&mut self, row: &MetricsRow) -> Result<()> {
        let mut elapsed = (row.elapsed_sec * 1000.0).round() / 1000.0;
        if elapsed == 0.0 && row.elapsed_sec > 0.0 {
            elapsed = 0.001;
        }
        let cols = [
            row.ts_iso.clone(),
            row.items_fetched.to_string(),
            row.items_written.to_string(),
            format!("{elapsed:?}"),
            row.success_calls.to_string(),
            row.error_calls.to_string(),
            row.dedup_skipped.to_string(),
        ];
        self.metrics.write_record(&cols)?;
        self.metrics.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftnet_common::{Platform, RecordKind};

    fn sample_record() -> CanonicalRecord {
        CanonicalRecord {
            id: "abc".to_string(),
            platform: Platform::Reddit,
            kind: RecordKind::Post,
            author_id: "u1".to_string(),
            author_name: "alice".to_string(),
            container_id: "evs".to_string(),
            container_name: "evs".to_string(),
            created_utc: 1_700_000_000.0,
            created_iso: "2023-11-14T22:13:20Z".to_string(),
            fetched_iso: "2023-11-15T00:00:00Z".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            text: "t\nb".to_string(),
            sentences: vec![],
            url: String::new(),
            outbound_urls: vec![],
            outbound_domains: vec![],
            score_upvotes: 1,
            num_comments: Some(0),
            parent_id: None,
            root_post_id: "abc".to_string(),
            depth: 0,
            relevance_score: 2.2,
            relevance_features: None,
            provenance: serde_json::json!({"endpoint": "test"}),
            content_hash: "h".to_string(),
        }
    }

    #[test]
    fn records_append_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut w = StoreWriter::open(dir.path()).unwrap();
            w.write_record(&sample_record()).unwrap();
        }
        {
            let mut w = StoreWriter::open(dir.path()).unwrap();
            w.write_record(&sample_record()).unwrap();
        }
        let lines = fs::read_to_string(dir.path().join("records.jsonl")).unwrap();
        assert_eq!(lines.lines().count(), 2);
        for line in lines.lines() {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["platform"], "reddit");
        }
    }

    #[test]
    fn node_and_edge_tables_start_fresh_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut w = StoreWriter::open(dir.path()).unwrap();
            w.write_node("reddit:post:abc", "post", &serde_json::json!({"subreddit": "evs"}))
                .unwrap();
            w.write_edge("reddit:post:abc", "BRAND", "MENTIONS_BRAND", 2.0, &serde_json::json!({}))
                .unwrap();
        }
        // Reopen truncates the graph tables back to just the header.
        let _ = StoreWriter::open(dir.path()).unwrap();
        let nodes = fs::read_to_string(dir.path().join("nodes.csv")).unwrap();
        assert_eq!(nodes.trim(), "node_id,node_type,attrs_json");
        let edges = fs::read_to_string(dir.path().join("edges.csv")).unwrap();
        assert_eq!(edges.trim(), "src_id,dst_id,edge_type,weight,attrs_json");
    }

    #[test]
    fn edge_row_formats_weight_and_sorted_attrs() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = StoreWriter::open(dir.path()).unwrap();
        let mut attrs = serde_json::Map::new();
        attrs.insert("b".to_string(), serde_json::json!(1));
        attrs.insert("a".to_string(), serde_json::json!(2));
        w.write_edge("x", "y", "REPLY_TO", 1.0, &serde_json::Value::Object(attrs))
            .unwrap();
        drop(w);
        let edges = fs::read_to_string(dir.path().join("edges.csv")).unwrap();
        let row = edges.lines().nth(1).unwrap();
        // Weight keeps its decimal point; attrs keys come out sorted.
        assert_eq!(row, "x,y,REPLY_TO,1.0,\"{\"\"a\"\":2,\"\"b\"\":1}\"");
    }

    #[test]
    fn metrics_header_written_once_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let row = MetricsRow {
            ts_iso: "2026-01-01T00:00:00Z".to_string(),
            items_fetched: 10,
            items_written: 3,
            elapsed_sec: 1.23456,
            success_calls: 0,
            error_calls: 1,
            dedup_skipped: 2,
        };
        for _ in 0..2 {
            let mut w = StoreWriter::open(dir.path()).unwrap();
            w.write_metrics(&row).unwrap();
        }
        let metrics = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = metrics.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], METRICS_HEADER.join(","));
        assert_eq!(lines[1], "2026-01-01T00:00:00Z,10,3,1.235,0,1,2");
        assert_eq!(lines[1], lines[2]);
    }
}
