//! The crawl frontier: a max-priority queue of pending fetch tasks plus the
//! run-scoped seen-set used for dedup.
//!
//! Both live for exactly one run and are never persisted. The queue and the
//! seen-set are independent: pushing a task does not mark anything seen, and
//! callers combine the two explicitly where dedup is wanted.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Addressing for one pending fetch. Pure data, no fetch logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierTask {
    Search { community: String, query: String },
    Comments { thread_id: String },
    Author { name: String },
    Submission { id: String, community: String },
}

#[derive(Debug)]
struct FrontierEntry {
    priority: f64,
    seq: u64,
    task: FrontierTask,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    /// Greatest priority wins; equal priorities pop in insertion order.
    /// The tie-break is part of the frontier's contract, so it lives in the
    /// ordering itself rather than relying on heap layout.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    next_seq: u64,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task. Always succeeds; assigns the next sequence number.
    pub fn push(&mut self, priority: f64, task: FrontierTask) {
        self.heap.push(FrontierEntry {
            priority,
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    /// Remove and return the highest-priority task, oldest first on ties.
    pub fn pop(&mut self) -> Option<(f64, FrontierTask)> {
        self.heap.pop().map(|e| (e.priority, e.task))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn mark_seen(&mut self, key: impl Into<String>) {
        self.seen.insert(key.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(tag: &str) -> FrontierTask {
        FrontierTask::Search {
            community: tag.to_string(),
            query: "q".to_string(),
        }
    }

    #[test]
    fn pops_highest_priority_with_fifo_ties() {
        let mut fr = Frontier::new();
        fr.push(3.0, search("first-three"));
        fr.push(1.0, search("one"));
        fr.push(3.0, search("second-three"));
        fr.push(2.0, search("two"));

        let popped: Vec<(f64, FrontierTask)> = std::iter::from_fn(|| fr.pop()).collect();
        let priorities: Vec<f64> = popped.iter().map(|(p, _)| *p).collect();
        assert_eq!(priorities, vec![3.0, 3.0, 2.0, 1.0]);

        // Equal priorities keep their push order.
        assert_eq!(popped[0].1, search("first-three"));
        assert_eq!(popped[1].1, search("second-three"));
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let mut fr = Frontier::new();
        assert!(fr.pop().is_none());
        assert_eq!(fr.len(), 0);
        assert!(fr.is_empty());
    }

    #[test]
    fn seen_set_is_independent_of_queue() {
        let mut fr = Frontier::new();
        assert!(!fr.seen("abc"));
        fr.mark_seen("abc");
        assert!(fr.seen("abc"));
        // Marking seen does not touch the queue, pushing does not mark seen.
        assert_eq!(fr.len(), 0);
        fr.push(1.0, search("x"));
        assert!(!fr.seen("x"));
    }

    #[test]
    fn len_tracks_pushes_and_pops() {
        let mut fr = Frontier::new();
        fr.push(1.0, search("a"));
        fr.push(2.0, search("b"));
        assert_eq!(fr.len(), 2);
        fr.pop();
        assert_eq!(fr.len(), 1);
    }
}
