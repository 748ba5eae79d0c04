//! Bounded top-K selection over negated ranking keys.
//!
//! Usage values are stored negated so a min-ordered heap pops the
//! heaviest consumer first. Ties fall back to pid ascending, which keeps
//! the output order deterministic for equal usage values.

use crate::config::Limit;
use crate::types::ProcessRecord;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// One heap entry: the negated usage value and the pid it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RankEntry {
    pub key: f64,
    pub pid: u32,
}

impl RankEntry {
    pub fn new(usage: f64, pid: u32) -> Self {
        RankEntry { key: -usage, pid }
    }
}

impl PartialEq for RankEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankEntry {}

impl PartialOrd for RankEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .partial_cmp(&other.key)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.pid.cmp(&other.pid))
    }
}

/// Pop the `limit` highest-usage processes, pairing each pid with its
/// record from the side table. An entry whose pid is missing from
/// `records` is dropped rather than reported half-empty.
pub fn select_top(
    entries: Vec<RankEntry>,
    records: &HashMap<u32, ProcessRecord>,
    limit: Limit,
) -> Vec<(u32, ProcessRecord)> {
    let mut heap: BinaryHeap<Reverse<RankEntry>> = entries.into_iter().map(Reverse).collect();
    let mut remaining = match limit {
        Limit::All => heap.len(),
        Limit::Count(n) => n.min(heap.len()),
    };
    let mut out = Vec::with_capacity(remaining);
    while remaining > 0 {
        let Some(Reverse(entry)) = heap.pop() else {
            break;
        };
        if let Some(record) = records.get(&entry.pid) {
            out.push((entry.pid, record.clone()));
            remaining -= 1;
        }
    }
    out
}
