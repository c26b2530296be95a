//! Bounded execution history.
//!
//! Keeps the most recent node execution records in memory, newest
//! first. The bound is fixed at construction; pushing past it evicts
//! the oldest record.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use switchyard_workflow::{NodeExecution, NodeRunStatus};

const DEFAULT_CAPACITY: usize = 1000;

/// Aggregate counts over the retained history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Records per node type, sorted by type name.
    pub by_node_type: BTreeMap<String, usize>,
}

impl HistoryStats {
    /// Completed records as a fraction of the total; 0 when empty.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// A bounded, newest-first record of node executions.
pub struct ExecutionHistory {
    records: Mutex<VecDeque<NodeExecution>>,
    capacity: usize,
}

impl ExecutionHistory {
    /// A history bounded at the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A history bounded at `capacity` records. A zero capacity
    /// retains nothing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
        }
    }

    /// Records one finished node execution.
    pub fn push(&self, record: NodeExecution) {
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if self.capacity == 0 {
            return;
        }
        if records.len() == self.capacity {
            records.pop_back();
        }
        records.push_front(record);
    }

    /// Returns up to `limit` records, newest first, optionally
    /// restricted to one status.
    #[must_use]
    pub fn recent(&self, limit: usize, status: Option<NodeRunStatus>) -> Vec<NodeExecution> {
        let Ok(records) = self.records.lock() else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|record| status.is_none_or(|wanted| record.status == wanted))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregates counts over the retained records.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let Ok(records) = self.records.lock() else {
            return HistoryStats::default();
        };
        let mut stats = HistoryStats {
            total: records.len(),
            ..HistoryStats::default()
        };
        for record in records.iter() {
            match record.status {
                NodeRunStatus::Completed => stats.completed += 1,
                NodeRunStatus::Failed => stats.failed += 1,
                NodeRunStatus::Skipped => stats.skipped += 1,
                NodeRunStatus::Pending | NodeRunStatus::Running => {}
            }
            *stats
                .by_node_type
                .entry(record.node_type.clone())
                .or_insert(0) += 1;
        }
        stats
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new()
    }
}
