//! In-memory history
//!
//! Bounded ring of recent results, newest first. Oldest entries are
//! evicted when capacity is reached.

use std::collections::VecDeque;

use parking_lot::RwLock;
use uuid::Uuid;

use super::HistorySink;
use crate::error::HistoryError;
use crate::logic::fusion::{AnalysisResult, RiskLevel};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
const DEFAULT_PAGE_SIZE: usize = 50;

// ============================================================================
// QUERY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: usize,
    pub offset: usize,
    pub risk_level: Option<RiskLevel>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            risk_level: None,
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

pub struct InMemoryHistory {
    /// Front = newest
    entries: RwLock<VecDeque<AnalysisResult>>,
    capacity: usize,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Newest first, filtered then paged.
    pub fn list(&self, query: HistoryQuery) -> Vec<AnalysisResult> {
        self.entries
            .read()
            .iter()
            .filter(|r| {
                query
                    .risk_level
                    .map_or(true, |level| r.threat_score().risk_level() == level)
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, analysis_id: Uuid) -> Option<AnalysisResult> {
        self.entries
            .read()
            .iter()
            .find(|r| r.analysis_id() == analysis_id)
            .cloned()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistorySink for InMemoryHistory {
    fn record(&self, result: &AnalysisResult) -> Result<(), HistoryError> {
        let mut entries = self.entries.write();

        if entries.iter().any(|r| r.analysis_id() == result.analysis_id()) {
            return Err(HistoryError::Duplicate(result.analysis_id().to_string()));
        }

        entries.push_front(result.clone());
        while entries.len() > self.capacity {
            entries.pop_back();
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
