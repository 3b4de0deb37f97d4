//! Lifecycle tracking for a grid search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Lifecycle state of a search. There is no pause or cancel: a running
/// search either finishes or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    Idle,
    Running,
    Done,
    Failed,
}

/// Aggregate status of one driver's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatus {
    pub id: SearchId,
    pub state: SearchState,
    /// Number of (origin, source) pairs evaluated so far.
    pub evaluations: usize,
    /// Number of (origin, source) pairs in this search.
    pub total: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SearchStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SearchState::Idle,
            evaluations: 0,
            total: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self, total: usize) {
        self.state = SearchState::Running;
        self.total = total;
        self.evaluations = 0;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_done(&mut self) {
        self.state = SearchState::Done;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = SearchState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Fraction of evaluations completed, in [0, 1]. An empty search is complete.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return if self.state == SearchState::Done { 1.0 } else { 0.0 };
        }
        self.evaluations as f64 / self.total as f64
    }
}

impl Default for SearchStatus {
    fn default() -> Self {
        Self::new()
    }
}
