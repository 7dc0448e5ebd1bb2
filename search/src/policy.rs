//! Best-first search policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Parallelism, budgets and timeouts for [`crate::search::BestFirstSearch`].
///
/// Durations are milliseconds so the policy reads naturally from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchPolicy {
    /// Scheduler worker count. `1` evaluates children one at a time on a
    /// single worker, which makes insertion order (and tie-breaks)
    /// reproducible.
    pub parallelism: usize,
    /// Per-node evaluator wall-clock budget.
    pub node_evaluation_timeout_ms: Option<u64>,
    /// Global timeout, checked at the top of each step.
    pub timeout_ms: Option<u64>,
    /// Hard cap on node expansions.
    pub max_expansions: Option<u64>,
    /// Children deeper than this are pruned without evaluation.
    pub max_depth: Option<u32>,
    /// How often the control thread re-checks the cancel flag while it waits
    /// for a batch of evaluations.
    pub cancel_poll_interval_ms: u64,
}

impl SearchPolicy {
    /// Parse a policy from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::PolicyParse`] for malformed JSON or unknown
    /// fields, and [`SearchError::InvalidPolicy`] if the parsed policy fails
    /// [`Self::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, SearchError> {
        let policy: Self = serde_json::from_str(json).map_err(|e| SearchError::PolicyParse {
            detail: e.to_string(),
        })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if `parallelism` or
    /// `cancel_poll_interval_ms` is zero, or a timeout is zero.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.parallelism == 0 {
            return Err(SearchError::InvalidPolicy {
                detail: "parallelism must be at least 1".into(),
            });
        }
        if self.cancel_poll_interval_ms == 0 {
            return Err(SearchError::InvalidPolicy {
                detail: "cancel_poll_interval_ms must be at least 1".into(),
            });
        }
        if self.node_evaluation_timeout_ms == Some(0) {
            return Err(SearchError::InvalidPolicy {
                detail: "node_evaluation_timeout_ms must be positive when set".into(),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(SearchError::InvalidPolicy {
                detail: "timeout_ms must be positive when set".into(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn node_evaluation_timeout(&self) -> Option<Duration> {
        self.node_evaluation_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            parallelism: 1,
            node_evaluation_timeout_ms: None,
            timeout_ms: None,
            max_expansions: None,
            max_depth: None,
            cancel_poll_interval_ms: 10,
        }
    }
}

/// Millisecond count of a configured duration, saturating. Sub-millisecond
/// durations round up to 1; zero is rejected like a zero in JSON.
pub(crate) fn duration_to_millis(d: Duration, field: &str) -> Result<u64, SearchError> {
    if d.is_zero() {
        return Err(SearchError::InvalidPolicy {
            detail: format!("{field} must be positive when set"),
        });
    }
    Ok(u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1))
}
