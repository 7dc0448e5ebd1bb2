//! MCTS configuration.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Budgets and knobs for [`super::MctsSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MctsConfig {
    /// Playouts performed by one [`super::MctsSearch::run`] call.
    pub iterations_per_call: u64,
    /// Rollouts stop after this many steps below the tree leaf.
    pub max_rollout_depth: Option<u32>,
    /// UCB1 exploration weight `c` in `mean + c * sqrt(ln N / n)`.
    /// The default `√2` gives the textbook `mean + sqrt(2 ln N / n)`.
    pub exploration_constant: f64,
    /// Seed for tree-phase choices and per-rollout generators.
    pub seed: u64,
    /// Rollouts run concurrently per batch. `1` runs them inline.
    pub rollout_parallelism: usize,
    /// Reward backed up when the playout evaluator fails.
    pub failure_reward: f64,
    /// Skip fully enumerated subtrees during selection.
    pub taboo_exhausted: bool,
}

impl MctsConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`SearchError::PolicyParse`] for malformed JSON or unknown fields,
    /// [`SearchError::InvalidPolicy`] if the result fails [`Self::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, SearchError> {
        let config: Self = serde_json::from_str(json).map_err(|e| SearchError::PolicyParse {
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] for a zero iteration count or
    /// rollout parallelism, or a negative or non-finite exploration constant
    /// or failure reward.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |detail: &str| {
            Err(SearchError::InvalidPolicy {
                detail: detail.into(),
            })
        };
        if self.iterations_per_call == 0 {
            return invalid("iterations_per_call must be at least 1");
        }
        if self.rollout_parallelism == 0 {
            return invalid("rollout_parallelism must be at least 1");
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return invalid("exploration_constant must be finite and non-negative");
        }
        if !self.failure_reward.is_finite() {
            return invalid("failure_reward must be finite");
        }
        Ok(())
    }
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations_per_call: 100,
            max_rollout_depth: Some(1_000),
            exploration_constant: std::f64::consts::SQRT_2,
            seed: 0,
            rollout_parallelism: 1,
            failure_reward: 0.0,
            taboo_exhausted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_ucb1() {
        let config = MctsConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.exploration_constant.powi(2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config =
            MctsConfig::from_json_str(r#"{"seed": 7, "rollout_parallelism": 4}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.rollout_parallelism, 4);
        assert_eq!(config.iterations_per_call, 100);
    }

    #[test]
    fn negative_exploration_rejected() {
        let err = MctsConfig::from_json_str(r#"{"exploration_constant": -1.0}"#).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPolicy { .. }), "{err:?}");
    }
}
