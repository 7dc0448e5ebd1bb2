//! Policies and MCTS configs load from JSON with defaults for missing fields
//! and reject unknown fields and out-of-range values.

use std::time::Duration;

use wayfinder_search::{MctsConfig, SearchError, SearchPolicy};

#[test]
fn search_policy_fills_in_defaults() {
    let policy =
        SearchPolicy::from_json_str(r#"{"parallelism": 4, "node_evaluation_timeout_ms": 25}"#)
            .unwrap();
    assert_eq!(policy.parallelism, 4);
    assert_eq!(policy.node_evaluation_timeout(), Some(Duration::from_millis(25)));
    assert_eq!(policy.timeout(), None);
    assert_eq!(policy.max_expansions, None);
    assert_eq!(policy.cancel_poll_interval_ms, SearchPolicy::default().cancel_poll_interval_ms);
}

#[test]
fn search_policy_round_trips_through_json() {
    let policy = SearchPolicy {
        parallelism: 3,
        timeout_ms: Some(1_500),
        max_depth: Some(12),
        ..SearchPolicy::default()
    };
    let json = serde_json::to_string(&policy).unwrap();
    assert_eq!(SearchPolicy::from_json_str(&json).unwrap(), policy);
}

#[test]
fn search_policy_rejects_bad_input() {
    assert!(matches!(
        SearchPolicy::from_json_str(r#"{"paralelism": 4}"#),
        Err(SearchError::PolicyParse { .. })
    ));
    assert!(matches!(
        SearchPolicy::from_json_str(r#"{"parallelism": 0}"#),
        Err(SearchError::InvalidPolicy { .. })
    ));
    assert!(matches!(
        SearchPolicy::from_json_str(r#"{"timeout_ms": 0}"#),
        Err(SearchError::InvalidPolicy { .. })
    ));
    assert!(matches!(
        SearchPolicy::from_json_str("not json"),
        Err(SearchError::PolicyParse { .. })
    ));
}

#[test]
fn mcts_config_fills_in_defaults() {
    let config = MctsConfig::from_json_str(r#"{"seed": 99, "rollout_parallelism": 2}"#).unwrap();
    let defaults = MctsConfig::default();
    assert_eq!(config.seed, 99);
    assert_eq!(config.rollout_parallelism, 2);
    assert_eq!(config.iterations_per_call, defaults.iterations_per_call);
    assert!((config.exploration_constant - std::f64::consts::SQRT_2).abs() < 1e-12);
    assert!(config.taboo_exhausted);
}

#[test]
fn mcts_config_rejects_bad_input() {
    assert!(matches!(
        MctsConfig::from_json_str(r#"{"iterations_per_call": 0}"#),
        Err(SearchError::InvalidPolicy { .. })
    ));
    assert!(matches!(
        MctsConfig::from_json_str(r#"{"exploration_constant": -1.0}"#),
        Err(SearchError::InvalidPolicy { .. })
    ));
    assert!(matches!(
        MctsConfig::from_json_str(r#"{"rollouts": 5}"#),
        Err(SearchError::PolicyParse { .. })
    ));
}
