//! Wayfinder harness: example worlds, evaluators and run drivers for
//! `wayfinder-search`.
//!
//! The harness owns everything the engines deliberately leave out:
//!
//! - concrete graphs to search ([`worlds`]),
//! - node and playout evaluators for them ([`evaluators`]),
//! - event transcripts as canonical JSON lines with a hash chain
//!   ([`transcript`], [`canon`], [`hash`]),
//! - one-call drivers that package a run for comparison ([`runner`]),
//! - `tracing` subscriber setup ([`logging`]).
//!
//! The harness never changes search semantics. Everything here goes through
//! the public engine API.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod canon;
pub mod evaluators;
pub mod hash;
pub mod logging;
pub mod runner;
pub mod transcript;
pub mod worlds;

pub use runner::{run_best_first, run_mcts, BestFirstRun, MctsRun, RunError};
pub use transcript::Transcript;
