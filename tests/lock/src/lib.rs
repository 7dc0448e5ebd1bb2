//! Acceptance tests for the search engines. The tests live in `tests/`;
//! this library holds the worlds and observers they share.

#![forbid(unsafe_code)]

pub mod fixtures;
