//! Integration test crate for the GTT yield core.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise flows spanning multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p gtt-integration-tests
//! ```
