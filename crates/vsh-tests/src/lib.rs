//! Scenario tests for the voice smart-home bridge
//!
//! The tests drive a `DeviceManager` through the in-memory backend, the same
//! way the daemon does, without stdio in between.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vsh-tests
//! ```
//!
//! # Test Structure
//!
//! - `bridge_e2e_test.rs` - directive handling, collection, change reports

// This crate only contains tests, no library code
