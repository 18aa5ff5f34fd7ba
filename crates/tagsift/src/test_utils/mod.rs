//! Test doubles shared by unit tests, integration tests and benchmarks.
//!
//! Compiled for `cfg(test)` and for the `test-support` feature.

mod scripted_source;

pub use scripted_source::{ScriptedSource, SelectionLog};
