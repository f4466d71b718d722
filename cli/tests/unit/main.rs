//! Unit tests for kindle CLI
//!
//! These tests drive the library with a recording `MockCommandRunner` and run
//! fast without external I/O.

mod architecture;
mod docker_provider;
mod helpers;
mod ignite_provider;
