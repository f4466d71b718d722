//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod naming;
pub mod readiness;
pub mod shell;
pub mod status;

pub use config::KindleSettings;
pub use error::{CommandError, EndpointError, NodeError, PlanError};
pub use status::NodeAddress;
