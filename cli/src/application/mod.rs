//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` — never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod command;
pub mod ports;
pub mod services;

pub use command::{Invocation, NodeCommand};
pub use ports::{
    CommandRunner, CommandTransport, ImagePuller, LaunchRequest, Node, NodeLauncher,
    ProgressReporter, Provider, SettingsStore,
};
