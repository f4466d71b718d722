//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! ignite and docker backends, and settings files.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

mod backend;
pub mod command_runner;
pub mod config;
pub mod docker;
pub mod ignite;
