//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application` — never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod cluster;
pub mod images;
pub mod nodes;
pub mod planner;
pub mod provision;
pub mod retry;
pub mod storage;
