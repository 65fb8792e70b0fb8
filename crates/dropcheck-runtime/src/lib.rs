//! Scenario orchestration for the dropcheck harness.
//!
//! A scenario provisions a credential record and an application, lets the
//! platform build it, fetches the resulting artifact, checks the launch
//! command inside it, and tears everything down again whatever happened.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod context;
pub mod engine;
pub mod report;
pub mod teardown;
pub mod verify;
