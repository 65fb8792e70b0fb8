//! Platform lifecycle API for the dropcheck harness.
//!
//! The orchestrator only ever talks to [`backend::PlatformBackend`]; the
//! [`backend::cf::CfCliBackend`] implementation drives a real Cloud Foundry
//! foundation through the `cf` command-line client.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod exec;
