//! # dropcheck-artifact
//!
//! Inspection of deployment artifacts produced by a remote build.
//!
//! Handles:
//! - **Archive**: single-pass lookup of one named entry in a `.tgz` artifact.
//! - **Manifest**: typed extraction and normalized comparison of a JSON field.
//! - **Hashing**: SHA-256 digests of fetched artifacts.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod archive;
pub mod hash;
pub mod manifest;
