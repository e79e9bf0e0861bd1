//! Common test utilities and fixtures for gitops-engine integration tests
//!
//! This module provides:
//! - `TestRepo` builder for temporary repositories, remotes and providers
//! - Custom assertions for error kinds and JSON output

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod assertions;
pub mod test_repo;

pub use assertions::*;
pub use test_repo::{git_available, TestRepo};
