//! Integration tests for sitepack
//!
//! These tests drive whole exports: loading, walking both snapshots,
//! materializing, and writing packages.

#[path = "../common/mod.rs"]
pub mod common;

pub mod export_flow;
pub mod package_output;
