//! Shared test utilities for sitepack
//!
//! - An in-memory asset fetcher with call counting
//! - Content fixtures shaped like a small marketing site

pub mod fetcher;
pub mod fixtures;
