//! Crawl a package dependency graph from a remote registry and report the
//! declared license of every package version in it.

pub mod config;
pub mod crawl;
pub mod logging;
pub mod metadata;
