//! In-memory building blocks of the data services.
//!
//! This module groups the state each service keeps between requests:
//! - `ttl_cache`: per-symbol expiring cache with stale reads.
//! - `failure_tracker`: consecutive-failure counter driving the source status.
//! - `sample_data`: synthetic quotes substituted when live calls fail.
//! - `request_stats`: per-route response times and error counts of the HTTP layer.

pub mod failure_tracker;
pub mod request_stats;
pub mod sample_data;
pub mod ttl_cache;
