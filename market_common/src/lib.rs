//!
//! Common types and utilities shared by the market dashboard server and client.
//!
//! This crate aggregates:
//! - `error`: unified error type `MarketError` used across the workspace.
//! - `result`: handy `Result<T, MarketError>` alias.
//! - `symbols`: regions, default symbol lists and parsing helpers.
//! - `quote`: stock and crypto quote models plus market overviews.
//! - `status`: source health, metrics and admin reports.
//! - `api`: the JSON envelope of the HTTP API.
//! - `net`: networking constants and small helpers.
//! - `session`: regular trading hours and open/closed status of each region.
#![warn(missing_docs)]
pub mod api;
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod session;
pub mod status;
pub mod symbols;

pub use api::ApiResponse;
pub use error::MarketError;
pub use result::Result;
