//! Tierlock Server Library
//!
//! Binding of the Tierlock core to storage and HTTP:
//! - SQLite storage for games, download links, the view ledger and
//!   moderation queues
//! - Bearer JWT principal resolution
//! - Engagement ledger and moderation intake services
//! - HTTP routes for access checks, link resolution, views and submissions

pub mod auth;
pub mod intake;
pub mod ledger;
pub mod routes;
pub mod storage;
