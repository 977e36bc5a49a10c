//! `SQLite` storage for the Tierlock server.
//!
//! Provides persistence for games, download links, the view ledger and the
//! moderation intake queues.

mod db;
mod models;
mod queries;
mod queries_intake;
mod queries_ledger;


pub use db::{Database, DatabaseError};
pub use models::*;
pub use queries::{GameParams, LinkParams};
pub use queries_intake::SubmissionParams;
