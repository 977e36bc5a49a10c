//! Tierlock Core Library
//!
//! Entitlement and engagement primitives shared by Tierlock components:
//! - Role and access tier model
//! - Entitlement policy engine
//! - Download link resolution
//! - Configuration resolution and hierarchy
//! - Shared SQLite helpers and error types

pub mod config;
pub mod db;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod resource;
pub mod tier;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use policy::{AccessDecision, Denial, Principal, check_access};
pub use resolver::{ResolveError, resolve};
pub use resource::{DownloadLink, Game, RankedUrls};
pub use tier::{AccessTier, Role, Tier};
