//! Database connection and initialization.

pub use tierlock_core::db::DatabaseError;

tierlock_core::define_database!(Database, "Tierlock database migrations complete");
