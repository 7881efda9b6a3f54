//! Persistence layer and database migrations.
//!
//! The service uses a `SQLite` database for the dashboard's relational data.
//! The schema is managed with Diesel migrations so the database can be
//! created and upgraded consistently across machines. The pipeline consumes
//! the store through the [`CategorizationStore`] trait.

mod error;
mod migrator;
mod store;

pub use error::PersistenceError;
pub use migrator::{INITIAL_SCHEMA_VERSION, SchemaVersion, migrate_database};
pub use store::{
    AiSettings, AiStatus, CategorizationStore, CategoryRecord, OrganizationRecord,
    PullRequestRecord, RepositoryRecord, SqliteStore,
};

#[cfg(any(test, feature = "test-support"))]
pub use store::test_support;

#[cfg(test)]
pub use store::MockCategorizationStore;
