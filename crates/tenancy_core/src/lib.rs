//! Core logic of the multi-tenant authorization graph.
//! This crate is the single source of truth for tenancy invariants.

pub mod context;
pub mod db;
pub mod extension;
pub mod logging;
pub mod model;
pub mod repo;
pub mod router;

pub use context::{Environment, GenesisSeed, DEFAULT_GENESIS_NAME};
pub use extension::document_type::{DocumentAccess, DocumentType};
pub use extension::registry::{DocumentTypeRegistry, TypeRegistryError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::attributes::{AttributeError, Attributes, DataMap};
pub use model::document::Document;
pub use model::domain::{Domain, UNLIMITED_DEPTH};
pub use model::error::{EntityError, EntityResult};
pub use model::identity::{EntityId, EntityKind, Identity, GENESIS_ID};
pub use model::user::User;
pub use repo::sqlite_storage::SqliteStorage;
pub use repo::storage::{StorageError, StoragePort, StorageResult};
pub use router::{dispatch, RouteOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
