//! Generic repository layer over a small SQLite record mapper.
//! One `Repository` type serves every model a container can build.

pub mod container;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use container::{Container, ContainerError, Instance};
pub use db::{open_db, open_db_in_memory, Database, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::{attributes, Attributes, Loaded, Model, Record, Relation, RelationKind, Value};
pub use query::{
    Builder, Criteria, Direction, Dispatched, LengthAwarePaginator, Operator, DEFAULT_PER_PAGE,
};
pub use repo::{RepoError, RepoResult, Repository, RepositoryDefinition};

/// Minimal health-check API for smoke probes.
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
