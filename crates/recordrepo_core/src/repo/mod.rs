//! Repository layer over container-resolved models.
//!
//! # Responsibility
//! - Turn a `RepositoryDefinition` (the model-naming hook) into a working
//!   repository with CRUD, lookup, filtering and pagination.
//! - Keep query-builder state scoped to one logical operation.
//!
//! # Invariants
//! - Construction fails fast with `InvalidRepositoryModel` when the named
//!   binding is not a persistable model.
//! - Unknown dynamic calls fail with `UnknownOperation`; nothing is retried.

pub mod error;
mod instance;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use repository::{Repository, RepositoryDefinition};
