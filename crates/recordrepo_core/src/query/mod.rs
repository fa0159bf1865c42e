//! Query-builder collaborator wrapped by repositories.
//!
//! # Responsibility
//! - Compile model-bound queries to parameterized SQLite statements.
//! - Eager-load named relations and paginate results.
//! - Expose a statically enumerated method table for name-based calls.
//!
//! # Invariants
//! - Identifiers are validated by `identifier::is_identifier` before use.
//! - A builder never outlives one logical repository operation.

pub mod builder;
pub mod criteria;
pub mod dispatch;
mod eager;
pub mod identifier;
pub mod paginator;

pub use builder::{Builder, Direction};
pub use criteria::{Condition, Criteria, Operator};
pub use dispatch::{normalize_method_name, Dispatched, BUILDER_METHODS};
pub use paginator::{LengthAwarePaginator, DEFAULT_PER_PAGE};
