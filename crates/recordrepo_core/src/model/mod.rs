//! Persistable record capability and dynamic record data.
//!
//! # Responsibility
//! - Define the `Model` contract every repository target must satisfy.
//! - Provide the dynamic `Record` returned by queries and repositories.
//!
//! # Invariants
//! - Models are backed by exactly one named table with one primary key.
//! - Mass assignment only touches columns listed in `Model::fillable`.

pub mod record;
pub mod relation;
pub mod value;

pub use record::Record;
pub use relation::{Loaded, Relation, RelationKind};
pub use value::{attributes, Attributes, Value};

use crate::query::identifier::is_identifier;

/// Persistable record capability.
///
/// Implementations describe how one record type maps to tabular storage.
/// Instances are cheap descriptors; row data lives in [`Record`].
pub trait Model: Send + Sync + 'static {
    /// Backing table name.
    fn table(&self) -> &str;

    /// Primary key column.
    fn key_name(&self) -> &str {
        "id"
    }

    /// Columns accepted by mass assignment.
    fn fillable(&self) -> &[&'static str];

    /// Whether `created_at`/`updated_at` are maintained on writes.
    fn timestamps(&self) -> bool {
        false
    }

    /// Resolves a named relation for eager loading.
    fn relation(&self, _name: &str) -> Option<Relation> {
        None
    }

    /// Human-readable model name used in diagnostics.
    fn model_name(&self) -> &str {
        self.table()
    }
}

/// Checks the storage-facing parts of a model descriptor.
///
/// Returns the first offending identifier on failure.
pub(crate) fn check_capability(model: &dyn Model) -> Result<(), String> {
    let table = model.table();
    if !is_identifier(table) {
        return Err(format!("table `{table}`"));
    }
    let key = model.key_name();
    if !is_identifier(key) {
        return Err(format!("key `{key}`"));
    }
    if let Some(column) = model
        .fillable()
        .iter()
        .find(|column| !is_identifier(column))
    {
        return Err(format!("fillable column `{column}`"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_capability, Model};

    struct Users;

    impl Model for Users {
        fn table(&self) -> &str {
            "users"
        }

        fn fillable(&self) -> &[&'static str] {
            &["email", "password"]
        }
    }

    struct Broken;

    impl Model for Broken {
        fn table(&self) -> &str {
            ""
        }

        fn fillable(&self) -> &[&'static str] {
            &["email"]
        }
    }

    struct Injected;

    impl Model for Injected {
        fn table(&self) -> &str {
            "users"
        }

        fn fillable(&self) -> &[&'static str] {
            &["email; DROP TABLE users"]
        }
    }

    #[test]
    fn capability_accepts_plain_identifiers() {
        assert!(check_capability(&Users).is_ok());
        assert_eq!(Users.key_name(), "id");
        assert_eq!(Users.model_name(), "users");
    }

    #[test]
    fn capability_rejects_missing_table_and_bad_columns() {
        assert!(check_capability(&Broken)
            .expect_err("empty table must fail")
            .contains("table"));
        assert!(check_capability(&Injected)
            .expect_err("bad column must fail")
            .contains("fillable"));
    }
}
