//! Name-based dispatch onto the query builder.
//!
//! The forwardable surface is enumerated statically in `BUILDER_METHODS`;
//! anything outside it is reported as an unknown operation.

use super::builder::{Builder, Direction};
use super::paginator::LengthAwarePaginator;
use crate::model::{Record, Value};
use crate::repo::error::{RepoError, RepoResult};

/// Builder methods reachable through name-based dispatch.
pub const BUILDER_METHODS: &[&str] = &[
    "get_table",
    "get_key_name",
    "to_sql",
    "get",
    "first",
    "count",
    "exists",
    "where",
    "order_by",
    "latest",
    "limit",
    "offset",
    "with",
];

const DEFAULT_LATEST_COLUMN: &str = "created_at";

/// Result of a dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The call modified the builder and returned it for chaining.
    Builder,
    Text(String),
    Count(u64),
    Flag(bool),
    Record(Option<Record>),
    Records(Vec<Record>),
    Page(LengthAwarePaginator),
    Deleted(bool),
}

impl Dispatched {
    /// Whether the call executed a query against storage.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Builder | Self::Text(_))
    }
}

/// Converts `getTable` style names to `get_table`.
pub fn normalize_method_name(method: &str) -> String {
    let mut normalized = String::with_capacity(method.len() + 4);
    for (index, ch) in method.trim().chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                normalized.push('_');
            }
            normalized.push(ch.to_ascii_lowercase());
        } else {
            normalized.push(ch);
        }
    }
    normalized
}

impl Builder {
    /// Whether `method` (snake_case or camelCase) is forwardable.
    pub fn responds_to(method: &str) -> bool {
        BUILDER_METHODS.contains(&normalize_method_name(method).as_str())
    }

    /// Invokes a builder method by name with positional arguments.
    pub fn dispatch(&mut self, method: &str, args: &[Value]) -> RepoResult<Dispatched> {
        let name = normalize_method_name(method);
        match name.as_str() {
            "get_table" => Ok(Dispatched::Text(self.table().to_string())),
            "get_key_name" => Ok(Dispatched::Text(self.key_name().to_string())),
            "to_sql" => Ok(Dispatched::Text(self.to_sql()?)),
            "get" => {
                let columns = text_args(method, args)?;
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                Ok(Dispatched::Records(self.get(&columns)?))
            }
            "first" => {
                let columns = text_args(method, args)?;
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                Ok(Dispatched::Record(self.first(&columns)?))
            }
            "count" => Ok(Dispatched::Count(self.count()?)),
            "exists" => Ok(Dispatched::Flag(self.exists()?)),
            "where" => {
                match args {
                    [column, value] => {
                        self.where_eq(text_arg(method, column)?, value.clone());
                    }
                    [column, operator, value] => {
                        self.where_op(
                            text_arg(method, column)?,
                            text_arg(method, operator)?,
                            value.clone(),
                        );
                    }
                    _ => return Err(arity_error(method, "2 or 3", args.len())),
                }
                Ok(Dispatched::Builder)
            }
            "order_by" => {
                let (column, direction) = match args {
                    [column] => (text_arg(method, column)?, Direction::Asc),
                    [column, direction] => {
                        let raw = text_arg(method, direction)?;
                        let direction = Direction::parse(raw).ok_or_else(|| {
                            RepoError::InvalidArgument(format!(
                                "`{method}` direction must be asc or desc, got `{raw}`"
                            ))
                        })?;
                        (text_arg(method, column)?, direction)
                    }
                    _ => return Err(arity_error(method, "1 or 2", args.len())),
                };
                self.order_by(column, direction);
                Ok(Dispatched::Builder)
            }
            "latest" => {
                let column = match args {
                    [] => DEFAULT_LATEST_COLUMN,
                    [column] => text_arg(method, column)?,
                    _ => return Err(arity_error(method, "0 or 1", args.len())),
                };
                self.latest(column);
                Ok(Dispatched::Builder)
            }
            "limit" => {
                let limit = count_arg(method, args)?;
                self.limit(limit);
                Ok(Dispatched::Builder)
            }
            "offset" => {
                let offset = count_arg(method, args)?;
                self.offset(offset);
                Ok(Dispatched::Builder)
            }
            "with" => {
                let relations = text_args(method, args)?;
                self.with(relations);
                Ok(Dispatched::Builder)
            }
            _ => Err(RepoError::UnknownOperation(method.to_string())),
        }
    }
}

fn text_arg<'a>(method: &str, value: &'a Value) -> RepoResult<&'a str> {
    value.as_str().ok_or_else(|| {
        RepoError::InvalidArgument(format!("`{method}` expects text arguments, got `{value}`"))
    })
}

fn text_args(method: &str, args: &[Value]) -> RepoResult<Vec<String>> {
    args.iter()
        .map(|value| text_arg(method, value).map(str::to_string))
        .collect()
}

fn count_arg(method: &str, args: &[Value]) -> RepoResult<u32> {
    match args {
        [value] => value
            .as_i64()
            .and_then(|number| u32::try_from(number).ok())
            .ok_or_else(|| {
                RepoError::InvalidArgument(format!(
                    "`{method}` expects a non-negative integer, got `{value}`"
                ))
            }),
        _ => Err(arity_error(method, "1", args.len())),
    }
}

fn arity_error(method: &str, expected: &str, actual: usize) -> RepoError {
    RepoError::InvalidArgument(format!(
        "`{method}` expects {expected} arguments, got {actual}"
    ))
}

#[cfg(test)]
mod tests {
    use super::{normalize_method_name, Dispatched};
    use crate::db::open_db_in_memory;
    use crate::model::{Model, Value};
    use crate::query::Builder;
    use crate::repo::error::RepoError;
    use std::sync::Arc;

    struct Users;

    impl Model for Users {
        fn table(&self) -> &str {
            "users"
        }

        fn fillable(&self) -> &[&'static str] {
            &["email"]
        }
    }

    #[test]
    fn normalizes_camel_case_names() {
        assert_eq!(normalize_method_name("getTable"), "get_table");
        assert_eq!(normalize_method_name("orderBy"), "order_by");
        assert_eq!(normalize_method_name("get_key_name"), "get_key_name");
    }

    #[test]
    fn responds_to_enumerated_methods_only() {
        assert!(Builder::responds_to("getTable"));
        assert!(Builder::responds_to("where"));
        assert!(!Builder::responds_to("veryBadMethod"));
    }

    #[test]
    fn dispatch_forwards_and_modifies_builder() {
        let mut query = Builder::new(open_db_in_memory().expect("db"), Arc::new(Users));

        assert_eq!(
            query.dispatch("getTable", &[]).expect("get_table"),
            Dispatched::Text("users".to_string())
        );
        assert_eq!(
            query
                .dispatch("where", &[Value::from("id"), Value::from("<>"), Value::from(1)])
                .expect("where"),
            Dispatched::Builder
        );
        assert_eq!(
            query
                .dispatch("orderBy", &[Value::from("id"), Value::from("desc")])
                .expect("order_by"),
            Dispatched::Builder
        );
        assert_eq!(
            query.to_sql().expect("sql"),
            "SELECT * FROM \"users\" WHERE \"id\" <> ? ORDER BY \"id\" DESC"
        );
    }

    #[test]
    fn dispatch_rejects_unknown_methods_and_bad_arguments() {
        let mut query = Builder::new(open_db_in_memory().expect("db"), Arc::new(Users));

        assert!(matches!(
            query.dispatch("veryBadMethod", &[]),
            Err(RepoError::UnknownOperation(name)) if name == "veryBadMethod"
        ));
        assert!(matches!(
            query.dispatch("limit", &[Value::from(-1)]),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            query.dispatch("where", &[Value::from("id")]),
            Err(RepoError::InvalidArgument(_))
        ));
    }
}
