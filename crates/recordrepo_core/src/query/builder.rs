//! Fluent query builder bound to one model.
//!
//! # Responsibility
//! - Accumulate conditions, ordering, paging and eager-load names.
//! - Compile them to parameterized SQLite statements and run them.
//!
//! # Invariants
//! - Every identifier is validated before it is interpolated into SQL.
//! - Values are always bound as parameters, never interpolated.
//! - The connection lock is released before eager loads run.

use super::criteria::{Condition, Criteria, Operator};
use super::eager::{load_relations, parent_columns};
use super::identifier::{is_identifier, quote};
use super::paginator::LengthAwarePaginator;
use crate::db::Database;
use crate::model::{Attributes, Model, Record, Value};
use crate::repo::error::{RepoError, RepoResult};
use log::debug;
use rusqlite::params_from_iter;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
enum Clause {
    Basic(Condition),
    In { column: String, values: Vec<Value> },
}

/// Query-builder handle for one model.
#[derive(Clone)]
pub struct Builder {
    db: Database,
    model: Arc<dyn Model>,
    clauses: Vec<Clause>,
    eager: Vec<String>,
    orders: Vec<(String, Direction)>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Builder {
    pub fn new(db: Database, model: Arc<dyn Model>) -> Self {
        Self {
            db,
            model,
            clauses: Vec::new(),
            eager: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    pub fn table(&self) -> &str {
        self.model.table()
    }

    pub fn key_name(&self) -> &str {
        self.model.key_name()
    }

    /// Relation names queued for eager loading.
    pub fn eager_loads(&self) -> &[String] {
        &self.eager
    }

    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.clauses
            .push(Clause::Basic(Condition::equals(column, value)));
        self
    }

    pub fn where_op(&mut self, column: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.clauses
            .push(Clause::Basic(Condition::new(column, operator, value)));
        self
    }

    pub fn where_in(&mut self, column: &str, values: Vec<Value>) -> &mut Self {
        self.clauses.push(Clause::In {
            column: column.to_string(),
            values,
        });
        self
    }

    /// Adds every condition of `criteria` as a conjunction.
    pub fn apply(&mut self, criteria: impl Into<Criteria>) -> &mut Self {
        self.clauses.extend(
            criteria
                .into()
                .into_conditions()
                .into_iter()
                .map(Clause::Basic),
        );
        self
    }

    /// Queues relations for eager loading; duplicates are ignored.
    pub fn with<I, S>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.eager.contains(&relation) {
                self.eager.push(relation);
            }
        }
        self
    }

    pub fn order_by(&mut self, column: &str, direction: Direction) -> &mut Self {
        self.orders.push((column.to_string(), direction));
        self
    }

    /// Newest first by `column`.
    pub fn latest(&mut self, column: &str) -> &mut Self {
        self.order_by(column, Direction::Desc)
    }

    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u32) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Runs the query and returns every matching record.
    ///
    /// `columns` empty or `["*"]` selects all columns. An explicit column
    /// list is extended with the parent keys of queued relations.
    pub fn get(&self, columns: &[&str]) -> RepoResult<Vec<Record>> {
        let keys = parent_columns(self.model.as_ref(), &self.eager)?;
        let mut selected = columns.to_vec();
        if !(selected.is_empty() || selected == ["*"]) {
            for key in &keys {
                if !selected.contains(&key.as_str()) {
                    selected.push(key.as_str());
                }
            }
        }

        let (sql, binds) = self.compile_select(&selected)?;
        let rows = select_rows(&self.db, &sql, &binds)?;
        let mut records: Vec<Record> = rows
            .into_iter()
            .map(|row| Record::from_row(Arc::clone(&self.model), row))
            .collect();
        load_relations(&self.db, &self.model, &mut records, &self.eager)?;
        Ok(records)
    }

    pub fn first(&self, columns: &[&str]) -> RepoResult<Option<Record>> {
        let mut query = self.clone();
        query.limit(1);
        Ok(query.get(columns)?.into_iter().next())
    }

    /// Looks a record up by primary key on top of existing conditions.
    pub fn find(&self, id: impl Into<Value>, columns: &[&str]) -> RepoResult<Option<Record>> {
        let mut query = self.clone();
        let key = self.model.key_name().to_string();
        query.where_eq(&key, id);
        query.first(columns)
    }

    /// Counts matching rows, ignoring ordering and paging.
    pub fn count(&self) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.quoted_table()?);
        let mut binds = Vec::new();
        self.compile_where(&mut sql, &mut binds)?;
        debug!("event=query_count module=query table={} sql={}", self.table(), sql);

        let conn = self.db.lock();
        let count: i64 = conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    pub fn exists(&self) -> RepoResult<bool> {
        Ok(self.count()? > 0)
    }

    /// Returns one page of results with the total count behind it.
    ///
    /// Page numbers start at 1; 0 is treated as 1.
    pub fn paginate(
        &self,
        per_page: u32,
        page: u32,
        columns: &[&str],
    ) -> RepoResult<LengthAwarePaginator> {
        if per_page == 0 {
            return Err(RepoError::InvalidArgument(
                "per_page must be greater than zero".to_string(),
            ));
        }
        let page = page.max(1);
        let total = self.count()?;

        let offset = u64::from(page - 1) * u64::from(per_page);
        let items = if offset < total {
            let mut query = self.clone();
            query
                .limit(per_page)
                .offset(u32::try_from(offset).unwrap_or(u32::MAX));
            query.get(columns)?
        } else {
            Vec::new()
        };

        Ok(LengthAwarePaginator::new(items, total, per_page, page))
    }

    /// Inserts one row and returns its primary key.
    ///
    /// When `attributes` carries the key it is returned as given, otherwise
    /// the SQLite row id is used.
    pub fn insert(&self, attributes: &Attributes) -> RepoResult<Value> {
        let table = self.quoted_table()?;
        let sql = if attributes.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let columns = attributes
                .keys()
                .map(|column| checked_column(column))
                .collect::<RepoResult<Vec<_>>>()?;
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                columns.join(", ")
            )
        };
        debug!("event=query_insert module=query table={} sql={}", self.table(), sql);

        let conn = self.db.lock();
        conn.execute(&sql, params_from_iter(attributes.values()))?;
        match attributes.get(self.model.key_name()) {
            Some(key) if !key.is_null() => Ok(key.clone()),
            _ => Ok(Value::Integer(conn.last_insert_rowid())),
        }
    }

    /// Updates every matching row and returns the affected row count.
    pub fn update(&self, attributes: &Attributes) -> RepoResult<usize> {
        if attributes.is_empty() {
            return Ok(0);
        }
        let assignments = attributes
            .keys()
            .map(|column| checked_column(column).map(|quoted| format!("{quoted} = ?")))
            .collect::<RepoResult<Vec<_>>>()?;
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.quoted_table()?,
            assignments.join(", ")
        );
        let mut binds: Vec<Value> = attributes.values().cloned().collect();
        self.compile_where(&mut sql, &mut binds)?;
        debug!("event=query_update module=query table={} sql={}", self.table(), sql);

        let conn = self.db.lock();
        Ok(conn.execute(&sql, params_from_iter(binds.iter()))?)
    }

    /// Deletes every matching row and returns the affected row count.
    pub fn delete(&self) -> RepoResult<usize> {
        let mut sql = format!("DELETE FROM {}", self.quoted_table()?);
        let mut binds = Vec::new();
        self.compile_where(&mut sql, &mut binds)?;
        debug!("event=query_delete module=query table={} sql={}", self.table(), sql);

        let conn = self.db.lock();
        Ok(conn.execute(&sql, params_from_iter(binds.iter()))?)
    }

    /// SQL text of the select this builder would run for all columns.
    pub fn to_sql(&self) -> RepoResult<String> {
        Ok(self.compile_select(&[])?.0)
    }

    fn quoted_table(&self) -> RepoResult<String> {
        let table = self.model.table();
        if !is_identifier(table) {
            return Err(RepoError::InvalidArgument(format!(
                "invalid table name `{table}`"
            )));
        }
        Ok(quote(table))
    }

    fn compile_select(&self, columns: &[&str]) -> RepoResult<(String, Vec<Value>)> {
        let selected = if columns.is_empty() || columns == ["*"] {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|column| checked_column(column))
                .collect::<RepoResult<Vec<_>>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {selected} FROM {}", self.quoted_table()?);
        let mut binds = Vec::new();
        self.compile_where(&mut sql, &mut binds)?;

        if !self.orders.is_empty() {
            let orders = self
                .orders
                .iter()
                .map(|(column, direction)| {
                    checked_column(column).map(|quoted| format!("{quoted} {}", direction.as_sql()))
                })
                .collect::<RepoResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ?");
                binds.push(Value::from(limit));
                if let Some(offset) = offset.filter(|offset| *offset > 0) {
                    sql.push_str(" OFFSET ?");
                    binds.push(Value::from(offset));
                }
            }
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                binds.push(Value::from(offset));
            }
            (None, _) => {}
        }

        debug!("event=query_select module=query table={} sql={}", self.table(), sql);
        Ok((sql, binds))
    }

    fn compile_where(&self, sql: &mut String, binds: &mut Vec<Value>) -> RepoResult<()> {
        let mut parts = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            match clause {
                Clause::Basic(condition) => parts.push(compile_condition(condition, binds)?),
                Clause::In { column, values } => {
                    let column = checked_column(column)?;
                    if values.is_empty() {
                        parts.push("0 = 1".to_string());
                        continue;
                    }
                    let placeholders = vec!["?"; values.len()].join(", ");
                    parts.push(format!("{column} IN ({placeholders})"));
                    binds.extend(values.iter().cloned());
                }
            }
        }

        if !parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&parts.join(" AND "));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("table", &self.model.table())
            .field("clauses", &self.clauses)
            .field("eager", &self.eager)
            .field("orders", &self.orders)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

fn checked_column(column: &str) -> RepoResult<String> {
    if !is_identifier(column) {
        return Err(RepoError::InvalidArgument(format!(
            "invalid column name `{column}`"
        )));
    }
    Ok(quote(column))
}

fn compile_condition(condition: &Condition, binds: &mut Vec<Value>) -> RepoResult<String> {
    let column = checked_column(&condition.column)?;
    let operator = Operator::parse(&condition.operator).ok_or_else(|| {
        RepoError::InvalidArgument(format!("unsupported operator `{}`", condition.operator))
    })?;

    if condition.value.is_null() {
        return match operator {
            Operator::Eq => Ok(format!("{column} IS NULL")),
            Operator::NotEq => Ok(format!("{column} IS NOT NULL")),
            other => Err(RepoError::InvalidArgument(format!(
                "operator `{other}` cannot compare against null"
            ))),
        };
    }

    binds.push(condition.value.clone());
    Ok(format!("{column} {} ?", operator.as_sql()))
}

fn select_rows(db: &Database, sql: &str, binds: &[Value]) -> RepoResult<Vec<Attributes>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query(params_from_iter(binds.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut attributes = Attributes::new();
        for (index, column) in columns.iter().enumerate() {
            attributes.insert(column.clone(), row.get::<_, Value>(index)?);
        }
        out.push(attributes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{Builder, Direction};
    use crate::db::open_db_in_memory;
    use crate::model::Model;
    use crate::repo::error::RepoError;
    use std::sync::Arc;

    struct Users;

    impl Model for Users {
        fn table(&self) -> &str {
            "users"
        }

        fn fillable(&self) -> &[&'static str] {
            &["email", "password"]
        }
    }

    fn builder() -> Builder {
        Builder::new(open_db_in_memory().expect("in-memory db"), Arc::new(Users))
    }

    #[test]
    fn compiles_conditions_orders_and_paging() {
        let mut query = builder();
        query
            .where_eq("email", "a@example.test")
            .where_op("id", "<>", 1)
            .order_by("id", Direction::Desc)
            .limit(10)
            .offset(20);

        assert_eq!(
            query.to_sql().expect("compiles"),
            "SELECT * FROM \"users\" WHERE \"email\" = ? AND \"id\" <> ? \
             ORDER BY \"id\" DESC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn null_comparisons_compile_to_is_null() {
        let mut query = builder();
        query
            .where_eq("password", None::<String>)
            .where_op("email", "!=", None::<String>);

        assert_eq!(
            query.to_sql().expect("compiles"),
            "SELECT * FROM \"users\" WHERE \"password\" IS NULL AND \"email\" IS NOT NULL"
        );
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let mut query = builder();
        query.offset(5);
        assert_eq!(
            query.to_sql().expect("compiles"),
            "SELECT * FROM \"users\" LIMIT -1 OFFSET ?"
        );
    }

    #[test]
    fn rejects_unsafe_identifiers_and_unknown_operators() {
        let mut bad_column = builder();
        bad_column.where_eq("email = 1 OR 1", 1);
        assert!(matches!(
            bad_column.to_sql(),
            Err(RepoError::InvalidArgument(_))
        ));

        let mut bad_operator = builder();
        bad_operator.where_op("id", "between", 1);
        assert!(matches!(
            bad_operator.to_sql(),
            Err(RepoError::InvalidArgument(message)) if message.contains("between")
        ));
    }

    #[test]
    fn with_keeps_first_occurrence_order() {
        let mut query = builder();
        query.with(["token", "other_token"]).with(vec!["token".to_string()]);
        assert_eq!(query.eager_loads(), ["token", "other_token"]);
    }
}
