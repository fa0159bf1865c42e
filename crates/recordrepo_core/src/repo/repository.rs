//! Generic repository over one container-resolved model.
//!
//! # Responsibility
//! - Resolve and validate the model named by a `RepositoryDefinition`.
//! - Offer CRUD, lookup, filtering and pagination without per-model
//!   query boilerplate.
//! - Forward unknown calls to the held query builder.
//!
//! # Invariants
//! - The held builder is replaced with a fresh one after every terminal
//!   operation.
//! - Pending relations are sticky: they apply to every query-producing
//!   operation until `clear_relations` is called.

use crate::container::Container;
use crate::db::Database;
use crate::model::{check_capability, Attributes, Model, Record, Value};
use crate::query::{Builder, Criteria, Dispatched, LengthAwarePaginator, DEFAULT_PER_PAGE};
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hook each concrete repository implements to name its model.
pub trait RepositoryDefinition: Send + 'static {
    /// Container binding name of the model this repository serves.
    fn take_model(&self) -> &str;
}

/// Repository operations reachable by name through [`Repository::call`].
const REPOSITORY_METHODS: &[&str] = &["all", "count", "find", "find_by", "delete", "paginate"];

/// Repository operations that only exist as typed methods.
const TYPED_ONLY_METHODS: &[&str] = &[
    "find_columns",
    "find_by_columns",
    "find_where",
    "find_where_columns",
    "filter",
    "create",
    "update",
    "paginate_page",
    "paginate_default",
    "clear_relations",
];

pub struct Repository<D: RepositoryDefinition> {
    definition: D,
    db: Database,
    model: Arc<dyn Model>,
    query: Builder,
    with: Vec<String>,
}

impl<D: RepositoryDefinition> Repository<D> {
    /// Builds a repository for the model named by `definition`.
    ///
    /// # Errors
    /// - `Container(Unbound)` when the name has no binding.
    /// - `InvalidRepositoryModel` when the binding is not a usable model.
    pub fn new(container: &Container, definition: D) -> RepoResult<Self> {
        let name = definition.take_model().to_string();
        let model = container.make(&name)?.into_model().ok_or_else(|| {
            warn!("event=repo_init module=repo status=error model={name} reason=not_a_model");
            RepoError::InvalidRepositoryModel(name.clone())
        })?;
        if let Err(reason) = check_capability(model.as_ref()) {
            warn!("event=repo_init module=repo status=error model={name} reason=invalid_{reason}");
            return Err(RepoError::InvalidRepositoryModel(name));
        }

        let db = container.database().clone();
        let query = Builder::new(db.clone(), Arc::clone(&model));
        info!(
            "event=repo_init module=repo status=ok model={} table={}",
            name,
            model.table()
        );
        Ok(Self {
            definition,
            db,
            model,
            query,
            with: Vec::new(),
        })
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    /// Typed access to the held builder; changes apply to the next
    /// terminal operation.
    pub fn query(&mut self) -> &mut Builder {
        &mut self.query
    }

    /// Relation names applied to upcoming queries.
    pub fn pending_relations(&self) -> &[String] {
        &self.with
    }

    /// Queues relations for eager loading on subsequent queries.
    pub fn with<I, S>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.with.contains(&relation) {
                self.with.push(relation);
            }
        }
        self
    }

    pub fn clear_relations(&mut self) -> &mut Self {
        self.with.clear();
        self
    }

    pub fn all(&mut self) -> RepoResult<Vec<Record>> {
        let query = self.take_query(true);
        let records = query.get(&[])?;
        debug!(
            "event=repo_all module=repo status=ok table={} rows={}",
            self.model.table(),
            records.len()
        );
        Ok(records)
    }

    /// First page of [`DEFAULT_PER_PAGE`] records.
    pub fn paginate_default(&mut self) -> RepoResult<LengthAwarePaginator> {
        self.paginate(DEFAULT_PER_PAGE)
    }

    /// First page of `per_page` records.
    pub fn paginate(&mut self, per_page: u32) -> RepoResult<LengthAwarePaginator> {
        self.paginate_page(per_page, 1, &[])
    }

    pub fn paginate_page(
        &mut self,
        per_page: u32,
        page: u32,
        columns: &[&str],
    ) -> RepoResult<LengthAwarePaginator> {
        let query = self.take_query(true);
        query.paginate(per_page, page, columns)
    }

    pub fn find(&mut self, id: impl Into<Value>) -> RepoResult<Option<Record>> {
        self.find_columns(id, &[])
    }

    pub fn find_columns(
        &mut self,
        id: impl Into<Value>,
        columns: &[&str],
    ) -> RepoResult<Option<Record>> {
        let query = self.take_query(true);
        query.find(id, columns)
    }

    /// First record whose `field` equals `value`.
    pub fn find_by(&mut self, field: &str, value: impl Into<Value>) -> RepoResult<Option<Record>> {
        self.find_by_columns(field, value, &[])
    }

    pub fn find_by_columns(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        columns: &[&str],
    ) -> RepoResult<Option<Record>> {
        let mut query = self.take_query(true);
        query.where_eq(field, value);
        query.first(columns)
    }

    /// First record matching every field/value pair.
    pub fn find_where(&mut self, criteria: impl Into<Criteria>) -> RepoResult<Option<Record>> {
        self.find_where_columns(criteria, &[])
    }

    pub fn find_where_columns(
        &mut self,
        criteria: impl Into<Criteria>,
        columns: &[&str],
    ) -> RepoResult<Option<Record>> {
        let mut query = self.take_query(true);
        query.apply(criteria);
        query.first(columns)
    }

    /// The `where` operation: every record matching `criteria`.
    ///
    /// Accepts a field/value mapping, a `(field, value)` pair or a
    /// `(field, operator, value)` triple.
    pub fn filter(&mut self, criteria: impl Into<Criteria>) -> RepoResult<Vec<Record>> {
        let mut query = self.take_query(true);
        query.apply(criteria);
        query.get(&[])
    }

    /// Mass-assigns `attributes` to a new record and persists it.
    pub fn create(&mut self, attributes: Attributes) -> RepoResult<Record> {
        let query = self.take_query(false);
        let mut record = Record::new(Arc::clone(&self.model));
        record.fill(attributes);
        if self.model.timestamps() {
            let now = now_epoch_ms();
            record.set("created_at", now).set("updated_at", now);
        }

        let key = query.insert(record.attributes())?;
        record.set(self.model.key_name(), key);
        record.mark_persisted();
        info!(
            "event=repo_create module=repo status=ok table={}",
            self.model.table()
        );
        Ok(record)
    }

    /// Mass-updates the record with primary key `id`.
    ///
    /// Returns `true` also when no such record exists.
    pub fn update(&mut self, id: impl Into<Value>, attributes: Attributes) -> RepoResult<bool> {
        let query = self.take_query(false);
        let id = id.into();
        let Some(mut record) = query.find(id.clone(), &[])? else {
            debug!(
                "event=repo_update module=repo status=skipped table={} reason=not_found",
                self.model.table()
            );
            return Ok(true);
        };

        let mut changes = Attributes::new();
        record.fill(attributes);
        for column in self.model.fillable() {
            if let Some(value) = record.get(column) {
                changes.insert((*column).to_string(), value.clone());
            }
        }
        if self.model.timestamps() {
            changes.insert("updated_at".to_string(), Value::Integer(now_epoch_ms()));
        }

        let mut target = self.fresh_query();
        target.where_eq(self.model.key_name(), id);
        target.update(&changes)?;
        info!(
            "event=repo_update module=repo status=ok table={}",
            self.model.table()
        );
        Ok(true)
    }

    /// Deletes the record with primary key `id`.
    ///
    /// Returns `false` when no such record exists.
    pub fn delete(&mut self, id: impl Into<Value>) -> RepoResult<bool> {
        let query = self.take_query(false);
        let id = id.into();
        if query.find(id.clone(), &[])?.is_none() {
            debug!(
                "event=repo_delete module=repo status=skipped table={} reason=not_found",
                self.model.table()
            );
            return Ok(false);
        }

        let mut target = self.fresh_query();
        target.where_eq(self.model.key_name(), id);
        let deleted = target.delete()?;
        info!(
            "event=repo_delete module=repo status=ok table={} rows={}",
            self.model.table(),
            deleted
        );
        Ok(deleted > 0)
    }

    pub fn count(&mut self) -> RepoResult<u64> {
        let query = self.take_query(false);
        query.count()
    }

    /// Calls a repository operation or builder method by name.
    ///
    /// Repository operations taking scalar arguments are tried first, then
    /// the builder's method table. Repository operations without a
    /// positional form fail with `InvalidArgument`; names known to neither
    /// fail with `UnknownOperation`.
    pub fn call(&mut self, method: &str, args: &[Value]) -> RepoResult<Dispatched> {
        let name = crate::query::normalize_method_name(method);
        if REPOSITORY_METHODS.contains(&name.as_str()) {
            return self.call_own(method, &name, args);
        }
        if TYPED_ONLY_METHODS.contains(&name.as_str()) {
            warn!("event=repo_call module=repo status=error method={method} reason=typed_only");
            return Err(RepoError::InvalidArgument(format!(
                "`{method}` cannot be called by name; use the typed method"
            )));
        }
        if !Builder::responds_to(&name) {
            warn!("event=repo_call module=repo status=error method={method} reason=unknown");
            return Err(RepoError::UnknownOperation(method.to_string()));
        }

        let dispatched = self.query.dispatch(&name, args)?;
        if dispatched.is_terminal() {
            self.query = self.fresh_query();
        }
        debug!("event=repo_call module=repo status=ok method={name}");
        Ok(dispatched)
    }

    fn call_own(&mut self, method: &str, name: &str, args: &[Value]) -> RepoResult<Dispatched> {
        let arity = |expected: &str| {
            RepoError::InvalidArgument(format!(
                "`{method}` expects {expected} arguments, got {}",
                args.len()
            ))
        };
        match (name, args) {
            ("all", []) => Ok(Dispatched::Records(self.all()?)),
            ("count", []) => Ok(Dispatched::Count(self.count()?)),
            ("find", [id]) => Ok(Dispatched::Record(self.find(id)?)),
            ("find_by", [Value::Text(field), value]) => {
                Ok(Dispatched::Record(self.find_by(field, value)?))
            }
            ("find_by", [field, _]) => Err(RepoError::InvalidArgument(format!(
                "`{method}` expects a text field name, got `{field}`"
            ))),
            ("delete", [id]) => Ok(Dispatched::Deleted(self.delete(id)?)),
            ("paginate", []) => Ok(Dispatched::Page(self.paginate_default()?)),
            ("paginate", [per_page]) => {
                let per_page = per_page
                    .as_i64()
                    .and_then(|number| u32::try_from(number).ok())
                    .ok_or_else(|| {
                        RepoError::InvalidArgument(format!(
                            "`{method}` expects a page size, got `{per_page}`"
                        ))
                    })?;
                Ok(Dispatched::Page(self.paginate(per_page)?))
            }
            ("all" | "count", _) => Err(arity("0")),
            ("find_by", _) => Err(arity("2")),
            ("paginate", _) => Err(arity("0 or 1")),
            _ => Err(arity("1")),
        }
    }

    /// Swaps the held builder for a fresh one and returns the old one,
    /// with pending relations applied when `eager` is set.
    fn take_query(&mut self, eager: bool) -> Builder {
        let fresh = self.fresh_query();
        let mut query = std::mem::replace(&mut self.query, fresh);
        if eager && !self.with.is_empty() {
            query.with(self.with.iter().cloned());
        }
        query
    }

    fn fresh_query(&self) -> Builder {
        Builder::new(self.db.clone(), Arc::clone(&self.model))
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
