//! Eager loading of named relations for a batch of parent records.
//!
//! One `IN (...)` query runs per relation regardless of parent count.

use super::builder::Builder;
use crate::db::Database;
use crate::model::{Loaded, Model, Record, Relation, RelationKind, Value};
use crate::repo::error::{RepoError, RepoResult};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub(crate) fn load_relations(
    db: &Database,
    model: &Arc<dyn Model>,
    records: &mut [Record],
    names: &[String],
) -> RepoResult<()> {
    for name in names {
        let relation = resolve(model.as_ref(), name)?;
        if records.is_empty() {
            continue;
        }
        load_relation(db, name, &relation, records)?;
    }
    Ok(())
}

/// Parent columns the named relations read their lookup keys from.
pub(crate) fn parent_columns(model: &dyn Model, names: &[String]) -> RepoResult<Vec<String>> {
    names
        .iter()
        .map(|name| resolve(model, name).map(|relation| relation.parent_column().to_string()))
        .collect()
}

fn resolve(model: &dyn Model, name: &str) -> RepoResult<Relation> {
    model.relation(name).ok_or_else(|| RepoError::UnknownRelation {
        model: model.model_name().to_string(),
        relation: name.to_string(),
    })
}

fn load_relation(
    db: &Database,
    name: &str,
    relation: &Relation,
    records: &mut [Record],
) -> RepoResult<()> {
    let mut seen = BTreeSet::new();
    let keys: Vec<Value> = records
        .iter()
        .filter_map(|record| record.get(relation.parent_column()))
        .filter(|value| value.match_key().is_some_and(|key| seen.insert(key)))
        .cloned()
        .collect();

    let related = if keys.is_empty() {
        Vec::new()
    } else {
        Builder::new(db.clone(), Arc::clone(relation.related()))
            .where_in(relation.related_column(), keys)
            .get(&[])?
    };
    debug!(
        "event=eager_load module=query relation={} parents={} related={}",
        name,
        records.len(),
        related.len()
    );

    let mut grouped: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for record in related {
        if let Some(key) = record
            .get(relation.related_column())
            .and_then(Value::match_key)
        {
            grouped.entry(key).or_default().push(record);
        }
    }

    for record in records.iter_mut() {
        let matches = record
            .get(relation.parent_column())
            .and_then(Value::match_key)
            .and_then(|key| grouped.get(&key));
        let loaded = match relation.kind() {
            RelationKind::HasMany => Loaded::Many(matches.cloned().unwrap_or_default()),
            RelationKind::HasOne | RelationKind::BelongsTo => Loaded::One(
                matches
                    .and_then(|found| found.first())
                    .cloned()
                    .map(Box::new),
            ),
        };
        record.set_relation(name, loaded);
    }
    Ok(())
}
