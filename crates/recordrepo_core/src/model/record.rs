//! Dynamic record bound to its model descriptor.
//!
//! # Invariants
//! - `fill` never assigns columns outside `Model::fillable`.
//! - `exists` is true only for rows read from or written to storage.

use super::{Attributes, Loaded, Model, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct Record {
    model: Arc<dyn Model>,
    attributes: Attributes,
    relations: BTreeMap<String, Loaded>,
    exists: bool,
}

impl Record {
    /// Creates an empty, not yet persisted record.
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            attributes: Attributes::new(),
            relations: BTreeMap::new(),
            exists: false,
        }
    }

    pub(crate) fn from_row(model: Arc<dyn Model>, attributes: Attributes) -> Self {
        Self {
            model,
            attributes,
            relations: BTreeMap::new(),
            exists: true,
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

    /// Primary-key value, `None` until the record has one.
    pub fn key(&self) -> Option<&Value> {
        self.attributes
            .get(self.model.key_name())
            .filter(|value| !value.is_null())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// Sets one attribute without the fillable guard.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Mass-assigns the fillable subset of `attributes`.
    pub fn fill(&mut self, attributes: Attributes) -> &mut Self {
        for (column, value) in attributes {
            if self.model.fillable().contains(&column.as_str()) {
                self.attributes.insert(column, value);
            } else {
                log::debug!(
                    "event=mass_assign module=model status=skipped table={} column={}",
                    self.model.table(),
                    column
                );
            }
        }
        self
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn to_attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    /// Returns only the listed columns that are present.
    pub fn only(&self, columns: &[&str]) -> Attributes {
        self.attributes
            .iter()
            .filter(|(column, _)| columns.contains(&column.as_str()))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.exists = true;
    }

    pub fn relation(&self, name: &str) -> Option<&Loaded> {
        self.relations.get(name)
    }

    /// Loaded single related record, if the relation was loaded and matched.
    pub fn related(&self, name: &str) -> Option<&Record> {
        self.relations.get(name).and_then(Loaded::as_one)
    }

    pub fn related_many(&self, name: &str) -> &[Record] {
        self.relations
            .get(name)
            .map(Loaded::as_many)
            .unwrap_or_default()
    }

    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, Loaded> {
        &self.relations
    }

    pub(crate) fn set_relation(&mut self, name: impl Into<String>, loaded: Loaded) {
        self.relations.insert(name.into(), loaded);
    }

    /// Attributes and loaded relations as one JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model.table() == other.model.table()
            && self.attributes == other.attributes
            && self.relations == other.relations
            && self.exists == other.exists
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.model.table())
            .field("attributes", &self.attributes)
            .field("relations", &self.relations)
            .field("exists", &self.exists)
            .finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map =
            serializer.serialize_map(Some(self.attributes.len() + self.relations.len()))?;
        for (column, value) in &self.attributes {
            map.serialize_entry(column, value)?;
        }
        for (name, loaded) in &self.relations {
            map.serialize_entry(name, loaded)?;
        }
        map.end()
    }
}
