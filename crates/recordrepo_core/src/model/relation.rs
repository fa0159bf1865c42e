//! Relation definitions and eagerly loaded relation values.

use super::{Model, Record};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Related table holds `foreign_key` pointing at the parent's `local_key`.
    HasOne,
    /// Same as `HasOne`, collecting every matching row.
    HasMany,
    /// Parent holds `foreign_key` pointing at the related `local_key`.
    BelongsTo,
}

/// One named relation from a parent model to a related model.
#[derive(Clone)]
pub struct Relation {
    kind: RelationKind,
    related: Arc<dyn Model>,
    foreign_key: String,
    local_key: String,
}

impl Relation {
    pub fn has_one(
        related: impl Model,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::HasOne, related, foreign_key, local_key)
    }

    pub fn has_many(
        related: impl Model,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::HasMany, related, foreign_key, local_key)
    }

    /// `foreign_key` lives on the parent, `owner_key` on the related model.
    pub fn belongs_to(
        related: impl Model,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::BelongsTo, related, foreign_key, owner_key)
    }

    fn new(
        kind: RelationKind,
        related: impl Model,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            related: Arc::new(related),
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
        }
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn related(&self) -> &Arc<dyn Model> {
        &self.related
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// Column read from parent records to collect lookup keys.
    pub(crate) fn parent_column(&self) -> &str {
        match self.kind {
            RelationKind::HasOne | RelationKind::HasMany => &self.local_key,
            RelationKind::BelongsTo => &self.foreign_key,
        }
    }

    /// Column on the related table matched against parent keys.
    pub(crate) fn related_column(&self) -> &str {
        match self.kind {
            RelationKind::HasOne | RelationKind::HasMany => &self.foreign_key,
            RelationKind::BelongsTo => &self.local_key,
        }
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("kind", &self.kind)
            .field("related", &self.related.table())
            .field("foreign_key", &self.foreign_key)
            .field("local_key", &self.local_key)
            .finish()
    }
}

/// Eagerly loaded relation value attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Loaded {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Loaded {
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Self::One(record) => record.as_deref(),
            Self::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[Record] {
        match self {
            Self::One(_) => &[],
            Self::Many(records) => records,
        }
    }
}
