//! Filter conditions and the three accepted `where` calling shapes.

use crate::model::{Attributes, Value};
use std::fmt::{Display, Formatter};

/// Comparison operator accepted by `where` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    /// Parses an operator token, case-insensitively for `like` forms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Some(Self::Eq),
            "<>" | "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "like" => Some(Self::Like),
            "not like" => Some(Self::NotLike),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One `column <operator> value` condition.
///
/// The operator is kept as written and validated when the query compiles,
/// so conversions from caller tuples stay infallible.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: String,
    pub value: Value,
}

impl Condition {
    pub fn new(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, "=", value)
    }
}

/// Conjunction of conditions.
///
/// Built from a field/value mapping, a `(field, value)` pair or a
/// `(field, operator, value)` triple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    conditions: Vec<Condition>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub(crate) fn into_conditions(self) -> Vec<Condition> {
        self.conditions
    }
}

impl From<Condition> for Criteria {
    fn from(value: Condition) -> Self {
        Self {
            conditions: vec![value],
        }
    }
}

impl<V: Into<Value>> From<(&str, V)> for Criteria {
    fn from((column, value): (&str, V)) -> Self {
        Condition::equals(column, value).into()
    }
}

impl<V: Into<Value>> From<(&str, &str, V)> for Criteria {
    fn from((column, operator, value): (&str, &str, V)) -> Self {
        Condition::new(column, operator, value).into()
    }
}

impl<V: Into<Value>, const N: usize> From<[(&str, V); N]> for Criteria {
    fn from(pairs: [(&str, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<V: Into<Value>> From<Vec<(&str, V)>> for Criteria {
    fn from(pairs: Vec<(&str, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Attributes> for Criteria {
    fn from(map: Attributes) -> Self {
        Self {
            conditions: map
                .into_iter()
                .map(|(column, value)| Condition::equals(column, value))
                .collect(),
        }
    }
}

impl<'a, V: Into<Value>> FromIterator<(&'a str, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(column, value)| Condition::equals(column, value))
                .collect(),
        }
    }
}
