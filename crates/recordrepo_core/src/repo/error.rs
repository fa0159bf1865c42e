//! Repository and query error contract.

use crate::container::ContainerError;
use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error surfaced by repositories and query builders.
///
/// Storage failures are wrapped unmodified in `Db`.
#[derive(Debug)]
pub enum RepoError {
    /// The repository's model binding failed the persistable-record check.
    InvalidRepositoryModel(String),
    /// Neither the repository nor its query builder knows the method.
    UnknownOperation(String),
    UnknownRelation { model: String, relation: String },
    InvalidArgument(String),
    Container(ContainerError),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRepositoryModel(name) => write!(
                f,
                "`{name}` does not resolve to a persistable model"
            ),
            Self::UnknownOperation(method) => {
                write!(f, "call to undefined repository method `{method}`")
            }
            Self::UnknownRelation { model, relation } => {
                write!(f, "relation `{relation}` is not defined on model `{model}`")
            }
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Container(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Container(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidRepositoryModel(_)
            | Self::UnknownOperation(_)
            | Self::UnknownRelation { .. }
            | Self::InvalidArgument(_) => None,
        }
    }
}

impl From<ContainerError> for RepoError {
    fn from(value: ContainerError) -> Self {
        Self::Container(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
