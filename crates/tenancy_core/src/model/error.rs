//! Entity-level errors for lifecycle operations.

use crate::model::attributes::AttributeError;
use crate::model::identity::EntityKind;
use crate::repo::storage::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EntityResult<T> = Result<T, EntityError>;

/// Errors from entity construction, save and delete.
///
/// Permission denial is not an error: lifecycle calls return `Ok(false)`.
#[derive(Debug)]
pub enum EntityError {
    /// Storage port failure.
    Storage(StorageError),
    /// Data bag rejected a key.
    Attribute(AttributeError),
    /// Domain name is blank after trim.
    InvalidName,
    /// Insert needs the id of a relation that is still a draft.
    DraftReference {
        kind: EntityKind,
        relation: &'static str,
    },
    /// Genesis entities have no row; they cannot be written or deleted.
    ReservedId(EntityKind),
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Attribute(err) => write!(f, "{err}"),
            Self::InvalidName => write!(f, "domain name must not be blank"),
            Self::DraftReference { kind, relation } => {
                write!(f, "{kind} {relation} must be saved before the {kind}")
            }
            Self::ReservedId(kind) => write!(f, "genesis {kind} cannot be stored"),
        }
    }
}

impl Error for EntityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Attribute(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for EntityError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<AttributeError> for EntityError {
    fn from(value: AttributeError) -> Self {
        Self::Attribute(value)
    }
}
