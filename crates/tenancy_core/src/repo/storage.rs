//! Storage port consumed by the entity layer.
//!
//! # Responsibility
//! - Define the CRUD contract every persistence backend implements.
//! - Define the row shapes handed back to entity reconstruction.
//!
//! # Invariants
//! - Ids returned by `insert_*` are fresh, positive and never reused.
//! - Id `0` is reserved for the in-memory genesis entities and must never be
//!   stored, returned, or requested.

use crate::db::DbError;
use crate::model::attributes::{Attributes, DataMap};
use crate::model::identity::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Update/delete target row does not exist.
    NotFound { table: &'static str, id: EntityId },
    /// The reserved genesis id crossed the storage boundary.
    ReservedId { table: &'static str },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted into a row.
    InvalidData(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} row not found: {id}"),
            Self::ReservedId { table } => {
                write!(f, "reserved genesis id 0 used through storage table `{table}`")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "storage requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Stored domain row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRow {
    pub id: EntityId,
    pub name: String,
    pub origin_id: EntityId,
    pub owner_id: EntityId,
    pub data: DataMap,
}

/// Stored user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: EntityId,
    pub origin_id: EntityId,
    pub data: DataMap,
}

/// Stored document row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub id: EntityId,
    /// Document type slug.
    pub doc_type: String,
    pub owner_id: EntityId,
    pub origin_id: EntityId,
    pub data: DataMap,
}

/// CRUD contract over domain, user and document rows.
///
/// Lookups return every matching row ordered by ascending id; an empty vector
/// means "no such row". Writes take validated bags; reads hand back the raw
/// stored map.
pub trait StoragePort {
    fn get_documents_by_type(&self, doc_type: &str) -> StorageResult<Vec<DocumentRow>>;
    fn get_domain_by_id(&self, id: EntityId) -> StorageResult<Vec<DomainRow>>;
    fn get_domain_by_name(&self, name: &str) -> StorageResult<Vec<DomainRow>>;
    fn get_user_by_id(&self, id: EntityId) -> StorageResult<Vec<UserRow>>;

    fn insert_document(
        &self,
        origin_id: EntityId,
        owner_id: EntityId,
        doc_type: &str,
        data: &Attributes,
    ) -> StorageResult<EntityId>;
    fn insert_domain(
        &self,
        name: &str,
        origin_id: EntityId,
        owner_id: EntityId,
        data: &Attributes,
    ) -> StorageResult<EntityId>;
    fn insert_user(&self, origin_id: EntityId, data: &Attributes) -> StorageResult<EntityId>;

    fn update_document(&self, id: EntityId, data: &Attributes) -> StorageResult<()>;
    fn update_domain(&self, id: EntityId, data: &Attributes) -> StorageResult<()>;
    fn update_user(&self, id: EntityId, data: &Attributes) -> StorageResult<()>;

    fn delete_document(&self, id: EntityId) -> StorageResult<()>;
    fn delete_domain(&self, id: EntityId) -> StorageResult<()>;
    fn delete_user(&self, id: EntityId) -> StorageResult<()>;
}
