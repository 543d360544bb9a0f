//! SQLite implementation of the storage port.
//!
//! # Responsibility
//! - Map domain/user/document rows to the migrated schema.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `data` columns hold a JSON object of string values.
//! - Lookups are ordered by `id ASC`.
//! - The genesis id `0` is rejected before any statement runs.

use crate::db::migrations::latest_version;
use crate::db::open_db_in_memory;
use crate::model::attributes::{Attributes, DataMap};
use crate::model::identity::{EntityId, GENESIS_ID};
use crate::repo::storage::{
    DocumentRow, DomainRow, StorageError, StoragePort, StorageResult, UserRow,
};
use log::debug;
use rusqlite::{params, Connection, Row};

const DOMAINS: &str = "domains";
const USERS: &str = "users";
const DOCUMENTS: &str = "documents";

/// SQLite-backed storage port. Owns its connection.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema is not at the latest version.
    pub fn try_new(conn: Connection) -> StorageResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(StorageError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Raw connection access for maintenance and diagnostics.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn update_data(&self, table: &'static str, id: EntityId, data: &Attributes) -> StorageResult<()> {
        reject_reserved(table, id)?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table}
                 SET data = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;"
            ),
            params![id, encode_data(data)?],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound { table, id });
        }
        debug!("event=row_update module=storage status=ok table={table} id={id}");
        Ok(())
    }

    fn delete_row(&self, table: &'static str, id: EntityId) -> StorageResult<()> {
        reject_reserved(table, id)?;
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
        if changed == 0 {
            return Err(StorageError::NotFound { table, id });
        }
        debug!("event=row_delete module=storage status=ok table={table} id={id}");
        Ok(())
    }

    fn inserted_id(&self, table: &'static str) -> StorageResult<EntityId> {
        let id = self.conn.last_insert_rowid();
        if id == GENESIS_ID {
            return Err(StorageError::ReservedId { table });
        }
        debug!("event=row_insert module=storage status=ok table={table} id={id}");
        Ok(id)
    }
}

impl StoragePort for SqliteStorage {
    fn get_documents_by_type(&self, doc_type: &str) -> StorageResult<Vec<DocumentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, type, owner_id, origin_id, data
             FROM documents
             WHERE type = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([doc_type])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_document_row(row)?);
        }
        Ok(items)
    }

    fn get_domain_by_id(&self, id: EntityId) -> StorageResult<Vec<DomainRow>> {
        reject_reserved(DOMAINS, id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, origin_id, owner_id, data
             FROM domains
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_domain_row(row)?);
        }
        Ok(items)
    }

    fn get_domain_by_name(&self, name: &str) -> StorageResult<Vec<DomainRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, origin_id, owner_id, data
             FROM domains
             WHERE name = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([name])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_domain_row(row)?);
        }
        Ok(items)
    }

    fn get_user_by_id(&self, id: EntityId) -> StorageResult<Vec<UserRow>> {
        reject_reserved(USERS, id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, origin_id, data
             FROM users
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(UserRow {
                id: row.get("id")?,
                origin_id: row.get("origin_id")?,
                data: decode_data(row, USERS)?,
            });
        }
        Ok(items)
    }

    fn insert_document(
        &self,
        origin_id: EntityId,
        owner_id: EntityId,
        doc_type: &str,
        data: &Attributes,
    ) -> StorageResult<EntityId> {
        self.conn.execute(
            "INSERT INTO documents (type, owner_id, origin_id, data)
             VALUES (?1, ?2, ?3, ?4);",
            params![doc_type, owner_id, origin_id, encode_data(data)?],
        )?;
        self.inserted_id(DOCUMENTS)
    }

    fn insert_domain(
        &self,
        name: &str,
        origin_id: EntityId,
        owner_id: EntityId,
        data: &Attributes,
    ) -> StorageResult<EntityId> {
        self.conn.execute(
            "INSERT INTO domains (name, origin_id, owner_id, data)
             VALUES (?1, ?2, ?3, ?4);",
            params![name, origin_id, owner_id, encode_data(data)?],
        )?;
        self.inserted_id(DOMAINS)
    }

    fn insert_user(&self, origin_id: EntityId, data: &Attributes) -> StorageResult<EntityId> {
        self.conn.execute(
            "INSERT INTO users (origin_id, data) VALUES (?1, ?2);",
            params![origin_id, encode_data(data)?],
        )?;
        self.inserted_id(USERS)
    }

    fn update_document(&self, id: EntityId, data: &Attributes) -> StorageResult<()> {
        self.update_data(DOCUMENTS, id, data)
    }

    fn update_domain(&self, id: EntityId, data: &Attributes) -> StorageResult<()> {
        self.update_data(DOMAINS, id, data)
    }

    fn update_user(&self, id: EntityId, data: &Attributes) -> StorageResult<()> {
        self.update_data(USERS, id, data)
    }

    fn delete_document(&self, id: EntityId) -> StorageResult<()> {
        self.delete_row(DOCUMENTS, id)
    }

    fn delete_domain(&self, id: EntityId) -> StorageResult<()> {
        self.delete_row(DOMAINS, id)
    }

    fn delete_user(&self, id: EntityId) -> StorageResult<()> {
        self.delete_row(USERS, id)
    }
}

fn parse_domain_row(row: &Row<'_>) -> StorageResult<DomainRow> {
    Ok(DomainRow {
        id: row.get("id")?,
        name: row.get("name")?,
        origin_id: row.get("origin_id")?,
        owner_id: row.get("owner_id")?,
        data: decode_data(row, DOMAINS)?,
    })
}

fn parse_document_row(row: &Row<'_>) -> StorageResult<DocumentRow> {
    Ok(DocumentRow {
        id: row.get("id")?,
        doc_type: row.get("type")?,
        owner_id: row.get("owner_id")?,
        origin_id: row.get("origin_id")?,
        data: decode_data(row, DOCUMENTS)?,
    })
}

fn encode_data(data: &Attributes) -> StorageResult<String> {
    serde_json::to_string(data)
        .map_err(|err| StorageError::InvalidData(format!("cannot encode data map: {err}")))
}

fn decode_data(row: &Row<'_>, table: &'static str) -> StorageResult<DataMap> {
    let text: String = row.get("data")?;
    serde_json::from_str(&text)
        .map_err(|err| StorageError::InvalidData(format!("invalid json in {table}.data: {err}")))
}

fn reject_reserved(table: &'static str, id: EntityId) -> StorageResult<()> {
    if id == GENESIS_ID {
        return Err(StorageError::ReservedId { table });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteStorage;
    use crate::model::attributes::Attributes;
    use crate::repo::storage::{StorageError, StoragePort};

    fn data(pairs: &[(&str, &str)]) -> Attributes {
        let mut attributes = Attributes::new();
        for (key, value) in pairs {
            attributes.set(*key, *value).unwrap();
        }
        attributes
    }

    #[test]
    fn insert_and_fetch_domain_rows_by_name_in_id_order() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let first = storage
            .insert_domain("shared", 0, 0, &data(&[("depth_allowed", "2")]))
            .unwrap();
        let second = storage.insert_domain("shared", 0, 0, &Attributes::new()).unwrap();
        assert!(first > 0);
        assert!(second > first);

        let rows = storage.get_domain_by_name("shared").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first);
        assert_eq!(rows[0].data.get("depth_allowed").map(String::as_str), Some("2"));
        assert_eq!(rows[1].id, second);
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let err = storage.update_user(42, &Attributes::new()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { table: "users", id: 42 }));

        let err = storage.delete_document(7).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { table: "documents", id: 7 }));
    }

    #[test]
    fn reserved_genesis_id_is_rejected() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert!(matches!(
            storage.get_domain_by_id(0).unwrap_err(),
            StorageError::ReservedId { table: "domains" }
        ));
        assert!(matches!(
            storage.delete_user(0).unwrap_err(),
            StorageError::ReservedId { table: "users" }
        ));
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let id = storage.insert_user(0, &Attributes::new()).unwrap();
        storage.delete_user(id).unwrap();
        assert!(storage.get_user_by_id(id).unwrap().is_empty());

        let next = storage.insert_user(0, &Attributes::new()).unwrap();
        assert!(next > id);
    }

    #[test]
    fn malformed_data_column_is_invalid_data() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let id = storage.insert_domain("broken", 0, 0, &Attributes::new()).unwrap();
        storage
            .connection()
            .execute("UPDATE domains SET data = 'not json' WHERE id = ?1;", [id])
            .unwrap();

        let err = storage.get_domain_by_id(id).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }
}
