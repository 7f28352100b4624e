// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! Both tables are namespaced by the configured schema prefix:
//!
//! - `<prefix>_invitation.invitation`: invitation id → serialized `StoredInvitation`
//! - `<prefix>_event.user_event`: event id → serialized `StoredEvent`
//!
//! Rows are JSON bytes. Filtering, ordering and pagination happen in the
//! repositories after a table scan.

use std::path::Path;

use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

/// Table definition shape shared by every table in this database.
pub type JsonTable<'a> = TableDefinition<'a, &'static str, &'static [u8]>;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Build a namespaced table name: `<prefix>_<schema>.<table>`.
pub fn table_name(schema_prefix: &str, schema: &str, table: &str) -> String {
    format!("{schema_prefix}_{schema}.{table}")
}

// =============================================================================
// Database
// =============================================================================

/// Process-wide database handle.
///
/// Constructed once at startup and shared through `AppState`; repositories
/// borrow it for the duration of a call.
pub struct Database {
    db: redb::Database,
    invitation_table: String,
    event_table: String,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path, schema_prefix: &str) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        let database = Self {
            db,
            invitation_table: table_name(schema_prefix, "invitation", "invitation"),
            event_table: table_name(schema_prefix, "event", "user_event"),
        };

        // Pre-create all tables so later read transactions don't fail
        let write_txn = database.db.begin_write()?;
        {
            let _ = write_txn.open_table(database.invitations())?;
            let _ = write_txn.open_table(database.events())?;
        }
        write_txn.commit()?;

        tracing::info!(
            path = %path.display(),
            invitation_table = %database.invitation_table,
            event_table = %database.event_table,
            "Database opened"
        );

        Ok(database)
    }

    pub(crate) fn invitations(&self) -> JsonTable<'_> {
        TableDefinition::new(&self.invitation_table)
    }

    pub(crate) fn events(&self) -> JsonTable<'_> {
        TableDefinition::new(&self.event_table)
    }

    // =========================================================================
    // Generic JSON row helpers
    // =========================================================================

    /// Insert a row, failing if the key is already taken.
    pub(crate) fn insert_new<T: Serialize>(
        &self,
        table: JsonTable<'_>,
        key: &str,
        row: &T,
    ) -> StorageResult<()> {
        let json = serde_json::to_vec(row)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut t = write_txn.open_table(table)?;
            if t.get(key)?.is_some() {
                return Err(StorageError::Duplicate(key.to_string()));
            }
            t.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single row by key.
    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        table: JsonTable<'_>,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(table)?;
        match t.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Load every row of a table.
    pub(crate) fn scan<T: DeserializeOwned>(&self, table: JsonTable<'_>) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(table)?;

        let mut rows = Vec::new();
        for entry in t.iter()? {
            let (_, value) = entry?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// Apply `mutate` to the first row matching `predicate` inside a single
    /// write transaction. Returns the updated row, or `None` if nothing matched.
    pub(crate) fn update_first<T, P, M>(
        &self,
        table: JsonTable<'_>,
        predicate: P,
        mutate: M,
    ) -> StorageResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        P: Fn(&T) -> bool,
        M: FnOnce(&mut T),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut t = write_txn.open_table(table)?;

            // Read existing value and deserialize before mutating
            let mut found: Option<(String, T)> = None;
            for entry in t.iter()? {
                let (key, value) = entry?;
                let row: T = serde_json::from_slice(value.value())?;
                if predicate(&row) {
                    found = Some((key.value().to_string(), row));
                    break;
                }
            }

            match found {
                Some((key, mut row)) => {
                    mutate(&mut row);
                    let json = serde_json::to_vec(&row)?;
                    t.insert(key.as_str(), json.as_slice())?;
                    Some(row)
                }
                None => None,
            }
        };

        if updated.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(updated)
    }
}
