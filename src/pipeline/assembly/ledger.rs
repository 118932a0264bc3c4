//! SQLite-backed assembling ledger.
//!
//! Append-only: rows are inserted once and never updated or deleted.
//! Re-registration and repeated import records are silent no-ops.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::traits::Ledger;
use super::types::*;
use crate::db::{self, DatabaseError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Ledger stored in a single SQLite database.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open (or create) the ledger file and apply pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = db::open_database(path)?;
        tracing::debug!(path = %path.display(), "Ledger opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: db::open_memory_database()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Ledger for SqliteLedger {
    fn is_handled(&self, filename: &str, origin: &str) -> Result<bool, DatabaseError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM handled_files WHERE filename = ?1 AND origin = ?2)",
            params![filename, origin],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn is_imported(&self, filename: &str, origin: &str) -> Result<bool, DatabaseError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM imported_files WHERE filename = ?1 AND origin = ?2)",
            params![filename, origin],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn register(&self, registration: &FileRegistration) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        // Edges belong to the document id; the first registration wins.
        let document_known: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM handled_files WHERE document_id = ?1)",
            params![registration.document_id],
            |row| row.get(0),
        )?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO handled_files (filename, origin, document_id, handled_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                registration.filename,
                registration.origin,
                registration.document_id,
                format_timestamp(registration.handled_at),
            ],
        )?;
        if inserted == 0 {
            // Already registered: nothing to write, the transaction is dropped.
            return Ok(false);
        }

        if !document_known {
            for (position, dependency_id) in registration.dependency_ids.iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO dependency_edges (document_id, position, dependency_id)
                     VALUES (?1, ?2, ?3)",
                    params![registration.document_id, position as i64, dependency_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn record_imported(
        &self,
        filename: &str,
        origin: &str,
        imported_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO imported_files (filename, origin, imported_at)
             VALUES (?1, ?2, ?3)",
            params![filename, origin, format_timestamp(imported_at)],
        )?;
        Ok(())
    }

    fn dependencies_of(&self, document_id: &str) -> Result<DependencyLookup, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT dependency_id FROM dependency_edges
             WHERE document_id = ?1
             ORDER BY position ASC",
        )?;
        let edges = stmt
            .query_map(params![document_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        if !edges.is_empty() {
            return Ok(DependencyLookup::Edges(edges));
        }

        let known: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM handled_files WHERE document_id = ?1)",
            params![document_id],
            |row| row.get(0),
        )?;
        Ok(if known {
            DependencyLookup::Leaf
        } else {
            DependencyLookup::Unknown
        })
    }

    fn document_id_for(
        &self,
        filename: &str,
        origin: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let id = self
            .conn
            .query_row(
                "SELECT document_id FROM handled_files WHERE filename = ?1 AND origin = ?2",
                params![filename, origin],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn filename_for(
        &self,
        document_id: &str,
        origin: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let filename = self
            .conn
            .query_row(
                "SELECT filename FROM handled_files
                 WHERE document_id = ?1 AND origin = ?2
                 ORDER BY handled_at ASC, filename ASC
                 LIMIT 1",
                params![document_id, origin],
                |row| row.get(0),
            )
            .optional()?;
        Ok(filename)
    }
}
