//! Catalog repositories: medications and exam types.
//!
//! # Responsibility
//! - Plain CRUD over the two reference-data tables.
//! - Own the destructive default of catalog deletion: every prescription
//!   item referencing the entry goes with it.
//!
//! # Invariants
//! - Codes are unique per catalog; uniqueness is storage-enforced.
//! - Catalog deletion is transactional and reports the removed item count.

use crate::model::catalog::CatalogEntry;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, TransactionBehavior};

/// Repository interface shared by both catalogs.
pub trait CatalogRepository {
    fn create_entry(&mut self, entry: &CatalogEntry) -> RepoResult<()>;
    /// Replaces the display name keyed by code.
    fn update_entry(&mut self, entry: &CatalogEntry) -> RepoResult<()>;
    fn get_entry(&self, code: &str) -> RepoResult<CatalogEntry>;
    /// All entries ordered by name.
    fn list_entries(&self) -> RepoResult<Vec<CatalogEntry>>;
    /// Deletes the entry and every prescription item referencing it.
    /// Returns the number of items removed.
    fn delete_entry(&mut self, code: &str) -> RepoResult<usize>;
}

/// Table bindings distinguishing the two catalogs.
#[derive(Debug, Clone, Copy)]
struct CatalogTables {
    entity: &'static str,
    table: &'static str,
    items_table: &'static str,
    code_column: &'static str,
}

const MEDICATION_TABLES: CatalogTables = CatalogTables {
    entity: "medication",
    table: "medications",
    items_table: "medication_items",
    code_column: "medication_code",
};

const EXAM_TYPE_TABLES: CatalogTables = CatalogTables {
    entity: "exam type",
    table: "exam_types",
    items_table: "exam_items",
    code_column: "exam_code",
};

/// SQLite-backed medication catalog.
pub struct SqliteMedicationCatalog<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMedicationCatalog<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteMedicationCatalog<'_> {
    fn create_entry(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        create_entry_impl(self.conn, MEDICATION_TABLES, entry)
    }

    fn update_entry(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        update_entry_impl(self.conn, MEDICATION_TABLES, entry)
    }

    fn get_entry(&self, code: &str) -> RepoResult<CatalogEntry> {
        get_entry_impl(self.conn, MEDICATION_TABLES, code)
    }

    fn list_entries(&self) -> RepoResult<Vec<CatalogEntry>> {
        list_entries_impl(self.conn, MEDICATION_TABLES)
    }

    fn delete_entry(&mut self, code: &str) -> RepoResult<usize> {
        delete_entry_impl(self.conn, MEDICATION_TABLES, code)
    }
}

/// SQLite-backed exam type catalog.
pub struct SqliteExamTypeCatalog<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteExamTypeCatalog<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteExamTypeCatalog<'_> {
    fn create_entry(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        create_entry_impl(self.conn, EXAM_TYPE_TABLES, entry)
    }

    fn update_entry(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        update_entry_impl(self.conn, EXAM_TYPE_TABLES, entry)
    }

    fn get_entry(&self, code: &str) -> RepoResult<CatalogEntry> {
        get_entry_impl(self.conn, EXAM_TYPE_TABLES, code)
    }

    fn list_entries(&self) -> RepoResult<Vec<CatalogEntry>> {
        list_entries_impl(self.conn, EXAM_TYPE_TABLES)
    }

    fn delete_entry(&mut self, code: &str) -> RepoResult<usize> {
        delete_entry_impl(self.conn, EXAM_TYPE_TABLES, code)
    }
}

fn create_entry_impl(
    conn: &Connection,
    tables: CatalogTables,
    entry: &CatalogEntry,
) -> RepoResult<()> {
    entry.validate()?;

    conn.execute(
        &format!(
            "INSERT INTO {} (code, name) VALUES (?1, ?2);",
            tables.table
        ),
        params![entry.code.as_str(), entry.name.as_str()],
    )?;

    Ok(())
}

fn update_entry_impl(
    conn: &Connection,
    tables: CatalogTables,
    entry: &CatalogEntry,
) -> RepoResult<()> {
    entry.validate()?;

    let changed = conn.execute(
        &format!("UPDATE {} SET name = ?1 WHERE code = ?2;", tables.table),
        params![entry.name.as_str(), entry.code.as_str()],
    )?;

    if changed == 0 {
        return Err(RepoError::not_found(tables.entity, &entry.code));
    }

    Ok(())
}

fn get_entry_impl(conn: &Connection, tables: CatalogTables, code: &str) -> RepoResult<CatalogEntry> {
    let mut stmt = conn.prepare(&format!(
        "SELECT code, name FROM {} WHERE code = ?1;",
        tables.table
    ))?;

    let mut rows = stmt.query([code])?;
    match rows.next()? {
        Some(row) => Ok(CatalogEntry {
            code: row.get("code")?,
            name: row.get("name")?,
        }),
        None => Err(RepoError::not_found(tables.entity, code)),
    }
}

fn list_entries_impl(conn: &Connection, tables: CatalogTables) -> RepoResult<Vec<CatalogEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT code, name FROM {} ORDER BY name ASC, code ASC;",
        tables.table
    ))?;

    let mut rows = stmt.query([])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(CatalogEntry {
            code: row.get("code")?,
            name: row.get("name")?,
        });
    }

    Ok(entries)
}

fn delete_entry_impl(
    conn: &mut Connection,
    tables: CatalogTables,
    code: &str,
) -> RepoResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let items_removed = tx.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1;",
            tables.items_table, tables.code_column
        ),
        [code],
    )?;
    let changed = tx.execute(
        &format!("DELETE FROM {} WHERE code = ?1;", tables.table),
        [code],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(tables.entity, code));
    }

    tx.commit()?;

    // This can leave an already-stored prescription without items; the
    // minimum-one-item rule guards the creation/update paths only.
    warn!(
        "event=catalog_cascade_delete module=repo status=ok catalog={} code={code} items_removed={items_removed}",
        tables.table
    );

    Ok(items_removed)
}
