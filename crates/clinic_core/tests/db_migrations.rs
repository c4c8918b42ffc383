use clinic_core::db::migrations::latest_version;
use clinic_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;
use tempfile::tempdir;

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn in_memory_bootstrap_reaches_latest_version() {
    let conn = open_db_in_memory().unwrap();
    assert!(latest_version() > 0);
    assert_eq!(user_version(&conn), latest_version());
}

#[test]
fn bootstrap_enables_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn file_bootstrap_is_idempotent_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clinic.db");

    {
        let conn = open_db(&path).unwrap();
        assert_eq!(user_version(&conn), latest_version());
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), latest_version());
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clinic.db");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .unwrap();
    }

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, latest_version() + 1);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("expected unsupported schema version, got {other:?}"),
    }
}

#[test]
fn all_core_tables_exist_after_bootstrap() {
    let conn = open_db_in_memory().unwrap();
    for table in [
        "doctors",
        "patients",
        "consultations",
        "consultation_doctors",
        "medications",
        "exam_types",
        "medication_prescriptions",
        "medication_items",
        "exam_prescriptions",
        "exam_items",
    ] {
        let exists: i64 = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1, "table `{table}` should exist");
    }
}
