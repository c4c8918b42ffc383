//! Exam prescription repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist exam prescriptions together with their line items.
//! - Provide the narrow per-item results workflow used after the lab work
//!   comes back.
//!
//! # Invariants
//! - A prescription and its items are written in one transaction.
//! - Replace-set updates preserve recorded results and attached images on
//!   kept items; `record_results` touches exactly one item's results field.

use crate::model::person::CivilId;
use crate::model::prescription::{
    ExamItem, ExamPrescription, ExamPrescriptionUpdate, ItemId, NewExamPrescription, PrescriptionId,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashSet;

/// Repository interface for exam prescription operations.
pub trait ExamPrescriptionRepository {
    fn create_prescription(&mut self, request: &NewExamPrescription) -> RepoResult<ExamPrescription>;
    /// Optional new issue date; optional full replace-set of items.
    fn update_prescription(
        &mut self,
        id: PrescriptionId,
        changes: &ExamPrescriptionUpdate,
    ) -> RepoResult<()>;
    fn get_prescription(&self, id: PrescriptionId) -> RepoResult<ExamPrescription>;
    fn delete_prescription(&mut self, id: PrescriptionId) -> RepoResult<()>;
    /// All exam prescriptions of one patient, most recent first.
    fn list_for_patient(&self, patient_id: CivilId) -> RepoResult<Vec<ExamPrescription>>;
    /// Records lab results on one item, leaving its siblings and the owning
    /// prescription untouched.
    fn record_results(&mut self, item_id: ItemId, results: &str) -> RepoResult<()>;
    /// Attaches (or clears) the stored result-image reference of one item.
    fn attach_result_image(&mut self, item_id: ItemId, image_ref: Option<&str>) -> RepoResult<()>;
}

/// SQLite-backed exam prescription repository.
pub struct SqliteExamPrescriptionRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteExamPrescriptionRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl ExamPrescriptionRepository for SqliteExamPrescriptionRepository<'_> {
    fn create_prescription(
        &mut self,
        request: &NewExamPrescription,
    ) -> RepoResult<ExamPrescription> {
        request.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !patient_exists(&tx, request.patient_id)? {
            return Err(RepoError::not_found("patient", request.patient_id));
        }

        tx.execute(
            "INSERT INTO exam_prescriptions (patient_id, issued_on)
             VALUES (?1, ?2);",
            params![request.patient_id, request.issued_on],
        )?;
        let prescription_id = tx.last_insert_rowid();

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            ensure_exam_type_exists(&tx, &item.exam_code)?;
            tx.execute(
                "INSERT INTO exam_items (prescription_id, exam_code, results)
                 VALUES (?1, ?2, '');",
                params![prescription_id, item.exam_code.as_str()],
            )?;
            items.push(ExamItem {
                id: tx.last_insert_rowid(),
                prescription_id,
                exam_code: item.exam_code.clone(),
                results: String::new(),
                image_ref: None,
            });
        }

        tx.commit()?;

        Ok(ExamPrescription {
            id: prescription_id,
            patient_id: request.patient_id,
            issued_on: request.issued_on,
            items,
        })
    }

    fn update_prescription(
        &mut self,
        id: PrescriptionId,
        changes: &ExamPrescriptionUpdate,
    ) -> RepoResult<()> {
        changes.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM exam_prescriptions WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepoError::not_found("exam prescription", id));
        }

        if let Some(issued_on) = changes.issued_on {
            tx.execute(
                "UPDATE exam_prescriptions SET issued_on = ?1 WHERE id = ?2;",
                params![issued_on, id],
            )?;
        }

        if let Some(specs) = changes.items.as_deref() {
            let stored_ids = stored_item_ids(&tx, id)?;
            let kept_ids: HashSet<i64> = specs.iter().filter_map(|spec| spec.id).collect();

            for spec in specs {
                ensure_exam_type_exists(&tx, &spec.exam_code)?;
                match spec.id {
                    Some(item_id) => {
                        if !stored_ids.contains(&item_id) {
                            return Err(RepoError::not_found("exam item", item_id));
                        }
                        tx.execute(
                            "UPDATE exam_items
                             SET exam_code = ?1
                             WHERE id = ?2 AND prescription_id = ?3;",
                            params![spec.exam_code.as_str(), item_id, id],
                        )?;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO exam_items (prescription_id, exam_code, results)
                             VALUES (?1, ?2, '');",
                            params![id, spec.exam_code.as_str()],
                        )?;
                    }
                }
            }

            for stale_id in stored_ids.difference(&kept_ids) {
                tx.execute(
                    "DELETE FROM exam_items WHERE id = ?1 AND prescription_id = ?2;",
                    params![stale_id, id],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_prescription(&self, id: PrescriptionId) -> RepoResult<ExamPrescription> {
        let header = self
            .conn
            .query_row(
                "SELECT id, patient_id, issued_on FROM exam_prescriptions WHERE id = ?1;",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>("id")?,
                        row.get::<_, i64>("patient_id")?,
                        row.get::<_, chrono::NaiveDate>("issued_on")?,
                    ))
                },
            )
            .optional()?;
        let Some((id, patient_id, issued_on)) = header else {
            return Err(RepoError::not_found("exam prescription", id));
        };

        Ok(ExamPrescription {
            id,
            patient_id,
            issued_on,
            items: load_items(self.conn, id)?,
        })
    }

    fn delete_prescription(&mut self, id: PrescriptionId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM exam_items WHERE prescription_id = ?1;", [id])?;
        let changed = tx.execute("DELETE FROM exam_prescriptions WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("exam prescription", id));
        }

        tx.commit()?;
        Ok(())
    }

    fn list_for_patient(&self, patient_id: CivilId) -> RepoResult<Vec<ExamPrescription>> {
        list_for_patient_impl(self.conn, patient_id)
    }

    fn record_results(&mut self, item_id: ItemId, results: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE exam_items SET results = ?1 WHERE id = ?2;",
            params![results, item_id],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("exam item", item_id));
        }

        Ok(())
    }

    fn attach_result_image(&mut self, item_id: ItemId, image_ref: Option<&str>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE exam_items SET image_ref = ?1 WHERE id = ?2;",
            params![image_ref, item_id],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("exam item", item_id));
        }

        Ok(())
    }
}

pub(crate) fn list_for_patient_impl(
    conn: &Connection,
    patient_id: CivilId,
) -> RepoResult<Vec<ExamPrescription>> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, issued_on
         FROM exam_prescriptions
         WHERE patient_id = ?1
         ORDER BY issued_on DESC, id ASC;",
    )?;

    let mut rows = stmt.query([patient_id])?;
    let mut headers = Vec::new();
    while let Some(row) = rows.next()? {
        headers.push((
            row.get::<_, i64>("id")?,
            row.get::<_, i64>("patient_id")?,
            row.get::<_, chrono::NaiveDate>("issued_on")?,
        ));
    }
    drop(rows);
    drop(stmt);

    let mut prescriptions = Vec::with_capacity(headers.len());
    for (id, patient_id, issued_on) in headers {
        prescriptions.push(ExamPrescription {
            id,
            patient_id,
            issued_on,
            items: load_items(conn, id)?,
        });
    }

    Ok(prescriptions)
}

fn load_items(conn: &Connection, prescription_id: PrescriptionId) -> RepoResult<Vec<ExamItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_id, exam_code, results, image_ref
         FROM exam_items
         WHERE prescription_id = ?1
         ORDER BY id ASC;",
    )?;

    let mut rows = stmt.query([prescription_id])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(ExamItem {
            id: row.get("id")?,
            prescription_id: row.get("prescription_id")?,
            exam_code: row.get("exam_code")?,
            results: row.get("results")?,
            image_ref: row.get("image_ref")?,
        });
    }

    Ok(items)
}

fn stored_item_ids(tx: &Transaction<'_>, prescription_id: PrescriptionId) -> RepoResult<HashSet<i64>> {
    let mut stmt = tx.prepare("SELECT id FROM exam_items WHERE prescription_id = ?1;")?;
    let mut rows = stmt.query([prescription_id])?;
    let mut ids = HashSet::new();
    while let Some(row) = rows.next()? {
        ids.insert(row.get::<_, i64>(0)?);
    }
    Ok(ids)
}

fn patient_exists(tx: &Transaction<'_>, civil_id: CivilId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE civil_id = ?1);",
        [civil_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_exam_type_exists(tx: &Transaction<'_>, code: &str) -> RepoResult<()> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM exam_types WHERE code = ?1);",
        [code],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("exam type", code));
    }
    Ok(())
}
