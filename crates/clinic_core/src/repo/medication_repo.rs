//! Medication prescription repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist medication prescriptions together with their line items.
//! - Own replace-set item updates with atomic semantics.
//!
//! # Invariants
//! - A prescription and its items are written in one transaction; partial
//!   item sets are never visible.
//! - The minimum-one-item rule holds on every create and on the result of
//!   every replace-set update.

use crate::model::person::CivilId;
use crate::model::prescription::{
    MedicationItem, MedicationPrescription, MedicationPrescriptionUpdate, NewMedicationPrescription,
    PrescriptionId,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashSet;

/// Repository interface for medication prescription operations.
pub trait MedicationPrescriptionRepository {
    fn create_prescription(
        &mut self,
        request: &NewMedicationPrescription,
    ) -> RepoResult<MedicationPrescription>;
    /// Optional new issue date; optional full replace-set of items.
    fn update_prescription(
        &mut self,
        id: PrescriptionId,
        changes: &MedicationPrescriptionUpdate,
    ) -> RepoResult<()>;
    fn get_prescription(&self, id: PrescriptionId) -> RepoResult<MedicationPrescription>;
    fn delete_prescription(&mut self, id: PrescriptionId) -> RepoResult<()>;
    /// All medication prescriptions of one patient, most recent first.
    fn list_for_patient(&self, patient_id: CivilId) -> RepoResult<Vec<MedicationPrescription>>;
}

/// SQLite-backed medication prescription repository.
pub struct SqliteMedicationPrescriptionRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMedicationPrescriptionRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl MedicationPrescriptionRepository for SqliteMedicationPrescriptionRepository<'_> {
    fn create_prescription(
        &mut self,
        request: &NewMedicationPrescription,
    ) -> RepoResult<MedicationPrescription> {
        request.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !patient_exists(&tx, request.patient_id)? {
            return Err(RepoError::not_found("patient", request.patient_id));
        }

        tx.execute(
            "INSERT INTO medication_prescriptions (patient_id, issued_on)
             VALUES (?1, ?2);",
            params![request.patient_id, request.issued_on],
        )?;
        let prescription_id = tx.last_insert_rowid();

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            ensure_medication_exists(&tx, &item.medication_code)?;
            tx.execute(
                "INSERT INTO medication_items (prescription_id, medication_code, dose, quantity)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    prescription_id,
                    item.medication_code.as_str(),
                    item.dose.as_str(),
                    item.quantity,
                ],
            )?;
            items.push(MedicationItem {
                id: tx.last_insert_rowid(),
                prescription_id,
                medication_code: item.medication_code.clone(),
                dose: item.dose.clone(),
                quantity: item.quantity,
            });
        }

        tx.commit()?;

        Ok(MedicationPrescription {
            id: prescription_id,
            patient_id: request.patient_id,
            issued_on: request.issued_on,
            items,
        })
    }

    fn update_prescription(
        &mut self,
        id: PrescriptionId,
        changes: &MedicationPrescriptionUpdate,
    ) -> RepoResult<()> {
        changes.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM medication_prescriptions WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepoError::not_found("medication prescription", id));
        }

        if let Some(issued_on) = changes.issued_on {
            tx.execute(
                "UPDATE medication_prescriptions SET issued_on = ?1 WHERE id = ?2;",
                params![issued_on, id],
            )?;
        }

        if let Some(specs) = changes.items.as_deref() {
            let stored_ids = stored_item_ids(&tx, id)?;
            let kept_ids: HashSet<i64> = specs.iter().filter_map(|spec| spec.id).collect();

            for spec in specs {
                ensure_medication_exists(&tx, &spec.medication_code)?;
                match spec.id {
                    Some(item_id) => {
                        if !stored_ids.contains(&item_id) {
                            return Err(RepoError::not_found("medication item", item_id));
                        }
                        tx.execute(
                            "UPDATE medication_items
                             SET medication_code = ?1, dose = ?2, quantity = ?3
                             WHERE id = ?4 AND prescription_id = ?5;",
                            params![
                                spec.medication_code.as_str(),
                                spec.dose.as_str(),
                                spec.quantity,
                                item_id,
                                id,
                            ],
                        )?;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO medication_items
                                (prescription_id, medication_code, dose, quantity)
                             VALUES (?1, ?2, ?3, ?4);",
                            params![
                                id,
                                spec.medication_code.as_str(),
                                spec.dose.as_str(),
                                spec.quantity,
                            ],
                        )?;
                    }
                }
            }

            for stale_id in stored_ids.difference(&kept_ids) {
                tx.execute(
                    "DELETE FROM medication_items WHERE id = ?1 AND prescription_id = ?2;",
                    params![stale_id, id],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_prescription(&self, id: PrescriptionId) -> RepoResult<MedicationPrescription> {
        let header = self
            .conn
            .query_row(
                "SELECT id, patient_id, issued_on FROM medication_prescriptions WHERE id = ?1;",
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
            return Err(RepoError::not_found("medication prescription", id));
        };

        Ok(MedicationPrescription {
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

        tx.execute(
            "DELETE FROM medication_items WHERE prescription_id = ?1;",
            [id],
        )?;
        let changed = tx.execute("DELETE FROM medication_prescriptions WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("medication prescription", id));
        }

        tx.commit()?;
        Ok(())
    }

    fn list_for_patient(&self, patient_id: CivilId) -> RepoResult<Vec<MedicationPrescription>> {
        list_for_patient_impl(self.conn, patient_id)
    }
}

pub(crate) fn list_for_patient_impl(
    conn: &Connection,
    patient_id: CivilId,
) -> RepoResult<Vec<MedicationPrescription>> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, issued_on
         FROM medication_prescriptions
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
        prescriptions.push(MedicationPrescription {
            id,
            patient_id,
            issued_on,
            items: load_items(conn, id)?,
        });
    }

    Ok(prescriptions)
}

fn load_items(conn: &Connection, prescription_id: PrescriptionId) -> RepoResult<Vec<MedicationItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_id, medication_code, dose, quantity
         FROM medication_items
         WHERE prescription_id = ?1
         ORDER BY id ASC;",
    )?;

    let mut rows = stmt.query([prescription_id])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(MedicationItem {
            id: row.get("id")?,
            prescription_id: row.get("prescription_id")?,
            medication_code: row.get("medication_code")?,
            dose: row.get("dose")?,
            quantity: row.get("quantity")?,
        });
    }

    Ok(items)
}

fn stored_item_ids(tx: &Transaction<'_>, prescription_id: PrescriptionId) -> RepoResult<HashSet<i64>> {
    let mut stmt =
        tx.prepare("SELECT id FROM medication_items WHERE prescription_id = ?1;")?;
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

fn ensure_medication_exists(tx: &Transaction<'_>, code: &str) -> RepoResult<()> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM medications WHERE code = ?1);",
        [code],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("medication", code));
    }
    Ok(())
}
