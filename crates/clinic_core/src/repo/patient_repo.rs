//! Patient repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `patients` table.
//! - Own the one documented multi-entity cascade in the system: deleting a
//!   patient removes every consultation and prescription they own.
//!
//! # Invariants
//! - `registered_on` is stamped from the injected clock at creation and is
//!   never touched by updates.
//! - The cascade delete is a single immediate transaction; callers receive
//!   a row-count summary of what was removed.

use crate::clock::Clock;
use crate::model::person::{CivilId, NewPatient, Patient, PersonFields};
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const PATIENT_SELECT_SQL: &str = "SELECT
    civil_id,
    full_name,
    birth_date,
    address,
    phone,
    email,
    social_security_number,
    registered_on
FROM patients";

/// Row counts removed by a patient cascade delete.
///
/// Returned so callers can surface the full blast radius of the operation;
/// this is the one place in the system where a delete spans entity kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatientCascade {
    pub consultations: usize,
    pub medication_prescriptions: usize,
    pub exam_prescriptions: usize,
    pub items: usize,
}

/// Repository interface for patient CRUD operations.
pub trait PatientRepository {
    /// Creates a patient, stamping `registered_on` from the clock.
    fn create_patient(&mut self, patient: &NewPatient, clock: &dyn Clock) -> RepoResult<Patient>;
    /// Whole-record replace keyed by civil ID; `registered_on` is preserved.
    fn update_patient(&mut self, patient: &NewPatient) -> RepoResult<()>;
    fn get_patient(&self, civil_id: CivilId) -> RepoResult<Patient>;
    /// All patients ordered by name.
    fn list_patients(&self) -> RepoResult<Vec<Patient>>;
    /// Cascade delete: consultations, prescriptions and their items go with
    /// the patient. Irreversible.
    fn delete_patient(&mut self, civil_id: CivilId) -> RepoResult<PatientCascade>;
}

/// SQLite-backed patient repository.
pub struct SqlitePatientRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqlitePatientRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl PatientRepository for SqlitePatientRepository<'_> {
    fn create_patient(&mut self, patient: &NewPatient, clock: &dyn Clock) -> RepoResult<Patient> {
        patient.validate()?;
        let registered_on = clock.today();

        self.conn.execute(
            "INSERT INTO patients (
                civil_id,
                full_name,
                birth_date,
                address,
                phone,
                email,
                social_security_number,
                registered_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                patient.person.civil_id,
                patient.person.full_name.as_str(),
                patient.person.birth_date,
                patient.person.address.as_str(),
                patient.person.phone.as_str(),
                patient.person.email.as_str(),
                patient.social_security_number,
                registered_on,
            ],
        )?;

        Ok(Patient {
            person: patient.person.clone(),
            social_security_number: patient.social_security_number,
            registered_on,
        })
    }

    fn update_patient(&mut self, patient: &NewPatient) -> RepoResult<()> {
        patient.validate()?;

        let changed = self.conn.execute(
            "UPDATE patients
             SET
                full_name = ?1,
                birth_date = ?2,
                address = ?3,
                phone = ?4,
                email = ?5,
                social_security_number = ?6
             WHERE civil_id = ?7;",
            params![
                patient.person.full_name.as_str(),
                patient.person.birth_date,
                patient.person.address.as_str(),
                patient.person.phone.as_str(),
                patient.person.email.as_str(),
                patient.social_security_number,
                patient.person.civil_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("patient", patient.person.civil_id));
        }

        Ok(())
    }

    fn get_patient(&self, civil_id: CivilId) -> RepoResult<Patient> {
        get_patient_impl(self.conn, civil_id)
    }

    fn list_patients(&self) -> RepoResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PATIENT_SELECT_SQL} ORDER BY full_name ASC, civil_id ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut patients = Vec::new();
        while let Some(row) = rows.next()? {
            patients.push(parse_patient_row(row)?);
        }

        Ok(patients)
    }

    fn delete_patient(&mut self, civil_id: CivilId) -> RepoResult<PatientCascade> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !patient_exists(&tx, civil_id)? {
            return Err(RepoError::not_found("patient", civil_id));
        }

        // Children first, parents last, so the explicit deletes never lean
        // on the storage-level cascade triggers.
        let medication_items = tx.execute(
            "DELETE FROM medication_items
             WHERE prescription_id IN (
                SELECT id FROM medication_prescriptions WHERE patient_id = ?1
             );",
            [civil_id],
        )?;
        let medication_prescriptions = tx.execute(
            "DELETE FROM medication_prescriptions WHERE patient_id = ?1;",
            [civil_id],
        )?;
        let exam_items = tx.execute(
            "DELETE FROM exam_items
             WHERE prescription_id IN (
                SELECT id FROM exam_prescriptions WHERE patient_id = ?1
             );",
            [civil_id],
        )?;
        let exam_prescriptions = tx.execute(
            "DELETE FROM exam_prescriptions WHERE patient_id = ?1;",
            [civil_id],
        )?;
        tx.execute(
            "DELETE FROM consultation_doctors
             WHERE consultation_id IN (
                SELECT id FROM consultations WHERE patient_id = ?1
             );",
            [civil_id],
        )?;
        let consultations =
            tx.execute("DELETE FROM consultations WHERE patient_id = ?1;", [civil_id])?;
        tx.execute("DELETE FROM patients WHERE civil_id = ?1;", [civil_id])?;

        let cascade = PatientCascade {
            consultations,
            medication_prescriptions,
            exam_prescriptions,
            items: medication_items + exam_items,
        };

        tx.commit()?;

        warn!(
            "event=patient_cascade_delete module=repo status=ok civil_id={civil_id} \
             consultations={} medication_prescriptions={} exam_prescriptions={} items={}",
            cascade.consultations,
            cascade.medication_prescriptions,
            cascade.exam_prescriptions,
            cascade.items
        );

        Ok(cascade)
    }
}

pub(crate) fn get_patient_impl(conn: &Connection, civil_id: CivilId) -> RepoResult<Patient> {
    let mut stmt = conn.prepare(&format!("{PATIENT_SELECT_SQL} WHERE civil_id = ?1;"))?;

    let mut rows = stmt.query([civil_id])?;
    match rows.next()? {
        Some(row) => parse_patient_row(row),
        None => Err(RepoError::not_found("patient", civil_id)),
    }
}

pub(crate) fn parse_patient_row(row: &Row<'_>) -> RepoResult<Patient> {
    let patient = Patient {
        person: PersonFields {
            civil_id: row.get("civil_id")?,
            full_name: row.get("full_name")?,
            birth_date: row.get("birth_date")?,
            address: row.get("address")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
        },
        social_security_number: row.get("social_security_number")?,
        registered_on: row.get("registered_on")?,
    };
    patient.validate()?;
    Ok(patient)
}

fn patient_exists(tx: &Transaction<'_>, civil_id: CivilId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE civil_id = ?1);",
        [civil_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
