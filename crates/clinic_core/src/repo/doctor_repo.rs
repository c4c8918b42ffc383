//! Doctor repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `doctors` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Doctor::validate()` before SQL mutations.
//! - Uniqueness of civil ID, license number and email is enforced by the
//!   storage schema, not by check-then-insert.
//! - Deleting a doctor removes their consultation participations but never
//!   the consultations themselves.

use crate::model::person::{CivilId, Doctor, PersonFields};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row, TransactionBehavior};

const DOCTOR_SELECT_SQL: &str = "SELECT
    civil_id,
    full_name,
    birth_date,
    address,
    phone,
    email,
    license_number,
    specialty
FROM doctors";

/// Repository interface for doctor CRUD operations.
pub trait DoctorRepository {
    fn create_doctor(&mut self, doctor: &Doctor) -> RepoResult<()>;
    /// Whole-record replace keyed by civil ID.
    fn update_doctor(&mut self, doctor: &Doctor) -> RepoResult<()>;
    fn get_doctor(&self, civil_id: CivilId) -> RepoResult<Doctor>;
    /// All doctors ordered by name.
    fn list_doctors(&self) -> RepoResult<Vec<Doctor>>;
    fn delete_doctor(&mut self, civil_id: CivilId) -> RepoResult<()>;
}

/// SQLite-backed doctor repository.
pub struct SqliteDoctorRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteDoctorRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl DoctorRepository for SqliteDoctorRepository<'_> {
    fn create_doctor(&mut self, doctor: &Doctor) -> RepoResult<()> {
        doctor.validate()?;

        self.conn.execute(
            "INSERT INTO doctors (
                civil_id,
                full_name,
                birth_date,
                address,
                phone,
                email,
                license_number,
                specialty
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                doctor.person.civil_id,
                doctor.person.full_name.as_str(),
                doctor.person.birth_date,
                doctor.person.address.as_str(),
                doctor.person.phone.as_str(),
                doctor.person.email.as_str(),
                doctor.license_number,
                doctor.specialty.as_str(),
            ],
        )?;

        Ok(())
    }

    fn update_doctor(&mut self, doctor: &Doctor) -> RepoResult<()> {
        doctor.validate()?;

        let changed = self.conn.execute(
            "UPDATE doctors
             SET
                full_name = ?1,
                birth_date = ?2,
                address = ?3,
                phone = ?4,
                email = ?5,
                license_number = ?6,
                specialty = ?7
             WHERE civil_id = ?8;",
            params![
                doctor.person.full_name.as_str(),
                doctor.person.birth_date,
                doctor.person.address.as_str(),
                doctor.person.phone.as_str(),
                doctor.person.email.as_str(),
                doctor.license_number,
                doctor.specialty.as_str(),
                doctor.person.civil_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("doctor", doctor.person.civil_id));
        }

        Ok(())
    }

    fn get_doctor(&self, civil_id: CivilId) -> RepoResult<Doctor> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCTOR_SELECT_SQL} WHERE civil_id = ?1;"))?;

        let mut rows = stmt.query([civil_id])?;
        match rows.next()? {
            Some(row) => parse_doctor_row(row),
            None => Err(RepoError::not_found("doctor", civil_id)),
        }
    }

    fn list_doctors(&self) -> RepoResult<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCTOR_SELECT_SQL} ORDER BY full_name ASC, civil_id ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut doctors = Vec::new();
        while let Some(row) = rows.next()? {
            doctors.push(parse_doctor_row(row)?);
        }

        Ok(doctors)
    }

    fn delete_doctor(&mut self, civil_id: CivilId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM consultation_doctors WHERE doctor_id = ?1;",
            [civil_id],
        )?;
        let changed = tx.execute("DELETE FROM doctors WHERE civil_id = ?1;", [civil_id])?;
        if changed == 0 {
            return Err(RepoError::not_found("doctor", civil_id));
        }

        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn parse_doctor_row(row: &Row<'_>) -> RepoResult<Doctor> {
    let doctor = Doctor {
        person: PersonFields {
            civil_id: row.get("civil_id")?,
            full_name: row.get("full_name")?,
            birth_date: row.get("birth_date")?,
            address: row.get("address")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
        },
        license_number: row.get("license_number")?,
        specialty: row.get("specialty")?,
    };
    doctor.validate()?;
    Ok(doctor)
}
