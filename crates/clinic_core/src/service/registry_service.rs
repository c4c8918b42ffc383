//! Administrative registry workflows.
//!
//! # Responsibility
//! - Provide the admin-dashboard entry points for managing doctors,
//!   patients and the two catalogs.
//! - Enforce the irreversible-operation rule: a delete whose cascade spans
//!   more than the named entity requires an explicit confirmation token.

use crate::clock::Clock;
use crate::model::catalog::CatalogEntry;
use crate::model::person::{CivilId, Doctor, NewPatient, Patient};
use crate::repo::catalog_repo::{
    CatalogRepository, SqliteExamTypeCatalog, SqliteMedicationCatalog,
};
use crate::repo::doctor_repo::{DoctorRepository, SqliteDoctorRepository};
use crate::repo::patient_repo::{PatientCascade, PatientRepository, SqlitePatientRepository};
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Caller's acknowledgement that a multi-entity cascade is intended.
///
/// Deliberately the only way to reach `remove_patient`,
/// `remove_medication` and `remove_exam_type`: the caller has to spell out
/// that dependent records will be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeConfirmation {
    Confirmed,
}

/// Admin use-case service over the registry repositories.
pub struct RegistryService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> RegistryService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    // ---- doctors ----

    pub fn register_doctor(&mut self, doctor: &Doctor) -> RepoResult<()> {
        SqliteDoctorRepository::new(self.conn).create_doctor(doctor)
    }

    pub fn update_doctor(&mut self, doctor: &Doctor) -> RepoResult<()> {
        SqliteDoctorRepository::new(self.conn).update_doctor(doctor)
    }

    pub fn get_doctor(&mut self, civil_id: CivilId) -> RepoResult<Doctor> {
        SqliteDoctorRepository::new(self.conn).get_doctor(civil_id)
    }

    pub fn list_doctors(&mut self) -> RepoResult<Vec<Doctor>> {
        SqliteDoctorRepository::new(self.conn).list_doctors()
    }

    /// Removes a doctor and their consultation participations. The
    /// consultations themselves stay with the patient, so no confirmation
    /// token is required here.
    pub fn remove_doctor(&mut self, civil_id: CivilId) -> RepoResult<()> {
        SqliteDoctorRepository::new(self.conn).delete_doctor(civil_id)
    }

    // ---- patients ----

    pub fn register_patient(
        &mut self,
        patient: &NewPatient,
        clock: &dyn Clock,
    ) -> RepoResult<Patient> {
        SqlitePatientRepository::new(self.conn).create_patient(patient, clock)
    }

    pub fn update_patient(&mut self, patient: &NewPatient) -> RepoResult<()> {
        SqlitePatientRepository::new(self.conn).update_patient(patient)
    }

    pub fn get_patient(&mut self, civil_id: CivilId) -> RepoResult<Patient> {
        SqlitePatientRepository::new(self.conn).get_patient(civil_id)
    }

    pub fn list_patients(&mut self) -> RepoResult<Vec<Patient>> {
        SqlitePatientRepository::new(self.conn).list_patients()
    }

    /// Deletes a patient with everything they own: consultations,
    /// prescriptions and line items. Irreversible.
    pub fn remove_patient(
        &mut self,
        civil_id: CivilId,
        _confirmation: CascadeConfirmation,
    ) -> RepoResult<PatientCascade> {
        SqlitePatientRepository::new(self.conn).delete_patient(civil_id)
    }

    // ---- catalogs ----

    pub fn add_medication(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        SqliteMedicationCatalog::new(self.conn).create_entry(entry)
    }

    pub fn update_medication(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        SqliteMedicationCatalog::new(self.conn).update_entry(entry)
    }

    pub fn list_medications(&mut self) -> RepoResult<Vec<CatalogEntry>> {
        SqliteMedicationCatalog::new(self.conn).list_entries()
    }

    /// Deletes a medication and every prescription item referencing it.
    /// Returns the removed item count.
    pub fn remove_medication(
        &mut self,
        code: &str,
        _confirmation: CascadeConfirmation,
    ) -> RepoResult<usize> {
        SqliteMedicationCatalog::new(self.conn).delete_entry(code)
    }

    pub fn add_exam_type(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        SqliteExamTypeCatalog::new(self.conn).create_entry(entry)
    }

    pub fn update_exam_type(&mut self, entry: &CatalogEntry) -> RepoResult<()> {
        SqliteExamTypeCatalog::new(self.conn).update_entry(entry)
    }

    pub fn list_exam_types(&mut self) -> RepoResult<Vec<CatalogEntry>> {
        SqliteExamTypeCatalog::new(self.conn).list_entries()
    }

    /// Deletes an exam type and every exam item referencing it. Returns
    /// the removed item count.
    pub fn remove_exam_type(
        &mut self,
        code: &str,
        _confirmation: CascadeConfirmation,
    ) -> RepoResult<usize> {
        SqliteExamTypeCatalog::new(self.conn).delete_entry(code)
    }
}
