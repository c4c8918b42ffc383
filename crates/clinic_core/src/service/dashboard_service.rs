//! Read-only dashboard aggregates.
//!
//! # Responsibility
//! - Compose repository queries into the patient-summary and
//!   doctor-overview read models.
//!
//! # Invariants
//! - No method here has side effects; everything is a read composition.
//! - A patient with no records yields empty lists, not errors; only an
//!   unknown patient id in `patient_summary` is `NotFound`.

use crate::clock::Clock;
use crate::model::consultation::Consultation;
use crate::model::person::{CivilId, Patient};
use crate::model::prescription::{ExamPrescription, MedicationPrescription};
use crate::repo::consultation_repo::list_for_patient_impl as list_consultations;
use crate::repo::exam_repo::list_for_patient_impl as list_exam_prescriptions;
use crate::repo::medication_repo::list_for_patient_impl as list_medication_prescriptions;
use crate::repo::patient_repo::get_patient_impl;
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::Serialize;

const RECENT_CONSULTATIONS_LIMIT: u32 = 5;

/// Everything the patient- and doctor-facing dashboards show for one
/// patient, each list most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
    pub patient: Patient,
    pub consultations: Vec<Consultation>,
    pub medication_prescriptions: Vec<MedicationPrescription>,
    pub exam_prescriptions: Vec<ExamPrescription>,
}

/// Per-patient activity counters for the doctor overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientActivity {
    pub patient: Patient,
    pub consultation_count: u32,
    pub medication_prescription_count: u32,
    pub exam_prescription_count: u32,
    /// The five most recent consultations.
    pub recent_consultations: Vec<Consultation>,
}

/// Doctor dashboard statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorOverview {
    /// Activity of the selected patient; `None` when no patient is
    /// selected or the selection no longer exists.
    pub selected: Option<PatientActivity>,
    /// Consultations scheduled today across all patients.
    pub consultations_today: u32,
    pub total_patients: u32,
}

/// Read-only aggregate view service.
pub struct DashboardService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DashboardService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Patient record plus all their clinical history, newest first.
    pub fn patient_summary(&self, patient_id: CivilId) -> RepoResult<PatientSummary> {
        let patient = get_patient_impl(self.conn, patient_id)?;

        Ok(PatientSummary {
            patient,
            consultations: list_consultations(self.conn, patient_id, None)?,
            medication_prescriptions: list_medication_prescriptions(self.conn, patient_id)?,
            exam_prescriptions: list_exam_prescriptions(self.conn, patient_id)?,
        })
    }

    /// Doctor dashboard statistics, optionally focused on one patient.
    ///
    /// An unknown `selected_patient` degrades to no selection instead of
    /// failing; the dashboard renders its empty state in that case.
    pub fn doctor_overview(
        &self,
        selected_patient: Option<CivilId>,
        clock: &dyn Clock,
    ) -> RepoResult<DoctorOverview> {
        let selected = match selected_patient {
            Some(civil_id) => match get_patient_impl(self.conn, civil_id) {
                Ok(patient) => Some(self.patient_activity(patient)?),
                Err(RepoError::NotFound { .. }) => None,
                Err(err) => return Err(err),
            },
            None => None,
        };

        let consultations_today: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM consultations WHERE date(scheduled_at) = date(?1);",
            [clock.today()],
            |row| row.get(0),
        )?;
        let total_patients: u32 =
            self.conn
                .query_row("SELECT COUNT(*) FROM patients;", [], |row| row.get(0))?;

        Ok(DoctorOverview {
            selected,
            consultations_today,
            total_patients,
        })
    }

    fn patient_activity(&self, patient: Patient) -> RepoResult<PatientActivity> {
        let civil_id = patient.person.civil_id;

        Ok(PatientActivity {
            consultation_count: self.count_for_patient("consultations", civil_id)?,
            medication_prescription_count: self
                .count_for_patient("medication_prescriptions", civil_id)?,
            exam_prescription_count: self.count_for_patient("exam_prescriptions", civil_id)?,
            recent_consultations: list_consultations(
                self.conn,
                civil_id,
                Some(RECENT_CONSULTATIONS_LIMIT),
            )?,
            patient,
        })
    }

    fn count_for_patient(&self, table: &'static str, civil_id: CivilId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE patient_id = ?1;"),
            [civil_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
