//! Core domain logic for the clinic management system.
//! This crate is the single source of truth for business invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::CatalogEntry;
pub use model::consultation::{
    Consultation, ConsultationDetail, ConsultationId, ConsultationUpdate, Participant,
    ParticipantDetail, ScheduleConsultation,
};
pub use model::person::{CivilId, Doctor, NewPatient, Patient, PersonFields};
pub use model::prescription::{
    ExamItem, ExamItemSpec, ExamPrescription, ExamPrescriptionUpdate, ItemId, MedicationItem,
    MedicationItemSpec, MedicationPrescription, MedicationPrescriptionUpdate, NewExamItem,
    NewExamPrescription, NewMedicationItem, NewMedicationPrescription, PrescriptionId,
};
pub use model::ValidationError;
pub use repo::catalog_repo::{CatalogRepository, SqliteExamTypeCatalog, SqliteMedicationCatalog};
pub use repo::consultation_repo::{ConsultationRepository, SqliteConsultationRepository};
pub use repo::doctor_repo::{DoctorRepository, SqliteDoctorRepository};
pub use repo::exam_repo::{ExamPrescriptionRepository, SqliteExamPrescriptionRepository};
pub use repo::medication_repo::{
    MedicationPrescriptionRepository, SqliteMedicationPrescriptionRepository,
};
pub use repo::patient_repo::{PatientCascade, PatientRepository, SqlitePatientRepository};
pub use repo::{RepoError, RepoResult};
pub use service::dashboard_service::{
    DashboardService, DoctorOverview, PatientActivity, PatientSummary,
};
pub use service::registry_service::{CascadeConfirmation, RegistryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
