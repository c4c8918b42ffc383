//! Consultations and their doctor roster.
//!
//! # Invariants
//! - A consultation belongs to exactly one patient and has one or more
//!   participating doctors.
//! - The roster is fixed at scheduling time; only `scheduled_at` and
//!   `reason` are mutable afterwards.

use crate::model::person::{CivilId, Doctor, Patient};
use crate::model::{require_max_len, require_nonempty, ValidationError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type ConsultationId = i64;

pub const ROLE_MAX: usize = 50;

/// A scheduled consultation as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub patient_id: CivilId,
    pub scheduled_at: NaiveDateTime,
    pub reason: String,
}

/// One roster entry: a doctor and the role they hold in the consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub doctor_id: CivilId,
    /// Role label, e.g. "Primary Doctor", "Assistant". May be empty.
    pub role: String,
}

/// Input for scheduling a consultation together with its roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConsultation {
    pub patient_id: CivilId,
    pub scheduled_at: NaiveDateTime,
    pub reason: String,
    pub participants: Vec<Participant>,
}

impl ScheduleConsultation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_nonempty("reason", &self.reason)?;
        if self.participants.is_empty() {
            return Err(ValidationError::NoParticipants);
        }
        for participant in &self.participants {
            require_max_len("role", &participant.role, ROLE_MAX)?;
        }
        Ok(())
    }
}

/// Partial update of the two mutable consultation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultationUpdate {
    pub scheduled_at: Option<NaiveDateTime>,
    pub reason: Option<String>,
}

impl ConsultationUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(reason) = self.reason.as_deref() {
            require_nonempty("reason", reason)?;
        }
        Ok(())
    }
}

/// Consultation detail read model: the record, its patient, and the roster
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsultationDetail {
    pub consultation: Consultation,
    pub patient: Patient,
    pub participants: Vec<ParticipantDetail>,
}

/// Roster entry resolved to the full doctor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantDetail {
    pub doctor: Doctor,
    pub role: String,
}
