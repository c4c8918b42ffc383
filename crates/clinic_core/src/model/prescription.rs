//! Medication and exam prescriptions with their line items.
//!
//! # Invariants
//! - A prescription created or updated through the validated path always
//!   ends up with at least one item.
//! - Item quantities are positive; dose, results and role-style labels are
//!   bounded free text.
//! - The two prescription kinds have independent identifier spaces.

use crate::model::person::CivilId;
use crate::model::{require_max_len, require_nonempty, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type PrescriptionId = i64;
pub type ItemId = i64;

pub const DOSE_MAX: usize = 100;

// ---- medication prescriptions ----

/// Stored medication line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationItem {
    pub id: ItemId,
    pub prescription_id: PrescriptionId,
    pub medication_code: String,
    /// Free-text dose description. May be empty.
    pub dose: String,
    pub quantity: i64,
}

/// Stored medication prescription with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationPrescription {
    pub id: PrescriptionId,
    pub patient_id: CivilId,
    pub issued_on: NaiveDate,
    pub items: Vec<MedicationItem>,
}

/// Line item input for creating a medication prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedicationItem {
    pub medication_code: String,
    pub dose: String,
    pub quantity: i64,
}

impl NewMedicationItem {
    fn validate(&self) -> Result<(), ValidationError> {
        require_nonempty("medication_code", &self.medication_code)?;
        require_max_len("dose", &self.dose, DOSE_MAX)?;
        if self.quantity < 1 {
            return Err(ValidationError::NonPositiveQuantity {
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// Input for creating a medication prescription with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedicationPrescription {
    pub patient_id: CivilId,
    pub issued_on: NaiveDate,
    pub items: Vec<NewMedicationItem>,
}

impl NewMedicationPrescription {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// One entry of a replace-set item update.
///
/// Specs with an `id` update the stored item in place; specs without insert
/// a new item; stored items missing from the set are deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationItemSpec {
    pub id: Option<ItemId>,
    pub medication_code: String,
    pub dose: String,
    pub quantity: i64,
}

impl MedicationItemSpec {
    fn validate(&self) -> Result<(), ValidationError> {
        require_nonempty("medication_code", &self.medication_code)?;
        require_max_len("dose", &self.dose, DOSE_MAX)?;
        if self.quantity < 1 {
            return Err(ValidationError::NonPositiveQuantity {
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// Partial update of a medication prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationPrescriptionUpdate {
    pub issued_on: Option<NaiveDate>,
    /// Full replace-set of items when supplied.
    pub items: Option<Vec<MedicationItemSpec>>,
}

impl MedicationPrescriptionUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(items) = self.items.as_deref() {
            if items.is_empty() {
                return Err(ValidationError::NoItems);
            }
            for item in items {
                item.validate()?;
            }
        }
        Ok(())
    }
}

// ---- exam prescriptions ----

/// Stored exam line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamItem {
    pub id: ItemId,
    pub prescription_id: PrescriptionId,
    pub exam_code: String,
    /// Free-text lab results; empty until recorded.
    pub results: String,
    /// Optional reference to an externally stored result image.
    pub image_ref: Option<String>,
}

/// Stored exam prescription with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPrescription {
    pub id: PrescriptionId,
    pub patient_id: CivilId,
    pub issued_on: NaiveDate,
    pub items: Vec<ExamItem>,
}

/// Line item input for creating an exam prescription.
///
/// Results start empty and are filled in later through
/// `record_results`; images are attached separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExamItem {
    pub exam_code: String,
}

impl NewExamItem {
    fn validate(&self) -> Result<(), ValidationError> {
        require_nonempty("exam_code", &self.exam_code)
    }
}

/// Input for creating an exam prescription with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExamPrescription {
    pub patient_id: CivilId,
    pub issued_on: NaiveDate,
    pub items: Vec<NewExamItem>,
}

impl NewExamPrescription {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// One entry of an exam replace-set update. Recorded results and attached
/// images on kept items are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamItemSpec {
    pub id: Option<ItemId>,
    pub exam_code: String,
}

impl ExamItemSpec {
    fn validate(&self) -> Result<(), ValidationError> {
        require_nonempty("exam_code", &self.exam_code)
    }
}

/// Partial update of an exam prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamPrescriptionUpdate {
    pub issued_on: Option<NaiveDate>,
    pub items: Option<Vec<ExamItemSpec>>,
}

impl ExamPrescriptionUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(items) = self.items.as_deref() {
            if items.is_empty() {
                return Err(ValidationError::NoItems);
            }
            for item in items {
                item.validate()?;
            }
        }
        Ok(())
    }
}
