//! Doctor and patient records.
//!
//! # Responsibility
//! - Define the shared person attribute block and the two roles embedding it.
//!
//! # Invariants
//! - `civil_id` is the primary key of both doctors and patients and never
//!   changes after creation.
//! - `Patient::registered_on` is stamped by the repository from an injected
//!   clock; callers never supply it.

use crate::model::{
    require_email, require_max_len, require_nonempty, require_positive, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// National identity-document number; primary key for doctors and patients.
pub type CivilId = i64;

pub const FULL_NAME_MAX: usize = 120;
pub const ADDRESS_MAX: usize = 200;
pub const SPECIALTY_MAX: usize = 100;

/// Civil attributes shared by every person-shaped record.
///
/// Embedded by composition in [`Doctor`] and [`Patient`]; nothing in the
/// system dispatches over "a person".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFields {
    /// Civil identifier, unique across the owning table.
    pub civil_id: CivilId,
    pub full_name: String,
    pub birth_date: NaiveDate,
    /// Postal address, bounded length.
    pub address: String,
    pub phone: String,
    /// Unique contact address.
    pub email: String,
}

impl PersonFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("civil_id", self.civil_id)?;
        require_nonempty("full_name", &self.full_name)?;
        require_max_len("full_name", &self.full_name, FULL_NAME_MAX)?;
        require_nonempty("address", &self.address)?;
        require_max_len("address", &self.address, ADDRESS_MAX)?;
        require_nonempty("phone", &self.phone)?;
        require_email(&self.email)?;
        Ok(())
    }
}

/// A registered doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(flatten)]
    pub person: PersonFields,
    /// Professional license/registration number, unique.
    pub license_number: i64,
    /// Free-text specialty category.
    pub specialty: String,
}

impl Doctor {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.person.validate()?;
        require_positive("license_number", self.license_number)?;
        require_nonempty("specialty", &self.specialty)?;
        require_max_len("specialty", &self.specialty, SPECIALTY_MAX)?;
        Ok(())
    }
}

/// Input for registering or replacing a patient record.
///
/// Carries everything a caller may set; the registration date is stamped
/// server-side on creation and preserved on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    #[serde(flatten)]
    pub person: PersonFields,
    /// National social-security/insurance number, unique.
    pub social_security_number: i64,
}

impl NewPatient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.person.validate()?;
        require_positive("social_security_number", self.social_security_number)?;
        Ok(())
    }
}

/// A registered patient as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(flatten)]
    pub person: PersonFields,
    pub social_security_number: i64,
    /// Date the record was created; immutable thereafter.
    pub registered_on: NaiveDate,
}

impl Patient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.person.validate()?;
        require_positive("social_security_number", self.social_security_number)?;
        Ok(())
    }
}
