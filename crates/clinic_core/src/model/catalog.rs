//! Catalog reference data: medications and exam types.

use crate::model::{require_max_len, require_nonempty, ValidationError};
use serde::{Deserialize, Serialize};

pub const CODE_MAX: usize = 50;
pub const CATALOG_NAME_MAX: usize = 200;

/// One catalog row: a unique code and its display name.
///
/// The same shape backs both the medication and the exam-type catalogs;
/// each lives in its own table with its own code space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_nonempty("code", &self.code)?;
        require_max_len("code", &self.code, CODE_MAX)?;
        require_nonempty("name", &self.name)?;
        require_max_len("name", &self.name, CATALOG_NAME_MAX)?;
        Ok(())
    }
}
