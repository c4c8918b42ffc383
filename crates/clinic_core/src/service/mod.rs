//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Hold the application boundary for irreversible cascade deletes.
//! - Keep UI layers decoupled from storage details.

pub mod dashboard_service;
pub mod registry_service;
