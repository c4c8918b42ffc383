//! Consultation repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Schedule consultations together with their doctor roster in one
//!   transaction.
//! - Resolve consultation detail (patient + ordered roster) for display.
//!
//! # Invariants
//! - The roster is written atomically with the consultation; a duplicate
//!   doctor rolls the whole schedule back.
//! - Only `scheduled_at` and `reason` are mutable after creation.
//! - Roster order is insertion order.

use crate::model::consultation::{
    Consultation, ConsultationDetail, ConsultationId, ConsultationUpdate, ParticipantDetail,
    ScheduleConsultation,
};
use crate::model::person::CivilId;
use crate::repo::doctor_repo::parse_doctor_row;
use crate::repo::patient_repo::get_patient_impl;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const CONSULTATION_SELECT_SQL: &str = "SELECT
    id,
    patient_id,
    scheduled_at,
    reason
FROM consultations";

/// Repository interface for consultation operations.
pub trait ConsultationRepository {
    /// Creates one consultation plus one participation row per roster entry.
    fn schedule(&mut self, request: &ScheduleConsultation) -> RepoResult<ConsultationId>;
    /// Partial update of the two mutable fields.
    fn update_consultation(
        &mut self,
        id: ConsultationId,
        changes: &ConsultationUpdate,
    ) -> RepoResult<()>;
    /// Consultation plus its patient and the ordered roster.
    fn get_detail(&self, id: ConsultationId) -> RepoResult<ConsultationDetail>;
    fn delete_consultation(&mut self, id: ConsultationId) -> RepoResult<()>;
    /// All consultations of one patient, most recent first.
    fn list_for_patient(&self, patient_id: CivilId) -> RepoResult<Vec<Consultation>>;
}

/// SQLite-backed consultation repository.
pub struct SqliteConsultationRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteConsultationRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl ConsultationRepository for SqliteConsultationRepository<'_> {
    fn schedule(&mut self, request: &ScheduleConsultation) -> RepoResult<ConsultationId> {
        request.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(
            &tx,
            "SELECT EXISTS(SELECT 1 FROM patients WHERE civil_id = ?1);",
            request.patient_id,
        )? {
            return Err(RepoError::not_found("patient", request.patient_id));
        }

        tx.execute(
            "INSERT INTO consultations (patient_id, scheduled_at, reason)
             VALUES (?1, ?2, ?3);",
            params![
                request.patient_id,
                request.scheduled_at,
                request.reason.as_str()
            ],
        )?;
        let consultation_id = tx.last_insert_rowid();

        for participant in &request.participants {
            if !row_exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM doctors WHERE civil_id = ?1);",
                participant.doctor_id,
            )? {
                return Err(RepoError::not_found("doctor", participant.doctor_id));
            }

            // The unique (consultation, doctor) index rejects a repeated
            // roster entry and rolls the whole schedule back.
            tx.execute(
                "INSERT INTO consultation_doctors (consultation_id, doctor_id, role)
                 VALUES (?1, ?2, ?3);",
                params![
                    consultation_id,
                    participant.doctor_id,
                    participant.role.as_str()
                ],
            )?;
        }

        tx.commit()?;
        Ok(consultation_id)
    }

    fn update_consultation(
        &mut self,
        id: ConsultationId,
        changes: &ConsultationUpdate,
    ) -> RepoResult<()> {
        changes.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = tx
            .query_row(
                &format!("{CONSULTATION_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| {
                    Ok((
                        row.get::<_, chrono::NaiveDateTime>("scheduled_at")?,
                        row.get::<_, String>("reason")?,
                    ))
                },
            )
            .optional()?;
        let Some((scheduled_at, reason)) = current else {
            return Err(RepoError::not_found("consultation", id));
        };

        tx.execute(
            "UPDATE consultations SET scheduled_at = ?1, reason = ?2 WHERE id = ?3;",
            params![
                changes.scheduled_at.unwrap_or(scheduled_at),
                changes.reason.as_deref().unwrap_or(reason.as_str()),
                id,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_detail(&self, id: ConsultationId) -> RepoResult<ConsultationDetail> {
        let consultation = {
            let mut stmt = self
                .conn
                .prepare(&format!("{CONSULTATION_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_consultation_row(row)?,
                None => return Err(RepoError::not_found("consultation", id)),
            }
        };

        let patient = get_patient_impl(self.conn, consultation.patient_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT
                d.civil_id,
                d.full_name,
                d.birth_date,
                d.address,
                d.phone,
                d.email,
                d.license_number,
                d.specialty,
                cd.role
             FROM consultation_doctors cd
             INNER JOIN doctors d ON d.civil_id = cd.doctor_id
             WHERE cd.consultation_id = ?1
             ORDER BY cd.id ASC;",
        )?;

        let mut rows = stmt.query([id])?;
        let mut participants = Vec::new();
        while let Some(row) = rows.next()? {
            participants.push(ParticipantDetail {
                doctor: parse_doctor_row(row)?,
                role: row.get("role")?,
            });
        }

        Ok(ConsultationDetail {
            consultation,
            patient,
            participants,
        })
    }

    fn delete_consultation(&mut self, id: ConsultationId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM consultation_doctors WHERE consultation_id = ?1;",
            [id],
        )?;
        let changed = tx.execute("DELETE FROM consultations WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("consultation", id));
        }

        tx.commit()?;
        Ok(())
    }

    fn list_for_patient(&self, patient_id: CivilId) -> RepoResult<Vec<Consultation>> {
        list_for_patient_impl(self.conn, patient_id, None)
    }
}

pub(crate) fn list_for_patient_impl(
    conn: &Connection,
    patient_id: CivilId,
    limit: Option<u32>,
) -> RepoResult<Vec<Consultation>> {
    let mut sql = format!(
        "{CONSULTATION_SELECT_SQL} WHERE patient_id = ?1 ORDER BY scheduled_at DESC, id ASC"
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql.push(';');

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([patient_id])?;
    let mut consultations = Vec::new();
    while let Some(row) = rows.next()? {
        consultations.push(parse_consultation_row(row)?);
    }

    Ok(consultations)
}

fn parse_consultation_row(row: &Row<'_>) -> RepoResult<Consultation> {
    Ok(Consultation {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        scheduled_at: row.get("scheduled_at")?,
        reason: row.get("reason")?,
    })
}

fn row_exists(tx: &Transaction<'_>, sql: &str, key: i64) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(sql, [key], |row| row.get(0))?;
    Ok(exists == 1)
}
