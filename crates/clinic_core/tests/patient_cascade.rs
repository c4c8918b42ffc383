use chrono::NaiveDate;
use clinic_core::db::open_db_in_memory;
use clinic_core::{
    CascadeConfirmation, CatalogEntry, ConsultationRepository, Doctor, ExamPrescriptionRepository,
    FixedClock, MedicationPrescriptionRepository, NewExamItem, NewExamPrescription,
    NewMedicationItem, NewMedicationPrescription, NewPatient, Participant, PersonFields,
    RegistryService, RepoError, ScheduleConsultation, SqliteConsultationRepository,
    SqliteExamPrescriptionRepository, SqliteMedicationPrescriptionRepository,
};
use rusqlite::Connection;

fn clock() -> FixedClock {
    FixedClock(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
}

fn person(civil_id: i64, full_name: &str) -> PersonFields {
    PersonFields {
        civil_id,
        full_name: full_name.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1980, 5, 2).unwrap(),
        address: "Rua das Flores 1, Lisboa".to_string(),
        phone: "+351 910 000 001".to_string(),
        email: format!("person{civil_id}@example.org"),
    }
}

fn table_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn seed_clinic(conn: &mut Connection) {
    let mut registry = RegistryService::new(conn);
    registry
        .register_patient(
            &NewPatient {
                person: person(20000001, "Ana Silva"),
                social_security_number: 250000001,
            },
            &clock(),
        )
        .unwrap();
    registry
        .register_doctor(&Doctor {
            person: person(10000001, "Joana Costa"),
            license_number: 5001,
            specialty: "Cardiology".to_string(),
        })
        .unwrap();
    registry
        .add_medication(&CatalogEntry::new("PARA500", "Paracetamol 500mg"))
        .unwrap();
    registry
        .add_exam_type(&CatalogEntry::new("HEMO01", "Complete Blood Count"))
        .unwrap();
}

#[test]
fn deleting_patient_removes_all_owned_records() {
    let mut conn = open_db_in_memory().unwrap();
    seed_clinic(&mut conn);

    let scheduled_at = NaiveDate::from_ymd_opt(2024, 6, 10)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    for offset in 0..2 {
        SqliteConsultationRepository::new(&mut conn)
            .schedule(&ScheduleConsultation {
                patient_id: 20000001,
                scheduled_at: scheduled_at + chrono::Duration::hours(offset),
                reason: "Routine checkup".to_string(),
                participants: vec![Participant {
                    doctor_id: 10000001,
                    role: "Primary Doctor".to_string(),
                }],
            })
            .unwrap();
    }

    let issued_on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    for _ in 0..2 {
        SqliteMedicationPrescriptionRepository::new(&mut conn)
            .create_prescription(&NewMedicationPrescription {
                patient_id: 20000001,
                issued_on,
                items: vec![NewMedicationItem {
                    medication_code: "PARA500".to_string(),
                    dose: "1 tablet".to_string(),
                    quantity: 1,
                }],
            })
            .unwrap();
    }
    SqliteExamPrescriptionRepository::new(&mut conn)
        .create_prescription(&NewExamPrescription {
            patient_id: 20000001,
            issued_on,
            items: vec![
                NewExamItem {
                    exam_code: "HEMO01".to_string(),
                },
                NewExamItem {
                    exam_code: "HEMO01".to_string(),
                },
            ],
        })
        .unwrap();

    let cascade = RegistryService::new(&mut conn)
        .remove_patient(20000001, CascadeConfirmation::Confirmed)
        .unwrap();
    assert_eq!(cascade.consultations, 2);
    assert_eq!(cascade.medication_prescriptions, 2);
    assert_eq!(cascade.exam_prescriptions, 1);
    assert_eq!(cascade.items, 4);

    let err = RegistryService::new(&mut conn).get_patient(20000001).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "patient", .. }));

    for table in [
        "consultations",
        "consultation_doctors",
        "medication_prescriptions",
        "medication_items",
        "exam_prescriptions",
        "exam_items",
    ] {
        assert_eq!(table_count(&conn, table), 0, "table `{table}` should be empty");
    }

    // The doctor and the catalogs are untouched.
    assert_eq!(table_count(&conn, "doctors"), 1);
    assert_eq!(table_count(&conn, "medications"), 1);
    assert_eq!(table_count(&conn, "exam_types"), 1);
}

#[test]
fn deleting_unknown_patient_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();

    let err = RegistryService::new(&mut conn)
        .remove_patient(88888888, CascadeConfirmation::Confirmed)
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "patient", .. }));
}

#[test]
fn cascade_leaves_other_patients_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    seed_clinic(&mut conn);
    RegistryService::new(&mut conn)
        .register_patient(
            &NewPatient {
                person: person(20000002, "Rui Sousa"),
                social_security_number: 250000002,
            },
            &clock(),
        )
        .unwrap();

    let issued_on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    for patient_id in [20000001, 20000002] {
        SqliteMedicationPrescriptionRepository::new(&mut conn)
            .create_prescription(&NewMedicationPrescription {
                patient_id,
                issued_on,
                items: vec![NewMedicationItem {
                    medication_code: "PARA500".to_string(),
                    dose: String::new(),
                    quantity: 1,
                }],
            })
            .unwrap();
    }

    let cascade = RegistryService::new(&mut conn)
        .remove_patient(20000001, CascadeConfirmation::Confirmed)
        .unwrap();
    assert_eq!(cascade.medication_prescriptions, 1);

    let survivors = SqliteMedicationPrescriptionRepository::new(&mut conn)
        .list_for_patient(20000002)
        .unwrap();
    assert_eq!(survivors.len(), 1);
}
