use chrono::NaiveDate;
use clinic_core::db::open_db_in_memory;
use clinic_core::{
    CatalogEntry, CatalogRepository, FixedClock, MedicationItemSpec,
    MedicationPrescriptionRepository, MedicationPrescriptionUpdate, NewMedicationItem,
    NewMedicationPrescription, NewPatient, PatientRepository, PersonFields, RepoError,
    SqliteMedicationCatalog, SqliteMedicationPrescriptionRepository, SqlitePatientRepository,
    ValidationError,
};
use rusqlite::Connection;

fn seed_patient(conn: &mut Connection, civil_id: i64, ssn: i64) {
    let clock = FixedClock(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    SqlitePatientRepository::new(conn)
        .create_patient(
            &NewPatient {
                person: PersonFields {
                    civil_id,
                    full_name: "Ana Silva".to_string(),
                    birth_date: NaiveDate::from_ymd_opt(1980, 5, 2).unwrap(),
                    address: "Rua das Flores 1, Lisboa".to_string(),
                    phone: "+351 910 000 001".to_string(),
                    email: format!("patient{civil_id}@example.org"),
                },
                social_security_number: ssn,
            },
            &clock,
        )
        .unwrap();
}

fn seed_medications(conn: &mut Connection) {
    let mut catalog = SqliteMedicationCatalog::new(conn);
    catalog
        .create_entry(&CatalogEntry::new("PARA500", "Paracetamol 500mg"))
        .unwrap();
    catalog
        .create_entry(&CatalogEntry::new("IBU400", "Ibuprofen 400mg"))
        .unwrap();
}

fn issued_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn item(code: &str, dose: &str, quantity: i64) -> NewMedicationItem {
    NewMedicationItem {
        medication_code: code.to_string(),
        dose: dose.to_string(),
        quantity,
    }
}

fn prescription_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM medication_prescriptions;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_with_single_item_roundtrips() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
    let created = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 2)],
        })
        .unwrap();

    let loaded = repo.get_prescription(created.id).unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].medication_code, "PARA500");
    assert_eq!(loaded.items[0].dose, "1 tablet");
    assert_eq!(loaded.items[0].quantity, 2);
}

#[test]
fn empty_item_list_is_rejected_and_store_unchanged() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);

    let err = SqliteMedicationPrescriptionRepository::new(&mut conn)
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: Vec::new(),
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(ValidationError::NoItems)));
    assert_eq!(prescription_count(&conn), 0);
}

#[test]
fn zero_quantity_is_rejected_on_create() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let err = SqliteMedicationPrescriptionRepository::new(&mut conn)
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 0)],
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::NonPositiveQuantity { quantity: 0 })
    ));
    assert_eq!(prescription_count(&conn), 0);
}

#[test]
fn unknown_medication_code_rolls_back_whole_create() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let err = SqliteMedicationPrescriptionRepository::new(&mut conn)
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 1), item("NOPE99", "", 1)],
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "medication",
            ..
        }
    ));
    assert_eq!(prescription_count(&conn), 0);

    let orphan_items: i64 = conn
        .query_row("SELECT COUNT(*) FROM medication_items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphan_items, 0);
}

#[test]
fn unknown_patient_fails_with_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    seed_medications(&mut conn);

    let err = SqliteMedicationPrescriptionRepository::new(&mut conn)
        .create_prescription(&NewMedicationPrescription {
            patient_id: 88888888,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 1)],
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "patient", .. }));
}

#[test]
fn update_quantity_to_zero_is_rejected_and_stored_value_kept() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
    let created = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 2)],
        })
        .unwrap();

    let err = repo
        .update_prescription(
            created.id,
            &MedicationPrescriptionUpdate {
                issued_on: None,
                items: Some(vec![MedicationItemSpec {
                    id: Some(created.items[0].id),
                    medication_code: "PARA500".to_string(),
                    dose: "1 tablet".to_string(),
                    quantity: 0,
                }]),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::NonPositiveQuantity { quantity: 0 })
    ));

    let loaded = repo.get_prescription(created.id).unwrap();
    assert_eq!(loaded.items[0].quantity, 2);
}

#[test]
fn replace_set_update_deletes_updates_and_inserts() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
    let created = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 2), item("IBU400", "1 capsule", 1)],
        })
        .unwrap();
    let kept_id = created.items[0].id;

    repo.update_prescription(
        created.id,
        &MedicationPrescriptionUpdate {
            issued_on: None,
            items: Some(vec![
                MedicationItemSpec {
                    id: Some(kept_id),
                    medication_code: "PARA500".to_string(),
                    dose: "2 tablets".to_string(),
                    quantity: 3,
                },
                MedicationItemSpec {
                    id: None,
                    medication_code: "IBU400".to_string(),
                    dose: "after meals".to_string(),
                    quantity: 1,
                },
            ]),
        },
    )
    .unwrap();

    let loaded = repo.get_prescription(created.id).unwrap();
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].id, kept_id);
    assert_eq!(loaded.items[0].dose, "2 tablets");
    assert_eq!(loaded.items[0].quantity, 3);
    // Second stored item was dropped; the new one got a fresh id.
    assert_ne!(loaded.items[1].id, created.items[1].id);
    assert_eq!(loaded.items[1].dose, "after meals");
}

#[test]
fn update_to_empty_item_set_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
    let created = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 2)],
        })
        .unwrap();

    let err = repo
        .update_prescription(
            created.id,
            &MedicationPrescriptionUpdate {
                issued_on: None,
                items: Some(Vec::new()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(ValidationError::NoItems)));

    let loaded = repo.get_prescription(created.id).unwrap();
    assert_eq!(loaded.items.len(), 1);
}

#[test]
fn update_date_only_keeps_items_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
    let created = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 2)],
        })
        .unwrap();

    let new_date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    repo.update_prescription(
        created.id,
        &MedicationPrescriptionUpdate {
            issued_on: Some(new_date),
            items: None,
        },
    )
    .unwrap();

    let loaded = repo.get_prescription(created.id).unwrap();
    assert_eq!(loaded.issued_on, new_date);
    assert_eq!(loaded.items, created.items);
}

#[test]
fn update_with_foreign_item_id_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
    let first = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("PARA500", "1 tablet", 2)],
        })
        .unwrap();
    let second = repo
        .create_prescription(&NewMedicationPrescription {
            patient_id: 20000001,
            issued_on: issued_on(),
            items: vec![item("IBU400", "1 capsule", 1)],
        })
        .unwrap();

    // An item id belonging to another prescription must not be claimable.
    let err = repo
        .update_prescription(
            second.id,
            &MedicationPrescriptionUpdate {
                issued_on: None,
                items: Some(vec![MedicationItemSpec {
                    id: Some(first.items[0].id),
                    medication_code: "IBU400".to_string(),
                    dose: String::new(),
                    quantity: 1,
                }]),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "medication item",
            ..
        }
    ));
}

#[test]
fn delete_prescription_cascades_to_items() {
    let mut conn = open_db_in_memory().unwrap();
    seed_patient(&mut conn, 20000001, 250000001);
    seed_medications(&mut conn);

    let created = {
        let mut repo = SqliteMedicationPrescriptionRepository::new(&mut conn);
        let created = repo
            .create_prescription(&NewMedicationPrescription {
                patient_id: 20000001,
                issued_on: issued_on(),
                items: vec![item("PARA500", "1 tablet", 2), item("IBU400", "1 capsule", 1)],
            })
            .unwrap();
        repo.delete_prescription(created.id).unwrap();
        created
    };

    let err = SqliteMedicationPrescriptionRepository::new(&mut conn)
        .get_prescription(created.id)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "medication prescription",
            ..
        }
    ));

    let remaining_items: i64 = conn
        .query_row("SELECT COUNT(*) FROM medication_items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining_items, 0);
}
