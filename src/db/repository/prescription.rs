use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::PrescriptionStatus;
use crate::models::*;

pub fn insert_prescription(
    conn: &Connection,
    patient_id: i64,
    prescriber_id: i64,
    prescribed_date: NaiveDate,
    status: PrescriptionStatus,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (patient_id, prescriber_id, prescribed_date, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![patient_id, prescriber_id, prescribed_date, status.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, prescriber_id, prescribed_date, status
             FROM prescriptions WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, NaiveDate>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, patient_id, prescriber_id, prescribed_date, status)) => Ok(Some(Prescription {
            id,
            patient_id,
            prescriber_id,
            prescribed_date,
            status: PrescriptionStatus::from_str(&status)?,
        })),
        None => Ok(None),
    }
}

pub fn insert_prescription_item(
    conn: &Connection,
    prescription_id: i64,
    drug_id: i64,
    dose: &str,
    frequency: &str,
    duration_days: Option<i64>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO prescription_items (prescription_id, drug_id, dose, frequency, duration_days)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![prescription_id, drug_id, dose, frequency, duration_days],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_prescription_item(
    conn: &Connection,
    item_id: i64,
) -> Result<Option<PrescriptionItem>, DatabaseError> {
    let item = conn
        .query_row(
            "SELECT id, prescription_id, drug_id, dose, frequency, duration_days
             FROM prescription_items WHERE id = ?1",
            params![item_id],
            |row| {
                Ok(PrescriptionItem {
                    id: row.get(0)?,
                    prescription_id: row.get(1)?,
                    drug_id: row.get(2)?,
                    dose: row.get(3)?,
                    frequency: row.get(4)?,
                    duration_days: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(item)
}

/// Distinct drugs on any of the patient's prescriptions dated on or after `since`.
pub fn get_prescribed_drugs_since(
    conn: &Connection,
    patient_id: i64,
    since: NaiveDate,
) -> Result<Vec<PrescribedDrug>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT d.id, d.commercial_name, d.active_ingredient
         FROM prescriptions p
         JOIN prescription_items pi ON pi.prescription_id = p.id
         JOIN drugs d ON d.id = pi.drug_id
         WHERE p.patient_id = ?1 AND p.prescribed_date >= ?2
         ORDER BY d.id",
    )?;
    let rows = stmt.query_map(params![patient_id, since], |row| {
        Ok(PrescribedDrug {
            drug_id: row.get(0)?,
            commercial_name: row.get(1)?,
            active_ingredient: row.get(2)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Items of the patient's prescriptions whose status is `active`.
pub fn get_active_prescriptions(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<ActivePrescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, pi.id, d.id, d.commercial_name, d.active_ingredient, pi.dose,
                pi.frequency, p.prescribed_date
         FROM prescriptions p
         JOIN prescription_items pi ON pi.prescription_id = p.id
         JOIN drugs d ON d.id = pi.drug_id
         WHERE p.patient_id = ?1 AND p.status = 'active'
         ORDER BY p.prescribed_date DESC, pi.id",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| {
        Ok(ActivePrescription {
            prescription_id: row.get(0)?,
            item_id: row.get(1)?,
            drug_id: row.get(2)?,
            commercial_name: row.get(3)?,
            active_ingredient: row.get(4)?,
            dose: row.get(5)?,
            frequency: row.get(6)?,
            prescribed_date: row.get(7)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn insert_dispensing(
    conn: &Connection,
    item_id: i64,
    quantity: i64,
    pharmacist_id: i64,
    storage_id: Option<i64>,
    dispensed_at: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO dispensing (item_id, quantity, pharmacist_id, storage_id, dispensed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item_id, quantity, pharmacist_id, storage_id, dispensed_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record which lot a dispensing drew from, and how much.
pub fn insert_dispensing_lot(
    conn: &Connection,
    dispensing_id: i64,
    lot_id: i64,
    quantity: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO dispensing_lots (dispensing_id, lot_id, quantity) VALUES (?1, ?2, ?3)",
        params![dispensing_id, lot_id, quantity],
    )?;
    Ok(())
}

pub fn get_dispensings_for_item(
    conn: &Connection,
    item_id: i64,
) -> Result<Vec<Dispensing>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, item_id, quantity, pharmacist_id, storage_id, dispensed_at
         FROM dispensing WHERE item_id = ?1 ORDER BY dispensed_at, id",
    )?;
    let rows = stmt.query_map(params![item_id], |row| {
        Ok(Dispensing {
            id: row.get(0)?,
            item_id: row.get(1)?,
            quantity: row.get(2)?,
            pharmacist_id: row.get(3)?,
            storage_id: row.get(4)?,
            dispensed_at: row.get(5)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn insert_administration(
    conn: &Connection,
    item_id: i64,
    nurse_id: i64,
    administered_at: NaiveDateTime,
    notes: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO administrations (item_id, nurse_id, administered_at, notes)
         VALUES (?1, ?2, ?3, ?4)",
        params![item_id, nurse_id, administered_at, notes],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn count_administrations(conn: &Connection, item_id: i64) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM administrations WHERE item_id = ?1",
        params![item_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
