use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (mrn, first_name, last_name, birth_date) VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.mrn,
            patient.first_name,
            patient.last_name,
            patient.birth_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            "SELECT id, mrn, first_name, last_name, birth_date FROM patients WHERE id = ?1",
            params![id],
            |row| {
                Ok(Patient {
                    id: row.get(0)?,
                    mrn: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    birth_date: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(patient)
}
