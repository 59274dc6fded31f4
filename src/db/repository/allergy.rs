use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::AllergySeverity;
use crate::models::*;

pub fn insert_allergen(
    conn: &Connection,
    name: &str,
    category: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO allergens (name, category) VALUES (?1, ?2)",
        params![name, category],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_allergen(conn: &Connection, id: i64) -> Result<Option<Allergen>, DatabaseError> {
    let allergen = conn
        .query_row(
            "SELECT id, name, category FROM allergens WHERE id = ?1",
            params![id],
            |row| {
                Ok(Allergen {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(allergen)
}

pub fn insert_patient_allergy(
    conn: &Connection,
    patient_id: i64,
    allergy: &NewPatientAllergy,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patient_allergies (patient_id, allergen_id, severity, reaction, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            patient_id,
            allergy.allergen_id,
            allergy.severity.as_str(),
            allergy.reaction,
            allergy.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient_allergies(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<PatientAllergy>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pa.id, pa.patient_id, pa.allergen_id, a.name, a.category, pa.severity,
                pa.reaction, pa.notes
         FROM patient_allergies pa
         JOIN allergens a ON a.id = pa.allergen_id
         WHERE pa.patient_id = ?1
         ORDER BY pa.id",
    )?;

    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut allergies = Vec::new();
    for row in rows {
        let (id, patient_id, allergen_id, allergen_name, category, severity, reaction, notes) =
            row?;
        allergies.push(PatientAllergy {
            id,
            patient_id,
            allergen_id,
            allergen_name,
            category,
            severity: AllergySeverity::from_str(&severity)?,
            reaction,
            notes,
        });
    }
    Ok(allergies)
}
