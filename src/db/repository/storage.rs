use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::StorageKind;
use crate::models::*;

type StorageRow = (i64, String, String, Option<i64>, Option<f64>, Option<f64>, Option<String>);

fn storage_row(row: &rusqlite::Row) -> rusqlite::Result<StorageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn storage_from_row(row: StorageRow) -> Result<StorageLocation, DatabaseError> {
    let (id, name, kind, capacity, min_temperature, max_temperature, notes) = row;
    Ok(StorageLocation {
        id,
        name,
        kind: StorageKind::from_str(&kind)?,
        capacity,
        min_temperature,
        max_temperature,
        notes,
    })
}

pub fn insert_storage_location(
    conn: &Connection,
    input: &StorageLocationInput,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO storage_locations
             (name, kind, capacity, min_temperature, max_temperature, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.name,
            input.kind.as_str(),
            input.capacity,
            input.min_temperature,
            input.max_temperature,
            input.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_storage_location(
    conn: &Connection,
    id: i64,
    input: &StorageLocationInput,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE storage_locations
         SET name = ?2, kind = ?3, capacity = ?4, min_temperature = ?5, max_temperature = ?6,
             notes = ?7
         WHERE id = ?1",
        params![
            id,
            input.name,
            input.kind.as_str(),
            input.capacity,
            input.min_temperature,
            input.max_temperature,
            input.notes,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "storage location".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn get_storage_location(
    conn: &Connection,
    id: i64,
) -> Result<Option<StorageLocation>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, kind, capacity, min_temperature, max_temperature, notes
             FROM storage_locations WHERE id = ?1",
            params![id],
            storage_row,
        )
        .optional()?;
    row.map(storage_from_row).transpose()
}

/// Any other location already using `name` (case-insensitive).
pub fn storage_name_taken(
    conn: &Connection,
    name: &str,
    except_id: Option<i64>,
) -> Result<bool, DatabaseError> {
    let taken = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM storage_locations
                        WHERE LOWER(name) = LOWER(?1) AND (?2 IS NULL OR id <> ?2))",
        params![name, except_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}
