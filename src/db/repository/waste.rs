use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::WasteReason;
use crate::models::*;

pub fn insert_waste(
    conn: &Connection,
    lot: &Lot,
    waste: &NewWaste,
    recorded_by: i64,
    recorded_at: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO waste_log (lot_id, drug_id, quantity, reason, recorded_by, recorded_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            lot.id,
            lot.drug_id,
            waste.quantity,
            waste.reason.as_str(),
            recorded_by,
            recorded_at,
            waste.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Waste entries recorded in `[from, to)`, oldest first.
pub fn get_waste_between(
    conn: &Connection,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<WasteEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, lot_id, drug_id, quantity, reason, recorded_by, recorded_at, notes
         FROM waste_log
         WHERE recorded_at >= ?1 AND recorded_at < ?2
         ORDER BY recorded_at, id",
    )?;

    let rows = stmt.query_map(params![from, to], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, NaiveDateTime>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, lot_id, drug_id, quantity, reason, recorded_by, recorded_at, notes) = row?;
        entries.push(WasteEntry {
            id,
            lot_id,
            drug_id,
            quantity,
            reason: WasteReason::from_str(&reason)?,
            recorded_by,
            recorded_at,
            notes,
        });
    }
    Ok(entries)
}
