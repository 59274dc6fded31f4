use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::RecallStatus;
use crate::models::*;

const RECALL_COLUMNS: &str =
    "id, drug_id, lot_code, reason, status, recall_date, closed_date, registered_by";

type RecallRow = (i64, i64, String, String, String, NaiveDate, Option<NaiveDate>, Option<i64>);

fn recall_row(row: &rusqlite::Row) -> rusqlite::Result<RecallRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn recall_from_row(row: RecallRow) -> Result<Recall, DatabaseError> {
    let (id, drug_id, lot_code, reason, status, recall_date, closed_date, registered_by) = row;
    Ok(Recall {
        id,
        drug_id,
        lot_code,
        reason,
        status: RecallStatus::from_str(&status)?,
        recall_date,
        closed_date,
        registered_by,
    })
}

pub fn insert_recall(
    conn: &Connection,
    recall: &NewRecall,
    recall_date: NaiveDate,
    registered_by: i64,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO recalls (drug_id, lot_code, reason, status, recall_date, registered_by)
         VALUES (?1, ?2, ?3, 'active', ?4, ?5)",
        params![
            recall.drug_id,
            recall.lot_code,
            recall.reason,
            recall_date,
            registered_by,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_recall(conn: &Connection, id: i64) -> Result<Option<Recall>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RECALL_COLUMNS} FROM recalls WHERE id = ?1"),
            params![id],
            recall_row,
        )
        .optional()?;
    row.map(recall_from_row).transpose()
}

/// Recalls, newest first, optionally restricted to one status.
pub fn list_recalls(
    conn: &Connection,
    status: Option<RecallStatus>,
) -> Result<Vec<Recall>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECALL_COLUMNS} FROM recalls
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY recall_date DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str())], recall_row)?;

    let mut recalls = Vec::new();
    for row in rows {
        recalls.push(recall_from_row(row?)?);
    }
    Ok(recalls)
}

pub fn close_recall(
    conn: &Connection,
    id: i64,
    closed_date: NaiveDate,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE recalls SET status = 'closed', closed_date = ?2
         WHERE id = ?1 AND status = 'active'",
        params![id, closed_date],
    )?;
    if updated == 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "recall {id} is not active"
        )));
    }
    Ok(())
}
