use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

/// Lot columns plus the derived `recalled` flag (any active recall on the lot code).
const LOT_STOCK_SELECT: &str = "SELECT l.id, l.drug_id, l.lot_code, l.expiration_date, l.quantity,
     l.storage_id, l.received_date,
     EXISTS (SELECT 1 FROM recalls r
             WHERE r.drug_id = l.drug_id AND r.lot_code = l.lot_code AND r.status = 'active')
     FROM lots l";

fn lot_from_row(row: &Row) -> rusqlite::Result<Lot> {
    Ok(Lot {
        id: row.get(0)?,
        drug_id: row.get(1)?,
        lot_code: row.get(2)?,
        expiration_date: row.get(3)?,
        quantity: row.get(4)?,
        storage_id: row.get(5)?,
        received_date: row.get(6)?,
    })
}

fn lot_stock_from_row(row: &Row) -> rusqlite::Result<LotStock> {
    Ok(LotStock {
        lot: lot_from_row(row)?,
        recalled: row.get(7)?,
    })
}

pub fn insert_lot(conn: &Connection, lot: &NewLot) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO lots (drug_id, lot_code, expiration_date, quantity, storage_id, received_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            lot.drug_id,
            lot.lot_code,
            lot.expiration_date,
            lot.quantity,
            lot.storage_id,
            lot.received_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_lot(conn: &Connection, id: i64) -> Result<Option<LotStock>, DatabaseError> {
    let lot = conn
        .query_row(
            &format!("{LOT_STOCK_SELECT} WHERE l.id = ?1"),
            params![id],
            lot_stock_from_row,
        )
        .optional()?;
    Ok(lot)
}

pub fn find_lot_by_code(
    conn: &Connection,
    drug_id: i64,
    lot_code: &str,
) -> Result<Option<LotStock>, DatabaseError> {
    let lot = conn
        .query_row(
            &format!("{LOT_STOCK_SELECT} WHERE l.drug_id = ?1 AND l.lot_code = ?2"),
            params![drug_id, lot_code],
            lot_stock_from_row,
        )
        .optional()?;
    Ok(lot)
}

/// Every lot of a drug, zero-quantity history included, soonest expiration first.
pub fn get_lots_for_drug(conn: &Connection, drug_id: i64) -> Result<Vec<LotStock>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{LOT_STOCK_SELECT} WHERE l.drug_id = ?1 ORDER BY l.expiration_date, l.id"
    ))?;
    let rows = stmt.query_map(params![drug_id], lot_stock_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Lots eligible for allocation: positive quantity, not expired on `today`,
/// no active recall. Ordered soonest expiration first.
pub fn get_available_lots(
    conn: &Connection,
    drug_id: i64,
    today: NaiveDate,
) -> Result<Vec<LotStock>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{LOT_STOCK_SELECT}
         WHERE l.drug_id = ?1 AND l.quantity > 0 AND l.expiration_date >= ?2
           AND NOT EXISTS (SELECT 1 FROM recalls r
                           WHERE r.drug_id = l.drug_id AND r.lot_code = l.lot_code
                             AND r.status = 'active')
         ORDER BY l.expiration_date, l.id"
    ))?;
    let rows = stmt.query_map(params![drug_id, today], lot_stock_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Take `quantity` units out of a lot. Fails without writing if the lot
/// holds less than that.
pub fn decrement_lot(conn: &Connection, lot_id: i64, quantity: i64) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE lots SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
        params![quantity, lot_id],
    )?;
    if updated != 1 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "lot {lot_id} holds fewer than {quantity} units"
        )));
    }
    Ok(())
}
