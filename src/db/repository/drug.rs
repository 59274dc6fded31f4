use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

use super::like_pattern;

const DRUG_COLUMNS: &str = "id, commercial_name, active_ingredient, atc_code, unit_price,
     actual_inventory, minimum_stock, maximum_stock";

fn drug_from_row(row: &Row) -> rusqlite::Result<Drug> {
    Ok(Drug {
        id: row.get(0)?,
        commercial_name: row.get(1)?,
        active_ingredient: row.get(2)?,
        atc_code: row.get(3)?,
        unit_price: row.get(4)?,
        actual_inventory: row.get(5)?,
        minimum_stock: row.get(6)?,
        maximum_stock: row.get(7)?,
    })
}

pub fn insert_drug(conn: &Connection, drug: &NewDrug) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO drugs (commercial_name, active_ingredient, atc_code, unit_price,
         minimum_stock, maximum_stock)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            drug.commercial_name,
            drug.active_ingredient,
            drug.atc_code,
            drug.unit_price,
            drug.minimum_stock,
            drug.maximum_stock,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_drug(conn: &Connection, id: i64) -> Result<Option<Drug>, DatabaseError> {
    let drug = conn
        .query_row(
            &format!("SELECT {DRUG_COLUMNS} FROM drugs WHERE id = ?1"),
            params![id],
            drug_from_row,
        )
        .optional()?;
    Ok(drug)
}

/// Drugs whose commercial name, ingredient or ATC code contains `term`
/// (case-insensitive). `None` lists everything.
pub fn search_drugs(conn: &Connection, term: Option<&str>) -> Result<Vec<Drug>, DatabaseError> {
    let pattern = like_pattern(term.unwrap_or(""));
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRUG_COLUMNS} FROM drugs
         WHERE LOWER(commercial_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(active_ingredient) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(COALESCE(atc_code, '')) LIKE LOWER(?1) ESCAPE '\\'
         ORDER BY commercial_name"
    ))?;
    let rows = stmt.query_map(params![pattern], drug_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Recompute the cached on-hand total from the drug's lots with positive quantity.
///
/// Returns the new total.
pub fn recompute_drug_inventory(conn: &Connection, drug_id: i64) -> Result<i64, DatabaseError> {
    let updated = conn.execute(
        "UPDATE drugs SET actual_inventory =
            (SELECT COALESCE(SUM(quantity), 0) FROM lots WHERE drug_id = ?1 AND quantity > 0)
         WHERE id = ?1",
        params![drug_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "drug".into(),
            id: drug_id.to_string(),
        });
    }
    let total = conn.query_row(
        "SELECT actual_inventory FROM drugs WHERE id = ?1",
        params![drug_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn get_drugs_below_minimum(conn: &Connection) -> Result<Vec<Drug>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRUG_COLUMNS} FROM drugs WHERE actual_inventory < minimum_stock
         ORDER BY commercial_name"
    ))?;
    let rows = stmt.query_map([], drug_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// A maximum of zero means "no ceiling".
pub fn get_drugs_above_maximum(conn: &Connection) -> Result<Vec<Drug>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRUG_COLUMNS} FROM drugs
         WHERE maximum_stock > 0 AND actual_inventory > maximum_stock
         ORDER BY commercial_name"
    ))?;
    let rows = stmt.query_map([], drug_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
