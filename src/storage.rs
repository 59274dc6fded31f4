//! Storage locations and what they hold.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::context::{Permission, RequestContext};
use crate::db::{self, DatabaseError};
use crate::error::PharmacyError;
use crate::models::{Lot, StorageLocation, StorageLocationInput};

/// A location with a summary of its stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSummary {
    #[serde(flatten)]
    pub location: StorageLocation,
    /// Lots with quantity left.
    pub lot_count: i64,
    pub units_stored: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLot {
    #[serde(flatten)]
    pub lot: Lot,
    pub commercial_name: String,
    pub recalled: bool,
    pub expired: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageContents {
    pub location: StorageLocation,
    pub lots: Vec<StoredLot>,
}

fn validate(
    conn: &Connection,
    input: &StorageLocationInput,
    except_id: Option<i64>,
) -> Result<(), PharmacyError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(PharmacyError::Validation("location name is required".into()));
    }
    if input.capacity.is_some_and(|c| c <= 0) {
        return Err(PharmacyError::Validation("capacity must be positive".into()));
    }
    if let (Some(min), Some(max)) = (input.min_temperature, input.max_temperature) {
        if min > max {
            return Err(PharmacyError::Validation(
                "minimum temperature exceeds maximum".into(),
            ));
        }
    }
    if db::storage_name_taken(conn, name, except_id)? {
        return Err(PharmacyError::Validation(format!(
            "a location named '{name}' already exists"
        )));
    }
    Ok(())
}

fn trimmed(input: &StorageLocationInput) -> StorageLocationInput {
    StorageLocationInput {
        name: input.name.trim().to_string(),
        ..input.clone()
    }
}

pub fn create_storage_location(
    ctx: &RequestContext,
    input: &StorageLocationInput,
) -> Result<StorageLocation, PharmacyError> {
    ctx.authorize(Permission::ManageStorage)?;

    let tx = ctx.conn.unchecked_transaction()?;
    validate(&tx, input, None)?;
    let id = db::insert_storage_location(&tx, &trimmed(input))?;
    let location = db::get_storage_location(&tx, id)?
        .ok_or_else(|| PharmacyError::not_found("storage location", id))?;
    tx.commit()?;

    tracing::info!(storage_id = id, kind = %location.kind, "Storage location created");
    Ok(location)
}

pub fn update_storage_location(
    ctx: &RequestContext,
    id: i64,
    input: &StorageLocationInput,
) -> Result<StorageLocation, PharmacyError> {
    ctx.authorize(Permission::ManageStorage)?;

    let tx = ctx.conn.unchecked_transaction()?;
    if db::get_storage_location(&tx, id)?.is_none() {
        return Err(PharmacyError::not_found("storage location", id));
    }
    validate(&tx, input, Some(id))?;
    db::update_storage_location(&tx, id, &trimmed(input))?;
    let location = db::get_storage_location(&tx, id)?
        .ok_or_else(|| PharmacyError::not_found("storage location", id))?;
    tx.commit()?;

    tracing::info!(storage_id = id, "Storage location updated");
    Ok(location)
}

pub fn list_storage_locations(conn: &Connection) -> Result<Vec<StorageSummary>, PharmacyError> {
    let mut stmt = conn.prepare(
        "SELECT s.id,
                COUNT(l.id),
                COALESCE(SUM(l.quantity), 0)
         FROM storage_locations s
         LEFT JOIN lots l ON l.storage_id = s.id AND l.quantity > 0
         GROUP BY s.id
         ORDER BY s.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, lot_count, units_stored) = row?;
        let location = db::get_storage_location(conn, id)?
            .ok_or_else(|| PharmacyError::not_found("storage location", id))?;
        summaries.push(StorageSummary {
            location,
            lot_count,
            units_stored,
        });
    }
    Ok(summaries)
}

/// Lots with quantity left at a location, soonest expiration first.
pub fn storage_contents(
    conn: &Connection,
    id: i64,
    today: NaiveDate,
) -> Result<StorageContents, PharmacyError> {
    let location = db::get_storage_location(conn, id)?
        .ok_or_else(|| PharmacyError::not_found("storage location", id))?;

    let mut stmt = conn.prepare(
        "SELECT l.id, l.drug_id, l.lot_code, l.expiration_date, l.quantity, l.storage_id,
                l.received_date, d.commercial_name,
                EXISTS (SELECT 1 FROM recalls r
                        WHERE r.drug_id = l.drug_id AND r.lot_code = l.lot_code
                          AND r.status = 'active')
         FROM lots l
         JOIN drugs d ON d.id = l.drug_id
         WHERE l.storage_id = ?1 AND l.quantity > 0
         ORDER BY l.expiration_date, l.id",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        let lot = Lot {
            id: row.get(0)?,
            drug_id: row.get(1)?,
            lot_code: row.get(2)?,
            expiration_date: row.get(3)?,
            quantity: row.get(4)?,
            storage_id: row.get(5)?,
            received_date: row.get(6)?,
        };
        Ok(StoredLot {
            expired: lot.expiration_date < today,
            lot,
            commercial_name: row.get(7)?,
            recalled: row.get(8)?,
        })
    })?;
    let lots = rows
        .map(|r| r.map_err(DatabaseError::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StorageContents { location, lots })
}
