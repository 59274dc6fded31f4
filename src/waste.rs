//! Waste tracking: removing unusable units from stock, and the cost report.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::context::{Permission, RequestContext};
use crate::db;
use crate::error::PharmacyError;
use crate::models::{Drug, NewWaste, WasteEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteLine {
    #[serde(flatten)]
    pub entry: WasteEntry,
    pub commercial_name: String,
    pub lot_code: String,
    pub unit_price: f64,
    pub cost: f64,
}

/// Waste recorded between two dates, both inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub lines: Vec<WasteLine>,
    pub total_quantity: i64,
    pub total_cost: f64,
}

/// Take units out of a lot as waste and log who did it and why.
pub fn record_waste(
    ctx: &RequestContext,
    waste: &NewWaste,
    now: NaiveDateTime,
) -> Result<WasteEntry, PharmacyError> {
    ctx.authorize(Permission::RecordWaste)?;

    if waste.quantity <= 0 {
        return Err(PharmacyError::Validation("quantity must be positive".into()));
    }

    let tx = ctx.conn.unchecked_transaction()?;
    let stock = db::get_lot(&tx, waste.lot_id)?
        .ok_or_else(|| PharmacyError::not_found("lot", waste.lot_id))?;
    let lot = stock.lot;
    if waste.quantity > lot.quantity {
        return Err(PharmacyError::insufficient_stock(
            lot.drug_id,
            waste.quantity,
            lot.quantity,
        ));
    }

    db::decrement_lot(&tx, lot.id, waste.quantity)?;
    let id = db::insert_waste(&tx, &lot, waste, ctx.user.id, now)?;
    let total = db::recompute_drug_inventory(&tx, lot.drug_id)?;
    tx.commit()?;

    tracing::info!(
        waste_id = id,
        lot_id = lot.id,
        drug_id = lot.drug_id,
        quantity = waste.quantity,
        reason = %waste.reason,
        total,
        "Waste recorded"
    );

    Ok(WasteEntry {
        id,
        lot_id: lot.id,
        drug_id: lot.drug_id,
        quantity: waste.quantity,
        reason: waste.reason,
        recorded_by: ctx.user.id,
        recorded_at: now,
        notes: waste.notes.clone(),
    })
}

pub fn list_waste(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<WasteReport, PharmacyError> {
    if from > to {
        return Err(PharmacyError::Validation(
            "report start is after its end".into(),
        ));
    }
    let start = from.and_time(NaiveTime::MIN);
    let end = to
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);

    let mut drugs: HashMap<i64, Drug> = HashMap::new();
    let mut lines = Vec::new();
    for entry in db::get_waste_between(conn, start, end)? {
        if !drugs.contains_key(&entry.drug_id) {
            let drug = db::get_drug(conn, entry.drug_id)?
                .ok_or_else(|| PharmacyError::not_found("drug", entry.drug_id))?;
            drugs.insert(drug.id, drug);
        }
        let drug = &drugs[&entry.drug_id];
        let lot_code = db::get_lot(conn, entry.lot_id)?
            .map(|s| s.lot.lot_code)
            .ok_or_else(|| PharmacyError::not_found("lot", entry.lot_id))?;

        lines.push(WasteLine {
            commercial_name: drug.commercial_name.clone(),
            lot_code,
            unit_price: drug.unit_price,
            cost: entry.quantity as f64 * drug.unit_price,
            entry,
        });
    }

    Ok(WasteReport {
        from,
        to,
        total_quantity: lines.iter().map(|l| l.entry.quantity).sum(),
        total_cost: lines.iter().map(|l| l.cost).sum(),
        lines,
    })
}
