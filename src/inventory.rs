//! Drug catalogue, lot receipt, stock views and recalls.
//!
//! Every stock mutation refreshes the drug's cached on-hand total inside the
//! same transaction as the write.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::context::{Permission, RequestContext};
use crate::db;
use crate::error::PharmacyError;
use crate::models::enums::RecallStatus;
use crate::models::{Drug, LotStock, NewDrug, NewLot, NewRecall, Recall};

static ATC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d{2}[A-Z]{2}\d{2}$").unwrap());

/// Manufacturer lot codes: alphanumeric start, then letters, digits, `-`, `/` or `.`.
static LOT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-/.]{0,31}$").unwrap());

// ═══════════════════════════════════════════
// View types
// ═══════════════════════════════════════════

/// A lot as listed on the drug's stock page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotView {
    #[serde(flatten)]
    pub stock: LotStock,
    pub expired: bool,
    pub available: bool,
}

impl LotView {
    fn new(stock: LotStock, today: NaiveDate) -> Self {
        Self {
            expired: stock.is_expired(today),
            available: stock.is_available(today),
            stock,
        }
    }
}

/// What can actually be dispensed for a drug today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableStock {
    pub drug: Drug,
    pub lots: Vec<LotStock>,
    pub available_quantity: i64,
}

// ═══════════════════════════════════════════
// Drugs
// ═══════════════════════════════════════════

fn validate_drug(drug: &NewDrug) -> Result<(), PharmacyError> {
    if drug.commercial_name.trim().is_empty() || drug.active_ingredient.trim().is_empty() {
        return Err(PharmacyError::Validation(
            "commercial name and active ingredient are required".into(),
        ));
    }
    if let Some(code) = &drug.atc_code {
        if !ATC_CODE.is_match(code) {
            return Err(PharmacyError::Validation(format!("invalid ATC code '{code}'")));
        }
    }
    if !drug.unit_price.is_finite() || drug.unit_price < 0.0 {
        return Err(PharmacyError::Validation("unit price must be non-negative".into()));
    }
    if drug.minimum_stock < 0 || drug.maximum_stock < 0 {
        return Err(PharmacyError::Validation("stock bounds must be non-negative".into()));
    }
    if drug.maximum_stock > 0 && drug.maximum_stock < drug.minimum_stock {
        return Err(PharmacyError::Validation(
            "maximum stock must not be below minimum stock".into(),
        ));
    }
    Ok(())
}

pub fn register_drug(ctx: &RequestContext, drug: &NewDrug) -> Result<Drug, PharmacyError> {
    ctx.authorize(Permission::ManageDrugs)?;
    validate_drug(drug)?;

    let id = db::insert_drug(&ctx.conn, drug)?;
    tracing::info!(drug_id = id, user_id = ctx.user.id, "Drug registered");
    db::get_drug(&ctx.conn, id)?.ok_or_else(|| PharmacyError::not_found("drug", id))
}

pub fn search_drugs(conn: &Connection, term: Option<&str>) -> Result<Vec<Drug>, PharmacyError> {
    Ok(db::search_drugs(conn, term)?)
}

fn require_drug(conn: &Connection, drug_id: i64) -> Result<Drug, PharmacyError> {
    db::get_drug(conn, drug_id)?.ok_or_else(|| PharmacyError::not_found("drug", drug_id))
}

// ═══════════════════════════════════════════
// Lots
// ═══════════════════════════════════════════

/// Receive a new lot into stock.
pub fn receive_lot(ctx: &RequestContext, lot: &NewLot) -> Result<LotStock, PharmacyError> {
    ctx.authorize(Permission::ReceiveStock)?;

    if lot.quantity <= 0 {
        return Err(PharmacyError::Validation("quantity must be positive".into()));
    }
    if !LOT_CODE.is_match(&lot.lot_code) {
        return Err(PharmacyError::Validation(format!(
            "invalid lot code '{}'",
            lot.lot_code
        )));
    }
    if lot.expiration_date <= lot.received_date {
        return Err(PharmacyError::Validation(
            "expiration date must be after the receipt date".into(),
        ));
    }

    let tx = ctx.conn.unchecked_transaction()?;
    require_drug(&tx, lot.drug_id)?;
    if let Some(storage_id) = lot.storage_id {
        if db::get_storage_location(&tx, storage_id)?.is_none() {
            return Err(PharmacyError::not_found("storage location", storage_id));
        }
    }
    if db::find_lot_by_code(&tx, lot.drug_id, &lot.lot_code)?.is_some() {
        return Err(PharmacyError::Validation(format!(
            "lot '{}' already exists for this drug",
            lot.lot_code
        )));
    }

    let id = db::insert_lot(&tx, lot)?;
    let total = db::recompute_drug_inventory(&tx, lot.drug_id)?;
    let stored = db::get_lot(&tx, id)?.ok_or_else(|| PharmacyError::not_found("lot", id))?;
    tx.commit()?;

    tracing::info!(
        drug_id = lot.drug_id,
        lot_id = id,
        quantity = lot.quantity,
        total,
        "Lot received"
    );
    Ok(stored)
}

/// Every lot of a drug, including emptied ones.
pub fn list_lots(
    conn: &Connection,
    drug_id: i64,
    today: NaiveDate,
) -> Result<Vec<LotView>, PharmacyError> {
    require_drug(conn, drug_id)?;
    Ok(db::get_lots_for_drug(conn, drug_id)?
        .into_iter()
        .map(|stock| LotView::new(stock, today))
        .collect())
}

/// Lots eligible for allocation today and their combined quantity.
pub fn available_stock(
    conn: &Connection,
    drug_id: i64,
    today: NaiveDate,
) -> Result<AvailableStock, PharmacyError> {
    let drug = require_drug(conn, drug_id)?;
    let lots = db::get_available_lots(conn, drug_id, today)?;
    let available_quantity = lots.iter().map(|l| l.lot.quantity).sum();
    Ok(AvailableStock {
        drug,
        lots,
        available_quantity,
    })
}

// ═══════════════════════════════════════════
// Recalls
// ═══════════════════════════════════════════

/// Register an active recall on one of the drug's lot codes.
///
/// The recalled units stay in the on-hand total until they are wasted; the
/// allocator skips them from now on.
pub fn register_recall(
    ctx: &RequestContext,
    recall: &NewRecall,
    today: NaiveDate,
) -> Result<Recall, PharmacyError> {
    ctx.authorize(Permission::ManageRecalls)?;

    if recall.reason.trim().is_empty() {
        return Err(PharmacyError::Validation("a recall reason is required".into()));
    }

    let tx = ctx.conn.unchecked_transaction()?;
    require_drug(&tx, recall.drug_id)?;
    let lot = db::find_lot_by_code(&tx, recall.drug_id, &recall.lot_code)?.ok_or_else(|| {
        PharmacyError::not_found("lot", format!("{}/{}", recall.drug_id, recall.lot_code))
    })?;
    if lot.recalled {
        return Err(PharmacyError::Validation(format!(
            "lot '{}' is already under an active recall",
            recall.lot_code
        )));
    }

    let id = db::insert_recall(&tx, recall, today, ctx.user.id)?;
    let stored = db::get_recall(&tx, id)?.ok_or_else(|| PharmacyError::not_found("recall", id))?;
    tx.commit()?;

    tracing::warn!(
        recall_id = id,
        drug_id = recall.drug_id,
        lot_code = %recall.lot_code,
        units_held = lot.lot.quantity,
        "Recall registered"
    );
    Ok(stored)
}

/// Close an active recall. Its lot becomes eligible again unless another
/// active recall still covers it.
pub fn close_recall(
    ctx: &RequestContext,
    recall_id: i64,
    today: NaiveDate,
) -> Result<Recall, PharmacyError> {
    ctx.authorize(Permission::ManageRecalls)?;

    let tx = ctx.conn.unchecked_transaction()?;
    let recall = db::get_recall(&tx, recall_id)?
        .ok_or_else(|| PharmacyError::not_found("recall", recall_id))?;
    if recall.status != RecallStatus::Active {
        return Err(PharmacyError::Validation(format!(
            "recall {recall_id} is already closed"
        )));
    }
    db::close_recall(&tx, recall_id, today)?;
    let closed = db::get_recall(&tx, recall_id)?
        .ok_or_else(|| PharmacyError::not_found("recall", recall_id))?;
    tx.commit()?;

    tracing::info!(recall_id, user_id = ctx.user.id, "Recall closed");
    Ok(closed)
}

pub fn list_recalls(
    conn: &Connection,
    status: Option<RecallStatus>,
) -> Result<Vec<Recall>, PharmacyError> {
    Ok(db::list_recalls(conn, status)?)
}
