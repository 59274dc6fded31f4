use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db;
use crate::error::PharmacyError;
use crate::models::LotStock;

use super::types::{AllocationPlan, LotDraw};

/// Earliest-expiration-first lot selection.
///
/// Planning is pure. [`LotAllocator::apply`] writes a plan and must run inside
/// the caller's transaction so a failed dispensation leaves no partial decrement.
#[derive(Debug, Clone, Copy)]
pub struct LotAllocator {
    today: NaiveDate,
}

impl LotAllocator {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Plan how `requested` units of `drug_id` come out of `lots`.
    ///
    /// Lots that are empty, recalled, expired, or belong to another drug are
    /// skipped. The rest are drawn in (expiration date, id) order, each fully
    /// before the next. Fails with `InsufficientStock` if the eligible lots
    /// cannot cover the request.
    pub fn plan(
        &self,
        drug_id: i64,
        requested: i64,
        lots: &[LotStock],
    ) -> Result<AllocationPlan, PharmacyError> {
        if requested <= 0 {
            return Err(PharmacyError::Validation(format!(
                "quantity must be positive, got {requested}"
            )));
        }

        let mut eligible: Vec<&LotStock> = lots
            .iter()
            .filter(|l| l.lot.drug_id == drug_id && l.is_available(self.today))
            .collect();
        eligible.sort_by_key(|l| (l.lot.expiration_date, l.lot.id));

        let available: i64 = eligible.iter().map(|l| l.lot.quantity).sum();
        if available < requested {
            return Err(PharmacyError::insufficient_stock(drug_id, requested, available));
        }

        let mut outstanding = requested;
        let mut draws = Vec::new();
        for stock in eligible {
            if outstanding == 0 {
                break;
            }
            let take = outstanding.min(stock.lot.quantity);
            draws.push(LotDraw {
                lot_id: stock.lot.id,
                lot_code: stock.lot.lot_code.clone(),
                expiration_date: stock.lot.expiration_date,
                quantity: take,
                remaining: stock.lot.quantity - take,
            });
            outstanding -= take;
        }

        let storage_id = draws
            .first()
            .and_then(|d| lots.iter().find(|l| l.lot.id == d.lot_id))
            .and_then(|l| l.lot.storage_id);

        Ok(AllocationPlan {
            drug_id,
            requested,
            draws,
            storage_id,
        })
    }

    /// Load the drug's lots and plan against them.
    pub fn plan_for_drug(
        &self,
        conn: &Connection,
        drug_id: i64,
        requested: i64,
    ) -> Result<AllocationPlan, PharmacyError> {
        if db::get_drug(conn, drug_id)?.is_none() {
            return Err(PharmacyError::not_found("drug", drug_id));
        }
        let lots = db::get_available_lots(conn, drug_id, self.today)?;
        self.plan(drug_id, requested, &lots)
    }

    /// Decrement every drawn lot and refresh the drug's on-hand total.
    /// Returns the new total.
    pub fn apply(&self, conn: &Connection, plan: &AllocationPlan) -> Result<i64, PharmacyError> {
        for draw in &plan.draws {
            db::decrement_lot(conn, draw.lot_id, draw.quantity)?;
        }
        let total = db::recompute_drug_inventory(conn, plan.drug_id)?;
        tracing::debug!(
            drug_id = plan.drug_id,
            lots = plan.draws.len(),
            quantity = plan.requested,
            remaining_total = total,
            "Lots decremented"
        );
        Ok(total)
    }
}
