//! Dispensation: the pharmacist's queue, lot-allocated dispensing, and the
//! nurse's administration record.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::context::{Permission, RequestContext};
use crate::db::{self, DatabaseError};
use crate::error::PharmacyError;
use crate::models::enums::PrescriptionStatus;
use crate::models::{Dispensing, ItemState, PrescriptionItem};
use crate::safety::{AllocationPlan, LotAllocator};

// ═══════════════════════════════════════════
// View types
// ═══════════════════════════════════════════

/// A prescription item awaiting dispensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub item_id: i64,
    pub prescription_id: i64,
    pub prescribed_date: NaiveDate,
    pub patient_id: i64,
    pub patient_mrn: String,
    pub patient_name: String,
    pub drug_id: i64,
    pub commercial_name: String,
    pub dose: String,
    pub frequency: String,
    /// Units in lots eligible for allocation today.
    pub available_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispensationReceipt {
    pub dispensing_id: i64,
    pub item_id: i64,
    pub dispensed_at: NaiveDateTime,
    pub allocation: AllocationPlan,
    /// Drug on-hand total after the draw.
    pub remaining_inventory: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStatus {
    pub item: PrescriptionItem,
    pub state: ItemState,
    pub dispensings: Vec<Dispensing>,
    pub administrations: i64,
}

// ═══════════════════════════════════════════
// Queue
// ═══════════════════════════════════════════

/// Items of active prescriptions with no dispensing yet, oldest prescription first.
pub fn dispensation_queue(
    conn: &Connection,
    today: NaiveDate,
) -> Result<Vec<QueueEntry>, PharmacyError> {
    let mut stmt = conn.prepare(
        "SELECT pi.id, p.id, p.prescribed_date, pt.id, pt.mrn,
                pt.first_name || ' ' || pt.last_name,
                d.id, d.commercial_name, pi.dose, pi.frequency,
                (SELECT COALESCE(SUM(l.quantity), 0) FROM lots l
                 WHERE l.drug_id = d.id AND l.quantity > 0 AND l.expiration_date >= ?1
                   AND NOT EXISTS (SELECT 1 FROM recalls r
                                   WHERE r.drug_id = l.drug_id AND r.lot_code = l.lot_code
                                     AND r.status = 'active'))
         FROM prescription_items pi
         JOIN prescriptions p ON p.id = pi.prescription_id
         JOIN patients pt ON pt.id = p.patient_id
         JOIN drugs d ON d.id = pi.drug_id
         WHERE p.status = 'active'
           AND NOT EXISTS (SELECT 1 FROM dispensing ds WHERE ds.item_id = pi.id)
         ORDER BY p.prescribed_date, pi.id",
    )?;
    let rows = stmt.query_map(params![today], |row| {
        Ok(QueueEntry {
            item_id: row.get(0)?,
            prescription_id: row.get(1)?,
            prescribed_date: row.get(2)?,
            patient_id: row.get(3)?,
            patient_mrn: row.get(4)?,
            patient_name: row.get(5)?,
            drug_id: row.get(6)?,
            commercial_name: row.get(7)?,
            dose: row.get(8)?,
            frequency: row.get(9)?,
            available_quantity: row.get(10)?,
        })
    })?;
    let entries = rows
        .map(|r| r.map_err(DatabaseError::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

// ═══════════════════════════════════════════
// Dispensing
// ═══════════════════════════════════════════

fn require_item(conn: &Connection, item_id: i64) -> Result<PrescriptionItem, PharmacyError> {
    db::get_prescription_item(conn, item_id)?
        .ok_or_else(|| PharmacyError::not_found("prescription item", item_id))
}

/// Dispense `quantity` units for a prescription item.
///
/// Lots are drawn soonest-expiration first, skipping recalled and expired
/// ones. Either every lot decrement, the dispensing row and the drug total
/// are written, or nothing is.
pub fn dispense(
    ctx: &RequestContext,
    item_id: i64,
    quantity: i64,
    now: NaiveDateTime,
) -> Result<DispensationReceipt, PharmacyError> {
    ctx.authorize(Permission::Dispense)?;

    let tx = ctx.conn.unchecked_transaction()?;
    let item = require_item(&tx, item_id)?;
    let prescription = db::get_prescription(&tx, item.prescription_id)?
        .ok_or_else(|| PharmacyError::not_found("prescription", item.prescription_id))?;
    if prescription.status != PrescriptionStatus::Active {
        return Err(PharmacyError::Validation(format!(
            "prescription {} is {}",
            prescription.id, prescription.status
        )));
    }
    if !db::get_dispensings_for_item(&tx, item_id)?.is_empty() {
        return Err(PharmacyError::Validation(format!(
            "item {item_id} has already been dispensed"
        )));
    }

    let allocator = LotAllocator::new(now.date());
    let plan = match allocator.plan_for_drug(&tx, item.drug_id, quantity) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::warn!(
                item_id,
                drug_id = item.drug_id,
                quantity,
                error = %e,
                "Dispensation refused"
            );
            return Err(e);
        }
    };
    let remaining_inventory = allocator.apply(&tx, &plan)?;

    let dispensing_id =
        db::insert_dispensing(&tx, item_id, quantity, ctx.user.id, plan.storage_id, now)?;
    for draw in &plan.draws {
        db::insert_dispensing_lot(&tx, dispensing_id, draw.lot_id, draw.quantity)?;
    }
    tx.commit()?;

    tracing::info!(
        item_id,
        dispensing_id,
        drug_id = item.drug_id,
        quantity,
        lots = plan.draws.len(),
        pharmacist_id = ctx.user.id,
        "Item dispensed"
    );

    Ok(DispensationReceipt {
        dispensing_id,
        item_id,
        dispensed_at: now,
        allocation: plan,
        remaining_inventory,
    })
}

pub fn item_status(conn: &Connection, item_id: i64) -> Result<ItemStatus, PharmacyError> {
    let item = require_item(conn, item_id)?;
    let dispensings = db::get_dispensings_for_item(conn, item_id)?;
    let administrations = db::count_administrations(conn, item_id)?;
    Ok(ItemStatus {
        state: ItemState::from_records(dispensings.len() as i64, administrations),
        item,
        dispensings,
        administrations,
    })
}

// ═══════════════════════════════════════════
// Administration
// ═══════════════════════════════════════════

/// Record that the acting nurse gave a dispensed item to the patient.
pub fn record_administration(
    ctx: &RequestContext,
    item_id: i64,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> Result<ItemStatus, PharmacyError> {
    ctx.authorize(Permission::RecordAdministration)?;

    let tx = ctx.conn.unchecked_transaction()?;
    let status = item_status(&tx, item_id)?;
    if status.state == ItemState::Prescribed {
        return Err(PharmacyError::Validation(format!(
            "item {item_id} has not been dispensed"
        )));
    }
    let id = db::insert_administration(&tx, item_id, ctx.user.id, now, notes)?;
    let updated = item_status(&tx, item_id)?;
    tx.commit()?;

    tracing::info!(
        item_id,
        administration_id = id,
        nurse_id = ctx.user.id,
        "Administration recorded"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuthenticatedUser;
    use crate::db::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::{NewDrug, NewLot, NewRecall, Patient};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(10, 0, 0).unwrap()
    }

    struct Ward {
        pharmacist: RequestContext,
        drug: i64,
        l1: i64,
        l2: i64,
        item: i64,
    }

    fn as_user(conn: Connection, id: i64, role: Role) -> RequestContext {
        RequestContext::new(
            AuthenticatedUser {
                id,
                username: format!("user{id}"),
                full_name: format!("User {id}"),
                role,
            },
            conn,
        )
    }

    /// Drug with lots L1 (exp 2024-01-01, 5 units) and L2 (exp 2024-06-01,
    /// 10 units), and one active prescription item for it.
    fn ward() -> Ward {
        let conn = open_memory_database().unwrap();
        let pharmacist =
            db::insert_user(&conn, "pharm", "Pat Pharm", Role::Pharmacist, "x").unwrap();
        db::insert_user(&conn, "nurse", "Nina Nurse", Role::Nurse, "x").unwrap();
        let patient = db::insert_patient(
            &conn,
            &Patient {
                id: 0,
                mrn: "MRN-1".into(),
                first_name: "Leo".into(),
                last_name: "Park".into(),
                birth_date: None,
            },
        )
        .unwrap();
        let drug = db::insert_drug(
            &conn,
            &NewDrug {
                commercial_name: "Enoxaparin".into(),
                active_ingredient: "enoxaparin".into(),
                atc_code: Some("B01AB05".into()),
                unit_price: 4.0,
                minimum_stock: 0,
                maximum_stock: 0,
            },
        )
        .unwrap();
        let lot = |code: &str, exp| {
            db::insert_lot(
                &conn,
                &NewLot {
                    drug_id: drug,
                    lot_code: code.into(),
                    expiration_date: exp,
                    quantity: if code == "L1" { 5 } else { 10 },
                    storage_id: None,
                    received_date: date(2023, 6, 1),
                },
            )
            .unwrap()
        };
        let l1 = lot("L1", date(2024, 1, 1));
        let l2 = lot("L2", date(2024, 6, 1));
        db::recompute_drug_inventory(&conn, drug).unwrap();

        let active = PrescriptionStatus::Active;
        let rx =
            db::insert_prescription(&conn, patient, pharmacist, date(2023, 12, 1), active).unwrap();
        let item =
            db::insert_prescription_item(&conn, rx, drug, "40 mg", "daily", Some(10)).unwrap();

        Ward {
            pharmacist: as_user(conn, pharmacist, Role::Pharmacist),
            drug,
            l1,
            l2,
            item,
        }
    }

    fn lot_qty(conn: &Connection, id: i64) -> i64 {
        db::get_lot(conn, id).unwrap().unwrap().lot.quantity
    }

    #[test]
    fn queue_lists_undispensed_items_with_availability() {
        let w = ward();
        let queue = dispensation_queue(&w.pharmacist.conn, date(2023, 12, 15)).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].item_id, w.item);
        assert_eq!(queue[0].patient_name, "Leo Park");
        assert_eq!(queue[0].available_quantity, 15);

        // After L1 expires only L2 counts.
        let later = dispensation_queue(&w.pharmacist.conn, date(2024, 2, 1)).unwrap();
        assert_eq!(later[0].available_quantity, 10);

        dispense(&w.pharmacist, w.item, 3, at(date(2023, 12, 15))).unwrap();
        assert!(dispensation_queue(&w.pharmacist.conn, date(2023, 12, 15)).unwrap().is_empty());
    }

    #[test]
    fn dispense_draws_earliest_lot_first() {
        let w = ward();
        let receipt = dispense(&w.pharmacist, w.item, 8, at(date(2023, 12, 15))).unwrap();

        assert_eq!(receipt.allocation.draws.len(), 2);
        assert_eq!(receipt.remaining_inventory, 7);
        assert_eq!(lot_qty(&w.pharmacist.conn, w.l1), 0);
        assert_eq!(lot_qty(&w.pharmacist.conn, w.l2), 7);

        let status = item_status(&w.pharmacist.conn, w.item).unwrap();
        assert_eq!(status.state, ItemState::Dispensed);
        assert_eq!(status.dispensings.len(), 1);
        assert_eq!(status.dispensings[0].quantity, 8);

        let again = dispense(&w.pharmacist, w.item, 1, at(date(2023, 12, 16))).unwrap_err();
        assert!(matches!(again, PharmacyError::Validation(_)));
    }

    #[test]
    fn recalled_lot_is_not_dispensed() {
        let w = ward();
        db::insert_recall(
            &w.pharmacist.conn,
            &NewRecall {
                drug_id: w.drug,
                lot_code: "L1".into(),
                reason: "recall".into(),
            },
            date(2023, 12, 1),
            w.pharmacist.user.id,
        )
        .unwrap();

        dispense(&w.pharmacist, w.item, 5, at(date(2023, 12, 15))).unwrap();
        assert_eq!(lot_qty(&w.pharmacist.conn, w.l1), 5);
        assert_eq!(lot_qty(&w.pharmacist.conn, w.l2), 5);
    }

    #[test]
    fn shortfall_changes_nothing() {
        let w = ward();
        let err = dispense(&w.pharmacist, w.item, 20, at(date(2023, 12, 15))).unwrap_err();
        assert!(matches!(
            err,
            PharmacyError::InsufficientStock { requested: 20, available: 15, shortfall: 5, .. }
        ));

        let conn = &w.pharmacist.conn;
        assert_eq!(lot_qty(conn, w.l1), 5);
        assert_eq!(lot_qty(conn, w.l2), 10);
        assert_eq!(db::get_drug(conn, w.drug).unwrap().unwrap().actual_inventory, 15);
        assert_eq!(item_status(conn, w.item).unwrap().state, ItemState::Prescribed);
    }

    #[test]
    fn only_pharmacists_dispense() {
        let w = ward();
        let nurse = as_user(w.pharmacist.conn, 2, Role::Nurse);
        let err = dispense(&nurse, w.item, 1, at(date(2023, 12, 15))).unwrap_err();
        assert!(matches!(err, PharmacyError::Forbidden(_)));
    }

    #[test]
    fn administration_follows_dispensation() {
        let w = ward();
        let when = at(date(2023, 12, 15));
        let pharmacist_id = w.pharmacist.user.id;
        let nurse = as_user(w.pharmacist.conn, 2, Role::Nurse);

        let early = record_administration(&nurse, w.item, None, when).unwrap_err();
        assert!(matches!(early, PharmacyError::Validation(_)));

        let pharmacist = as_user(nurse.conn, pharmacist_id, Role::Pharmacist);
        dispense(&pharmacist, w.item, 2, when).unwrap();
        assert!(matches!(
            record_administration(&pharmacist, w.item, None, when),
            Err(PharmacyError::Forbidden(_))
        ));

        let nurse = as_user(pharmacist.conn, 2, Role::Nurse);
        let status = record_administration(&nurse, w.item, Some("left arm"), when).unwrap();
        assert_eq!(status.state, ItemState::Administered);
        assert_eq!(status.administrations, 1);
    }

    #[test]
    fn unknown_item() {
        let w = ward();
        assert!(matches!(
            item_status(&w.pharmacist.conn, 999),
            Err(PharmacyError::NotFound { entity: "prescription item", .. })
        ));
        assert!(matches!(
            dispense(&w.pharmacist, 999, 1, at(date(2023, 12, 15))),
            Err(PharmacyError::NotFound { .. })
        ));
    }
}
