//! Stock alerts: drugs outside their stock bounds and lots that need attention.

use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{self, DatabaseError};
use crate::error::PharmacyError;
use crate::models::{Drug, Lot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotAlert {
    #[serde(flatten)]
    pub lot: Lot,
    pub commercial_name: String,
    /// Negative once the lot has expired.
    pub days_until_expiry: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAlertReport {
    pub as_of: NaiveDate,
    pub warning_days: i64,
    pub low_stock: Vec<Drug>,
    pub overstock: Vec<Drug>,
    /// Usable lots expiring within the warning window.
    pub expiring_soon: Vec<LotAlert>,
    pub expired_with_stock: Vec<LotAlert>,
    pub recalled_with_stock: Vec<LotAlert>,
}

impl StockAlertReport {
    pub fn total_alerts(&self) -> usize {
        self.low_stock.len()
            + self.overstock.len()
            + self.expiring_soon.len()
            + self.expired_with_stock.len()
            + self.recalled_with_stock.len()
    }
}

/// Lots holding stock, with drug name and recall flag, soonest expiration first.
fn lots_with_stock(conn: &Connection) -> Result<Vec<(LotAlert, bool)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.drug_id, l.lot_code, l.expiration_date, l.quantity, l.storage_id,
                l.received_date, d.commercial_name,
                EXISTS (SELECT 1 FROM recalls r
                        WHERE r.drug_id = l.drug_id AND r.lot_code = l.lot_code
                          AND r.status = 'active')
         FROM lots l
         JOIN drugs d ON d.id = l.drug_id
         WHERE l.quantity > 0
         ORDER BY l.expiration_date, l.id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            LotAlert {
                lot: Lot {
                    id: row.get(0)?,
                    drug_id: row.get(1)?,
                    lot_code: row.get(2)?,
                    expiration_date: row.get(3)?,
                    quantity: row.get(4)?,
                    storage_id: row.get(5)?,
                    received_date: row.get(6)?,
                },
                commercial_name: row.get(7)?,
                days_until_expiry: 0,
            },
            row.get::<_, bool>(8)?,
        ))
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn stock_alerts(
    conn: &Connection,
    today: NaiveDate,
    warning_days: i64,
) -> Result<StockAlertReport, PharmacyError> {
    if warning_days < 0 {
        return Err(PharmacyError::Validation(
            "warning window must not be negative".into(),
        ));
    }
    let horizon = today
        .checked_add_days(Days::new(warning_days.unsigned_abs()))
        .unwrap_or(NaiveDate::MAX);

    let mut expiring_soon = Vec::new();
    let mut expired_with_stock = Vec::new();
    let mut recalled_with_stock = Vec::new();

    for (mut alert, recalled) in lots_with_stock(conn)? {
        alert.days_until_expiry = (alert.lot.expiration_date - today).num_days();
        if recalled {
            recalled_with_stock.push(alert);
        } else if alert.lot.expiration_date < today {
            expired_with_stock.push(alert);
        } else if alert.lot.expiration_date <= horizon {
            expiring_soon.push(alert);
        }
    }

    let report = StockAlertReport {
        as_of: today,
        warning_days,
        low_stock: db::get_drugs_below_minimum(conn)?,
        overstock: db::get_drugs_above_maximum(conn)?,
        expiring_soon,
        expired_with_stock,
        recalled_with_stock,
    };
    tracing::debug!(alerts = report.total_alerts(), "Stock alerts computed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::{NewDrug, NewLot, NewRecall};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn drug(conn: &Connection, name: &str, min: i64, max: i64) -> i64 {
        db::insert_drug(
            conn,
            &NewDrug {
                commercial_name: name.into(),
                active_ingredient: name.to_lowercase(),
                atc_code: None,
                unit_price: 1.0,
                minimum_stock: min,
                maximum_stock: max,
            },
        )
        .unwrap()
    }

    fn lot(conn: &Connection, drug_id: i64, code: &str, exp: NaiveDate, qty: i64) {
        db::insert_lot(
            conn,
            &NewLot {
                drug_id,
                lot_code: code.into(),
                expiration_date: exp,
                quantity: qty,
                storage_id: None,
                received_date: date(2023, 1, 1),
            },
        )
        .unwrap();
        db::recompute_drug_inventory(conn, drug_id).unwrap();
    }

    #[test]
    fn report_buckets() {
        let conn = open_memory_database().unwrap();
        let today = date(2024, 6, 1);
        let low = drug(&conn, "Lowdose", 50, 0);
        let high = drug(&conn, "Plenty", 0, 10);
        let unbounded = drug(&conn, "Unbounded", 0, 0);

        lot(&conn, low, "L-OK", date(2025, 6, 1), 5);
        lot(&conn, high, "H-SOON", date(2024, 7, 1), 20);
        lot(&conn, unbounded, "U-EXP", date(2024, 5, 31), 3);
        lot(&conn, unbounded, "U-EMPTY", date(2024, 5, 1), 0);
        lot(&conn, unbounded, "U-RECALL", date(2025, 1, 1), 7);
        lot(&conn, unbounded, "U-EDGE", date(2024, 8, 30), 1);
        lot(&conn, unbounded, "U-FAR", date(2024, 8, 31), 1);

        let user = db::insert_user(&conn, "p", "P", Role::Pharmacist, "x").unwrap();
        db::insert_recall(
            &conn,
            &NewRecall {
                drug_id: unbounded,
                lot_code: "U-RECALL".into(),
                reason: "sterility".into(),
            },
            today,
            user,
        )
        .unwrap();

        let report = stock_alerts(&conn, today, 90).unwrap();

        assert_eq!(report.low_stock.iter().map(|d| d.id).collect::<Vec<_>>(), [low]);
        assert_eq!(report.overstock.iter().map(|d| d.id).collect::<Vec<_>>(), [high]);

        fn codes(alerts: &[LotAlert]) -> Vec<&str> {
            alerts.iter().map(|a| a.lot.lot_code.as_str()).collect()
        }
        assert_eq!(codes(&report.expiring_soon), ["H-SOON", "U-EDGE"]);
        assert_eq!(codes(&report.expired_with_stock), ["U-EXP"]);
        assert_eq!(report.expired_with_stock[0].days_until_expiry, -1);
        assert_eq!(codes(&report.recalled_with_stock), ["U-RECALL"]);
        assert_eq!(report.total_alerts(), 6);
    }

    #[test]
    fn empty_pharmacy_has_no_alerts() {
        let conn = open_memory_database().unwrap();
        let report = stock_alerts(&conn, date(2024, 1, 1), 30).unwrap();
        assert_eq!(report.total_alerts(), 0);
        assert!(matches!(
            stock_alerts(&conn, date(2024, 1, 1), -1),
            Err(PharmacyError::Validation(_))
        ));
    }
}
