use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::InteractionSeverity;
use crate::models::*;

use super::like_pattern;

type RuleRow = (i64, i64, i64, String, String, Option<String>);

fn rule_row(row: &rusqlite::Row) -> rusqlite::Result<RuleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn rule_from_row(row: RuleRow) -> Result<InteractionRule, DatabaseError> {
    let (id, drug_a_id, drug_b_id, severity, description, recommendation) = row;
    Ok(InteractionRule {
        id,
        drug_a_id,
        drug_b_id,
        severity: InteractionSeverity::from_str(&severity)?,
        description,
        recommendation,
    })
}

pub fn insert_interaction(
    conn: &Connection,
    drug_a_id: i64,
    drug_b_id: i64,
    severity: InteractionSeverity,
    description: &str,
    recommendation: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO drug_interactions (drug_a_id, drug_b_id, severity, description, recommendation)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![drug_a_id, drug_b_id, severity.as_str(), description, recommendation],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up the rule for an unordered drug pair, whichever order it was stored in.
pub fn find_interaction(
    conn: &Connection,
    drug_a_id: i64,
    drug_b_id: i64,
) -> Result<Option<InteractionRule>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, drug_a_id, drug_b_id, severity, description, recommendation
             FROM drug_interactions
             WHERE (drug_a_id = ?1 AND drug_b_id = ?2) OR (drug_a_id = ?2 AND drug_b_id = ?1)
             ORDER BY id
             LIMIT 1",
            params![drug_a_id, drug_b_id],
            rule_row,
        )
        .optional()?;
    row.map(rule_from_row).transpose()
}

/// Interaction rules where either drug's name or ingredient contains `term`,
/// most severe first. `severity` restricts to one level.
pub fn search_interactions(
    conn: &Connection,
    term: Option<&str>,
    severity: Option<InteractionSeverity>,
) -> Result<Vec<InteractionListing>, DatabaseError> {
    let pattern = like_pattern(term.unwrap_or(""));
    let mut stmt = conn.prepare(
        "SELECT i.id, i.drug_a_id, i.drug_b_id, i.severity, i.description, i.recommendation,
                a.commercial_name, b.commercial_name
         FROM drug_interactions i
         JOIN drugs a ON a.id = i.drug_a_id
         JOIN drugs b ON b.id = i.drug_b_id
         WHERE (LOWER(a.commercial_name) LIKE LOWER(?1) ESCAPE '\\'
             OR LOWER(a.active_ingredient) LIKE LOWER(?1) ESCAPE '\\'
             OR LOWER(b.commercial_name) LIKE LOWER(?1) ESCAPE '\\'
             OR LOWER(b.active_ingredient) LIKE LOWER(?1) ESCAPE '\\')
           AND (?2 IS NULL OR i.severity = ?2)
         ORDER BY CASE i.severity
                    WHEN 'high' THEN 0 WHEN 'moderate' THEN 1 WHEN 'low' THEN 2 ELSE 3
                  END,
                  a.commercial_name, b.commercial_name",
    )?;

    let rows = stmt.query_map(params![pattern, severity.map(|s| s.as_str())], |row| {
        Ok((rule_row(row)?, row.get::<_, String>(6)?, row.get::<_, String>(7)?))
    })?;

    let mut listings = Vec::new();
    for row in rows {
        let (rule, drug_a_name, drug_b_name) = row?;
        listings.push(InteractionListing {
            rule: rule_from_row(rule)?,
            drug_a_name,
            drug_b_name,
        });
    }
    Ok(listings)
}
