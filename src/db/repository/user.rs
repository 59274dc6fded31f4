use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::*;

pub fn insert_user(
    conn: &Connection,
    username: &str,
    full_name: &str,
    role: Role,
    password_hash: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, full_name, role, password_hash) VALUES (?1, ?2, ?3, ?4)",
        params![username, full_name, role.as_str(), password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, username, full_name, role, active FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, username, full_name, role, active)) => Ok(Some(User {
            id,
            username,
            full_name,
            role: Role::from_str(&role)?,
            active,
        })),
        None => Ok(None),
    }
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER(?1))",
        params![username],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn get_password_hash(conn: &Connection, user_id: i64) -> Result<Option<String>, DatabaseError> {
    let hash = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(hash)
}

pub fn update_password_hash(
    conn: &Connection,
    user_id: i64,
    password_hash: &str,
    changed_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?2, password_changed_at = ?3 WHERE id = ?1",
        params![user_id, password_hash, changed_at],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: user_id.to_string(),
        });
    }
    Ok(())
}
