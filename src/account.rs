//! User accounts: password hashing, password change, user creation.
//!
//! Stored hash format: `pbkdf2-sha256$<iterations>$<b64 salt>$<b64 hash>`.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDateTime;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rusqlite::Connection;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::config::{MIN_PASSWORD_LENGTH, PASSWORD_ITERATIONS};
use crate::context::{Permission, RequestContext};
use crate::db;
use crate::error::PharmacyError;
use crate::models::{NewUser, User};

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// Length and work-factor rules for new passwords.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub iterations: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            iterations: PASSWORD_ITERATIONS,
        }
    }
}

/// Derived key bytes, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedKey([u8; HASH_LENGTH]);

impl DerivedKey {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Self(bytes)
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = DerivedKey::derive(password, &salt, iterations);
    format!(
        "{HASH_SCHEME}${iterations}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(key.0)
    )
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(expected)) else {
        return false;
    };
    let expected = Zeroizing::new(expected);
    if iterations == 0 || expected.len() != HASH_LENGTH {
        return false;
    }

    let key = DerivedKey::derive(password, &salt, iterations);
    key.0[..].ct_eq(&expected[..]).into()
}

/// Password change request, as submitted by the account page.
#[derive(Deserialize, Zeroize)]
#[zeroize(drop)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Change the acting user's password.
pub fn change_password(
    conn: &Connection,
    user_id: i64,
    change: &PasswordChange,
    policy: PasswordPolicy,
    now: NaiveDateTime,
) -> Result<(), PharmacyError> {
    if change.new_password != change.confirm_password {
        return Err(PharmacyError::Validation(
            "new password and confirmation do not match".into(),
        ));
    }
    if change.new_password.chars().count() < policy.min_length {
        return Err(PharmacyError::Validation(format!(
            "password must be at least {} characters",
            policy.min_length
        )));
    }
    if change.new_password == change.current_password {
        return Err(PharmacyError::Validation(
            "new password must differ from the current one".into(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    let stored = db::get_password_hash(&tx, user_id)?
        .ok_or_else(|| PharmacyError::not_found("user", user_id))?;
    if !verify_password(&change.current_password, &stored) {
        tracing::warn!(user_id, "Password change rejected: wrong current password");
        return Err(PharmacyError::Validation("current password is incorrect".into()));
    }

    let hash = hash_password(&change.new_password, policy.iterations);
    db::update_password_hash(&tx, user_id, &hash, now)?;
    tx.commit()?;

    tracing::info!(user_id, "Password changed");
    Ok(())
}

/// Create a user account. Administrators only.
pub fn create_user(
    ctx: &RequestContext,
    user: &NewUser,
    policy: PasswordPolicy,
) -> Result<User, PharmacyError> {
    ctx.authorize(Permission::ManageUsers)?;

    let username = user.username.trim();
    if username.is_empty() || user.full_name.trim().is_empty() {
        return Err(PharmacyError::Validation(
            "username and full name are required".into(),
        ));
    }
    if user.password.chars().count() < policy.min_length {
        return Err(PharmacyError::Validation(format!(
            "password must be at least {} characters",
            policy.min_length
        )));
    }

    let tx = ctx.conn.unchecked_transaction()?;
    if db::username_exists(&tx, username)? {
        return Err(PharmacyError::Validation(format!(
            "username '{username}' is already taken"
        )));
    }
    let hash = hash_password(&user.password, policy.iterations);
    let id = db::insert_user(&tx, username, user.full_name.trim(), user.role, &hash)?;
    let created = db::get_user(&tx, id)?.ok_or_else(|| PharmacyError::not_found("user", id))?;
    tx.commit()?;

    tracing::info!(user_id = id, role = %user.role, created_by = ctx.user.id, "User created");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::context::AuthenticatedUser;
    use crate::db::open_memory_database;
    use crate::models::enums::Role;

    fn fast() -> PasswordPolicy {
        PasswordPolicy {
            min_length: MIN_PASSWORD_LENGTH,
            iterations: 1_000,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn change(current: &str, new: &str, confirm: &str) -> PasswordChange {
        PasswordChange {
            current_password: current.into(),
            new_password: new.into(),
            confirm_password: confirm.into(),
        }
    }

    fn seed_user(conn: &Connection, password: &str) -> i64 {
        let hash = hash_password(password, fast().iterations);
        db::insert_user(conn, "jdoe", "Jane Doe", Role::Pharmacist, &hash).unwrap()
    }

    #[test]
    fn hash_roundtrip_and_salting() {
        let a = hash_password("correct horse", 1_000);
        let b = hash_password("correct horse", 1_000);
        assert!(a.starts_with("pbkdf2-sha256$1000$"));
        assert_ne!(a, b, "fresh salt per hash");
        assert!(verify_password("correct horse", &a));
        assert!(!verify_password("correct horsE", &a));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain-text"));
        assert!(!verify_password("x", "md5$1000$AAAA$AAAA"));
        assert!(!verify_password("x", "pbkdf2-sha256$abc$AAAA$AAAA"));
        assert!(!verify_password("x", "pbkdf2-sha256$1000$!!!$AAAA"));
        assert!(!verify_password("x", "pbkdf2-sha256$1000$AAAA$AAAA"));
    }

    #[test]
    fn password_change_happy_path() {
        let conn = open_memory_database().unwrap();
        let id = seed_user(&conn, "old-password");

        let request = change("old-password", "new-password", "new-password");
        change_password(&conn, id, &request, fast(), now()).unwrap();

        let stored = db::get_password_hash(&conn, id).unwrap().unwrap();
        assert!(verify_password("new-password", &stored));
        assert!(!verify_password("old-password", &stored));
    }

    #[test]
    fn password_change_rules() {
        let conn = open_memory_database().unwrap();
        let id = seed_user(&conn, "old-password");

        for (current, new, confirm) in [
            ("old-password", "new-password", "other-password"),
            ("old-password", "short", "short"),
            ("old-password", "old-password", "old-password"),
            ("wrong-password", "new-password", "new-password"),
        ] {
            let err = change_password(&conn, id, &change(current, new, confirm), fast(), now())
                .unwrap_err();
            assert!(matches!(err, PharmacyError::Validation(_)), "{current}/{new}/{confirm}");
        }

        let stored = db::get_password_hash(&conn, id).unwrap().unwrap();
        assert!(verify_password("old-password", &stored));
    }

    #[test]
    fn password_change_unknown_user() {
        let conn = open_memory_database().unwrap();
        let request = change("a-password", "b-password", "b-password");
        let err = change_password(&conn, 5, &request, fast(), now()).unwrap_err();
        assert!(matches!(err, PharmacyError::NotFound { entity: "user", .. }));
    }

    fn ctx(role: Role) -> RequestContext {
        let conn = open_memory_database().unwrap();
        let hash = hash_password("admin-password", 1_000);
        let id = db::insert_user(&conn, "root", "Root", role, &hash).unwrap();
        RequestContext::new(
            AuthenticatedUser {
                id,
                username: "root".into(),
                full_name: "Root".into(),
                role,
            },
            conn,
        )
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            full_name: "Nora Nurse".into(),
            role: Role::Nurse,
            password: "ward-seven-pass".into(),
        }
    }

    #[test]
    fn administrator_creates_user() {
        let ctx = ctx(Role::Administrator);
        let user = create_user(&ctx, &new_user("nnurse"), fast()).unwrap();
        assert_eq!(user.role, Role::Nurse);
        assert!(user.active);

        let stored = db::get_password_hash(&ctx.conn, user.id).unwrap().unwrap();
        assert!(verify_password("ward-seven-pass", &stored));

        let dup = create_user(&ctx, &new_user("NNurse"), fast()).unwrap_err();
        assert!(matches!(dup, PharmacyError::Validation(_)));
    }

    #[test]
    fn only_administrators_create_users() {
        let ctx = ctx(Role::Pharmacist);
        let err = create_user(&ctx, &new_user("nnurse"), fast()).unwrap_err();
        assert!(matches!(err, PharmacyError::Forbidden(_)));
    }
}
