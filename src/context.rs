//! Request-scoped context: who is acting, and the connection they act through.
//!
//! Built once per request by the caller (the API layer) after the gateway has
//! authenticated the user. Mutating operations take a `&RequestContext` and
//! check a [`Permission`] before touching the database.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::PharmacyError;
use crate::models::enums::Role;
use crate::models::User;

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Dispense,
    ManageRecalls,
    ReceiveStock,
    RecordWaste,
    ManageStorage,
    ManageDrugs,
    RecordAdministration,
    RecordAllergies,
    ManageUsers,
}

impl Permission {
    pub fn granted_to(self, role: Role) -> bool {
        use Permission::*;
        match role {
            Role::Administrator => true,
            Role::Pharmacist => !matches!(self, RecordAdministration | ManageUsers),
            Role::Technician => matches!(self, ReceiveStock | RecordWaste | ManageStorage),
            Role::Nurse => matches!(self, RecordAdministration | RecordAllergies),
        }
    }
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

pub struct RequestContext {
    pub user: AuthenticatedUser,
    pub conn: Connection,
}

impl RequestContext {
    pub fn new(user: AuthenticatedUser, conn: Connection) -> Self {
        Self { user, conn }
    }

    /// Fail with `Forbidden` unless the acting user's role grants `permission`.
    pub fn authorize(&self, permission: Permission) -> Result<(), PharmacyError> {
        if permission.granted_to(self.user.role) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.user.id,
                role = %self.user.role,
                ?permission,
                "Permission denied"
            );
            Err(PharmacyError::Forbidden(format!(
                "role '{}' may not perform {permission:?}",
                self.user.role
            )))
        }
    }
}
