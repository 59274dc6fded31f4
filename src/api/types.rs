//! Shared types for the API layer.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::account::PasswordPolicy;
use crate::api::error::ApiError;
use crate::context::{AuthenticatedUser, RequestContext};
use crate::db;

/// Shared context for all API routes and middleware.
///
/// Each request opens its own connection; SQLite's busy timeout serializes
/// concurrent writers.
#[derive(Clone)]
pub struct ApiContext {
    pub database_path: Arc<PathBuf>,
    pub password_policy: PasswordPolicy,
}

impl ApiContext {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Arc::new(database_path.into()),
            password_policy: PasswordPolicy::default(),
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn open_db(&self) -> Result<Connection, ApiError> {
        Ok(db::open_database(self.database_path.as_path())?)
    }

    /// Run database work on the blocking pool with a fresh connection.
    ///
    /// SQLite calls can wait on the busy timeout and password hashing is
    /// CPU-bound; neither may run on a runtime worker.
    pub async fn with_db<T, E, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        E: Into<ApiError> + Send + 'static,
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    {
        let ctx = self.clone();
        run_blocking(move || {
            let conn = ctx.open_db()?;
            work(&conn).map_err(Into::into)
        })
        .await
    }

    /// Like [`with_db`](Self::with_db), with the connection bound to the
    /// acting user for mutating operations.
    pub async fn with_request_context<T, E, F>(
        &self,
        user: AuthenticatedUser,
        work: F,
    ) -> Result<T, ApiError>
    where
        T: Send + 'static,
        E: Into<ApiError> + Send + 'static,
        F: FnOnce(&RequestContext) -> Result<T, E> + Send + 'static,
    {
        let ctx = self.clone();
        run_blocking(move || {
            let rc = RequestContext::new(user, ctx.open_db()?);
            work(&rc).map_err(Into::into)
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {e}")))?
}

/// Per-request identifier, injected by the audit middleware.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
