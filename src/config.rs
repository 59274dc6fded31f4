use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HospitalPharmacy";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Trailing window of prescriptions considered for interaction checks.
pub const INTERACTION_WINDOW_MONTHS: u32 = 6;

/// Lots expiring within this many days show up in stock alerts.
pub const EXPIRY_WARNING_DAYS: i64 = 90;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// PBKDF2-SHA256 iterations for newly stored password hashes.
pub const PASSWORD_ITERATIONS: u32 = 600_000;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Get the application data directory
/// ~/HospitalPharmacy/ (current directory when no home is known)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the pharmacy database
pub fn database_path() -> PathBuf {
    app_data_dir().join("pharmacy.db")
}

/// Log filter used when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "hospital_pharmacy=info,tower_http=info"
}

/// Runtime settings, read from the environment with the defaults above.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Settings {
    /// `PHARMACY_DB_PATH` and `PHARMACY_BIND_ADDR` override the defaults.
    pub fn from_env() -> Result<Self, String> {
        let database_path = std::env::var_os("PHARMACY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(database_path);
        let bind = std::env::var("PHARMACY_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| format!("Invalid PHARMACY_BIND_ADDR '{bind}': {e}"))?;
        Ok(Self {
            database_path,
            bind_addr,
        })
    }
}
