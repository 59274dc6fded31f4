pub mod account; // Password change, user creation
pub mod alerts; // Stock alerts
pub mod api; // HTTP API
pub mod config;
pub mod context; // Request identity + role permissions
pub mod db;
pub mod dispensation; // Queue, dispensing, administration
pub mod error;
pub mod inventory; // Drugs, lots, recalls
pub mod models;
pub mod safety; // Interactions, allergies, lot allocation
pub mod storage; // Storage locations
pub mod waste; // Waste tracking

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Migrate the database, serve the API, and stop gracefully on Ctrl-C.
pub async fn run(settings: config::Settings) -> Result<(), String> {
    tracing::info!("HospitalPharmacy starting v{}", config::APP_VERSION);

    if let Some(parent) = settings.database_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Cannot create {}: {e}", parent.display()))?;
    }
    db::open_database(&settings.database_path).map_err(|e| e.to_string())?;
    tracing::info!(path = %settings.database_path.display(), "Database ready");

    let ctx = api::ApiContext::new(settings.database_path);
    let server = api::start_api_server(ctx, settings.bind_addr).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Cannot listen for shutdown signal: {e}"))?;
    server.stop().await;
    Ok(())
}
