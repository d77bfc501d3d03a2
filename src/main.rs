use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, RestConfig};
use htr_core::{CoreConfig, TreatmentService, data_dir_from_env_value};

/// Main entry point for the HTR application
///
/// Loads `.env`, resolves configuration once and serves the REST API until interrupted.
///
/// # Environment Variables
/// - `HTR_DATA_DIR`: Directory for patients, hospitals and treatments (default: "htr_data")
/// - `HTR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HTR_MAX_BODY_BYTES`: Request body limit in bytes (default: 52428800)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("htr_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("htr_core=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = data_dir_from_env_value(std::env::var("HTR_DATA_DIR").ok());
    let rest_cfg = RestConfig::from_env_values(
        std::env::var("HTR_REST_ADDR").ok(),
        std::env::var("HTR_MAX_BODY_BYTES").ok(),
    )?;

    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let service = TreatmentService::new(cfg.clone());

    tracing::info!("++ Data directory: {}", cfg.data_dir().display());
    tracing::info!(
        patients = service.patients().list().len(),
        hospitals = service.hospitals().list().len(),
        "++ Directories loaded"
    );
    tracing::info!("++ Starting HTR REST on {}", rest_cfg.addr);

    tokio::select! {
        result = api_rest::serve(AppState::new(service), &rest_cfg) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("++ Shutting down"),
    }

    Ok(())
}
