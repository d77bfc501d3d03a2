//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `htr-run` binary starts the same
//! server after loading `.env`.
//!
//! # Environment Variables
//! - `HTR_DATA_DIR`: data directory (default: `htr_data`, created if missing)
//! - `HTR_REST_ADDR`: server address (default: `0.0.0.0:3000`)
//! - `HTR_MAX_BODY_BYTES`: request body limit in bytes (default: 50 MiB)

use api_rest::{serve, AppState, RestConfig};
use htr_core::{data_dir_from_env_value, CoreConfig, TreatmentService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("htr_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = data_dir_from_env_value(std::env::var("HTR_DATA_DIR").ok());
    let rest_cfg = RestConfig::from_env_values(
        std::env::var("HTR_REST_ADDR").ok(),
        std::env::var("HTR_MAX_BODY_BYTES").ok(),
    )?;

    tracing::info!("-- Starting HTR REST API on {}", rest_cfg.addr);
    tracing::info!("-- Data directory: {}", data_dir.display());

    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let state = AppState::new(TreatmentService::new(cfg));

    serve(state, &rest_cfg).await
}
