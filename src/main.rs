use kinesio_core::{
    config::{patient_data_dir_from_env_value, save_delay_from_env_value},
    constants::{DEFAULT_BACKUP_FOLDER_NAME, DEFAULT_STORAGE_KEY},
    CoreConfig, NonEmptyText,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Kinesio application
///
/// Starts the REST server and keeps it running until Ctrl-C. Edits still
/// waiting in an autosave controller are committed before the process exits.
///
/// # Environment Variables
/// - `KINESIO_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `KINESIO_DATA_DIR`: Directory for the patient store (default: "patient_data")
/// - `KINESIO_SAVE_DELAY_MS`: Autosave quiet period in milliseconds (default: 1500)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kinesio_run=info".parse()?)
                .add_directive("kinesio_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("KINESIO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        patient_data_dir_from_env_value(std::env::var("KINESIO_DATA_DIR").ok()),
        NonEmptyText::new(DEFAULT_STORAGE_KEY)?,
        save_delay_from_env_value(std::env::var("KINESIO_SAVE_DELAY_MS").ok())?,
        NonEmptyText::new(DEFAULT_BACKUP_FOLDER_NAME)?,
    )?);

    tracing::info!(
        "++ Patient store at {}",
        cfg.patient_data_dir().display()
    );
    api_rest::serve(cfg, &rest_addr).await
}
