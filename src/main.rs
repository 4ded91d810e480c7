use dotenvy::dotenv;
use loyola_motors::{
    Result, StoreOptions,
    config::{self, Backend, StoreConfig},
    core::{RecordStore, spawn_uptime_monitor},
    storage::{DatabaseStorage, MemoryStorage, Storage},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    let store_config = app_config.store;
    let options = StoreOptions::from_config(&store_config)?;

    // 4. Open the configured backend and serve
    match store_config.backend {
        Backend::Database => {
            let url = store_config.resolved_database_url();
            let db = config::database::create_connection(&url)
                .await
                .inspect_err(|e| error!("Failed to initialize database: {}", e))?;
            serve(DatabaseStorage::new(db), options, &store_config).await
        }
        Backend::Memory => serve(MemoryStorage::new(), options, &store_config).await,
    }
}

async fn serve<S>(storage: S, options: StoreOptions, store_config: &StoreConfig) -> Result<()>
where
    S: Storage + 'static,
{
    // 5. Initialize tables, seed demo data if the store is empty
    let store = Arc::new(RecordStore::new(storage, options));
    store
        .initialize()
        .await
        .inspect_err(|e| error!("Failed to initialize record store: {}", e))?;

    let metricas = store.get_metricas().await?;
    info!(
        "Store ready: {} clientes ({} activos), {} vehiculos, {} servicios pendientes, uptime {:.2}%",
        metricas.total_clientes,
        metricas.clientes_activos,
        metricas.total_vehiculos,
        metricas.servicios_pendientes,
        metricas.uptime
    );

    // 6. Keep the uptime metric moving until shutdown
    let monitor = store_config
        .uptime_interval()
        .map(|period| spawn_uptime_monitor(Arc::clone(&store), period));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested.");
    if let Some(handle) = monitor {
        handle.abort();
    }
    Ok(())
}
