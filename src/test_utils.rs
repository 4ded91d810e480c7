//! Shared test utilities.
//!
//! Helpers for building stores over each backend and creating records with
//! sensible defaults.

use crate::{
    core::{RecordStore, StoreOptions},
    config::SeedData,
    errors::Result,
    models::{Record, Table},
    storage::{DatabaseStorage, MemoryStorage, Storage},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Converts a `json!` object literal into a record.
///
/// # Panics
/// Panics if `value` is not an object.
#[allow(clippy::panic)]
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Creates an in-memory `SQLite` database with the key-value table created.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Initialized in-memory store without demo data.
pub async fn setup_test_store() -> Result<RecordStore<MemoryStorage>> {
    let store = RecordStore::new(MemoryStorage::new(), StoreOptions::default());
    store.initialize().await?;
    Ok(store)
}

/// Initialized in-memory store holding the built-in demo data.
pub async fn setup_seeded_store() -> Result<RecordStore<MemoryStorage>> {
    let options = StoreOptions {
        seed: Some(SeedData::demo()?),
        ..StoreOptions::default()
    };
    let store = RecordStore::new(MemoryStorage::new(), options);
    store.initialize().await?;
    Ok(store)
}

/// Initialized store over an in-memory `SQLite` database.
pub async fn setup_database_store() -> Result<RecordStore<DatabaseStorage>> {
    let storage = DatabaseStorage::new(setup_test_db().await?);
    let store = RecordStore::new(storage, StoreOptions::default());
    store.initialize().await?;
    Ok(store)
}

/// Creates a customer with the given name and tier.
///
/// # Defaults
/// * `apellidos`: "Prueba"
/// * `email`: `"<nombre>@test.com"` (lowercase)
/// * `activo`: true
pub async fn create_test_cliente<S: Storage>(
    store: &RecordStore<S>,
    nombre: &str,
    tipo: &str,
) -> Result<Record> {
    store
        .create(
            Table::Clientes,
            record(json!({
                "nombre": nombre,
                "apellidos": "Prueba",
                "email": format!("{}@test.com", nombre.to_lowercase()),
                "tipo": tipo,
                "activo": true,
            })),
        )
        .await
}

/// Creates a service for customer `c1` / vehicle `v1`.
pub async fn create_test_servicio<S: Storage>(
    store: &RecordStore<S>,
    estado: &str,
    fecha: &str,
    costo: f64,
) -> Result<Record> {
    store
        .create(
            Table::Servicios,
            record(json!({
                "clienteId": "c1",
                "vehiculoId": "v1",
                "descripcion": "Servicio de prueba",
                "estado": estado,
                "fecha": fecha,
                "costo": costo,
            })),
        )
        .await
}
