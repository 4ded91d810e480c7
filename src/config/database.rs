//! Database configuration module.
//!
//! This module handles the `SQLite` connection for the database storage backend
//! and creates its single key-value table from the `SeaORM` entity definition,
//! so the schema always matches the Rust struct without hand-written SQL.

use crate::entities::KvEntry;
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Default location of the on-disk database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyola_motors.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the default path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Opens a connection to `database_url` and makes sure the schema exists.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    ensure_parent_dir(database_url)?;
    debug!("Connecting to database at {}", database_url);
    let db = Database::connect(database_url).await?;
    create_tables(&db).await?;
    info!("Database connection ready.");
    Ok(db)
}

/// Creates the `kv_entries` table if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut kv_table = schema.create_table_from_entity(KvEntry);
    kv_table.if_not_exists();

    db.execute(builder.build(&kv_table)).await?;
    Ok(())
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if file.is_empty() || file.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Config {
            message: format!("Failed to create database directory {}: {e}", parent.display()),
        })?;
    }
    Ok(())
}
