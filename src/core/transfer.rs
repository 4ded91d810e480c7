//! Whole-database export, import and reset.

use super::{events::DATA_IMPORTED, store::RecordStore};
use crate::{
    errors::{Error, Result},
    models::{Record, Table},
    storage::Storage,
};
use serde_json::{Value, json};
use tracing::{info, warn};

impl<S: Storage> RecordStore<S> {
    /// Every table keyed by its short name.
    pub async fn export_snapshot(&self) -> Result<Record> {
        let mut snapshot = Record::new();
        for table in Table::ALL {
            let records = self.load_table(table).await?;
            snapshot.insert(
                table.as_str().to_string(),
                Value::Array(records.into_iter().map(Value::Object).collect()),
            );
        }
        Ok(snapshot)
    }

    /// The export snapshot serialized as JSON; accepted as-is by [`Self::import_data`].
    pub async fn export_data(&self) -> Result<String> {
        let snapshot = self.export_snapshot().await?;
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Replaces every table present in `serialized` with the given records.
    ///
    /// The whole payload is validated before anything is written: it must be a
    /// JSON object whose recognised table keys hold arrays of objects. Unknown
    /// keys are ignored. Emits `data_imported` with the imported table names.
    ///
    /// # Errors
    /// Returns `Error::InvalidImport` for malformed input, leaving the store
    /// untouched, or the storage error if a write fails.
    pub async fn import_data(&self, serialized: &str) -> Result<()> {
        let tables = parse_import(serialized).inspect_err(|e| warn!("Import rejected: {}", e))?;

        let _guard = self.write_lock.lock().await;
        for (table, records) in &tables {
            self.save_table(*table, records).await?;
        }

        let names: Vec<&str> = tables.iter().map(|(table, _)| table.as_str()).collect();
        info!("Imported tables: {:?}", names);
        self.events.emit(DATA_IMPORTED, &json!({ "tables": names }));
        Ok(())
    }

    /// Deletes every table and the system configuration, then re-initializes,
    /// re-seeding demo data when the store has any. The current user is kept.
    /// The reset and the re-seed happen under one write lock, so no other
    /// mutation can land in between.
    pub async fn clear_all_data(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        for table in Table::ALL {
            self.storage.remove(&self.table_key(table)).await?;
        }
        self.storage.remove(&self.config_key()).await?;
        warn!("All store data cleared.");
        self.initialize_locked().await
    }
}

fn parse_import(serialized: &str) -> Result<Vec<(Table, Vec<Record>)>> {
    let value: Value = serde_json::from_str(serialized).map_err(|e| Error::InvalidImport {
        message: format!("not valid JSON: {e}"),
    })?;
    let Value::Object(payload) = value else {
        return Err(Error::InvalidImport {
            message: "expected a JSON object keyed by table name".to_string(),
        });
    };

    let mut tables = Vec::new();
    for (key, value) in payload {
        let Ok(table) = key.parse::<Table>() else {
            warn!("Ignoring unknown table '{}' in import", key);
            continue;
        };
        let Value::Array(items) = value else {
            return Err(Error::InvalidImport {
                message: format!("'{key}' must be an array"),
            });
        };
        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(Error::InvalidImport {
                    message: format!("'{key}[{index}]' must be an object"),
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        tables.push((table, records));
    }
    Ok(tables)
}
