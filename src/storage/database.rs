use super::Storage;
use crate::{
    entities::{KvEntry, kv_entry},
    errors::Result,
};
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};
use tracing::{debug, instrument};

/// Storage persisted in the `kv_entries` table of a `SeaORM` connection.
///
/// The table must exist; see [`crate::config::database::create_tables`].
#[derive(Debug, Clone)]
pub struct DatabaseStorage {
    db: DatabaseConnection,
}

impl DatabaseStorage {
    /// Wraps an open connection whose schema is already created.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl Storage for DatabaseStorage {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = KvEntry::find_by_id(key.to_string()).one(&self.db).await?;
        debug!("Storage key '{}' present: {}", key, entry.is_some());
        Ok(entry.map(|model| model.value))
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = kv_entry::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(chrono::Utc::now().naive_utc()),
        };

        // Upsert: a key is written many times over the store's lifetime
        KvEntry::insert(entry)
            .on_conflict(
                OnConflict::column(kv_entry::Column::Key)
                    .update_columns([kv_entry::Column::Value, kv_entry::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<()> {
        KvEntry::delete_by_id(key.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
