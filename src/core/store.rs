//! Record store - table-scoped CRUD with change notification.
//!
//! Each table lives under one storage key as a JSON array and is rewritten in
//! full on every mutation. Mutations are serialized by an async write lock, so
//! a store shared between tasks never interleaves two read-modify-write
//! sequences. After each mutation the store emits `<table>_<kind>` and appends
//! an activity log entry.

use crate::{
    config::{SeedData, StoreConfig},
    core::{
        events::{EventBus, ListenerId},
        query::Query,
    },
    errors::{Error, Result},
    models::{ChangeKind, Record, Table},
    storage::Storage,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Identifier of the single metrics snapshot record.
pub const METRICS_RECORD_ID: &str = "sistema";
/// Uptime written into a fresh metrics snapshot.
pub const INITIAL_UPTIME: f64 = 99.9;

/// Construction options for a [`RecordStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Prefix of every storage key
    pub key_prefix: String,
    /// Maximum number of activity log entries kept
    pub activity_limit: usize,
    /// Demo records written by [`RecordStore::initialize`] into an empty store
    pub seed: Option<SeedData>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_prefix: "loyola".to_string(),
            activity_limit: 100,
            seed: None,
        }
    }
}

impl StoreOptions {
    /// Builds options from the `[store]` config table, loading seed data when enabled.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let seed = if config.seed_demo_data {
            Some(match &config.seed_path {
                Some(path) => SeedData::load(path)?,
                None => SeedData::demo()?,
            })
        } else {
            None
        };
        Ok(Self {
            key_prefix: config.key_prefix.clone(),
            activity_limit: config.activity_limit,
            seed,
        })
    }
}

/// CRUD store over a [`Storage`] backend.
#[derive(Debug)]
pub struct RecordStore<S> {
    pub(super) storage: S,
    pub(super) options: StoreOptions,
    pub(super) events: EventBus,
    pub(super) write_lock: Mutex<()>,
}

impl<S: Storage> RecordStore<S> {
    /// Creates a store over `storage`. Call [`Self::initialize`] before use.
    pub fn new(storage: S, options: StoreOptions) -> Self {
        Self {
            storage,
            options,
            events: EventBus::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// The persistence backend.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Options the store was built with.
    pub const fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// The event bus mutations are published on.
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Storage key of `table`, e.g. `loyola_clientes`.
    pub fn table_key(&self, table: Table) -> String {
        format!("{}_{}", self.options.key_prefix, table.as_str())
    }

    /// Storage key of the system configuration object.
    pub fn config_key(&self) -> String {
        format!("{}_config", self.options.key_prefix)
    }

    /// Storage key of the current user object.
    pub fn current_user_key(&self) -> String {
        format!("{}_current_user", self.options.key_prefix)
    }

    /// Ensures every table exists, seeds demo data into an empty store and
    /// writes the default configuration and metrics snapshot when missing.
    /// Seeding does not emit events.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.initialize_locked().await
    }

    /// Body of [`Self::initialize`]; the caller holds the write lock.
    pub(super) async fn initialize_locked(&self) -> Result<()> {
        for table in Table::ALL {
            let key = self.table_key(table);
            if self.storage.get(&key).await?.is_none() {
                self.storage.set(&key, "[]").await?;
            }
        }

        if let Some(seed) = &self.options.seed {
            if self.load_table(Table::Clientes).await?.is_empty() {
                self.seed_tables(seed).await?;
            }
        }

        if self.storage.get(&self.config_key()).await?.is_none() {
            self.save_object(&self.config_key(), &super::system::default_config())
                .await?;
        }

        if self.load_table(Table::Metricas).await?.is_empty() {
            let now = timestamp();
            let mut snapshot = Record::new();
            snapshot.insert("id".to_string(), json!(METRICS_RECORD_ID));
            snapshot.insert("uptime".to_string(), json!(INITIAL_UPTIME));
            snapshot.insert("createdAt".to_string(), json!(now));
            snapshot.insert("updatedAt".to_string(), json!(now));
            self.save_table(Table::Metricas, &[snapshot]).await?;
        }

        info!("Record store initialized (prefix '{}').", self.options.key_prefix);
        Ok(())
    }

    async fn seed_tables(&self, seed: &SeedData) -> Result<()> {
        let now = timestamp();
        for table in Table::ALL {
            let records = seed.records(table);
            if records.is_empty() || !self.load_table(table).await?.is_empty() {
                continue;
            }
            let stamped: Vec<Record> = records
                .iter()
                .cloned()
                .map(|mut record| {
                    if !record.contains_key("id") {
                        record.insert("id".to_string(), json!(generate_id()));
                    }
                    for field in ["createdAt", "updatedAt"] {
                        record
                            .entry(field.to_string())
                            .or_insert_with(|| json!(now));
                    }
                    record
                })
                .collect();
            self.save_table(table, &stamped).await?;
            info!("Seeded {} demo records into {}.", stamped.len(), table);
        }
        Ok(())
    }

    /// Inserts `data` as a new record with a generated `id` and fresh
    /// `createdAt`/`updatedAt`. Any fields are accepted; a caller-supplied `id`
    /// is replaced.
    ///
    /// The record is persisted and announced before its activity entry is
    /// written, so an `Err` from the activity write leaves the record stored.
    pub async fn create(&self, table: Table, data: Record) -> Result<Record> {
        let _guard = self.write_lock.lock().await;

        let now = timestamp();
        let mut record = data;
        record.insert("id".to_string(), json!(generate_id()));
        record.insert("createdAt".to_string(), json!(now));
        record.insert("updatedAt".to_string(), json!(now));

        let mut records = self.load_table(table).await?;
        records.push(record.clone());
        self.save_table(table, &records).await?;
        debug!("Created record {} in {}", record_id(&record).unwrap_or_default(), table);

        self.events.emit(
            &table.event_name(ChangeKind::Created),
            &Value::Object(record.clone()),
        );
        self.log_change(table, ChangeKind::Created, &record).await?;
        Ok(record)
    }

    /// Looks up a record by `id`; `None` when absent.
    pub async fn read(&self, table: Table, id: &str) -> Result<Option<Record>> {
        Ok(self
            .load_table(table)
            .await?
            .into_iter()
            .find(|record| record_id(record) == Some(id)))
    }

    /// Shallow-merges `updates` into the record `id` and refreshes `updatedAt`.
    ///
    /// Top-level fields in `updates` replace the stored ones wholesale; `id`,
    /// `createdAt` and `updatedAt` are store-owned and never taken from
    /// `updates`. Returns `None`, leaving the table untouched, when no record
    /// has that `id`. As with [`Self::create`], an activity-log failure is
    /// reported after the change is already persisted.
    pub async fn update(&self, table: Table, id: &str, updates: Record) -> Result<Option<Record>> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_table(table).await?;
        let Some(index) = records.iter().position(|r| record_id(r) == Some(id)) else {
            debug!("Update skipped: no record {} in {}", id, table);
            return Ok(None);
        };

        let record = &mut records[index];
        let updated_at = later_timestamp(record.get("updatedAt"), timestamp());
        for (field, value) in updates {
            if matches!(field.as_str(), "id" | "createdAt" | "updatedAt") {
                continue;
            }
            record.insert(field, value);
        }
        record.insert("updatedAt".to_string(), json!(updated_at));
        let record = record.clone();

        self.save_table(table, &records).await?;
        debug!("Updated record {} in {}", id, table);

        self.events.emit(
            &table.event_name(ChangeKind::Updated),
            &Value::Object(record.clone()),
        );
        self.log_change(table, ChangeKind::Updated, &record).await?;
        Ok(Some(record))
    }

    /// Removes the record `id` and returns it; `None` when absent.
    pub async fn delete(&self, table: Table, id: &str) -> Result<Option<Record>> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_table(table).await?;
        let Some(index) = records.iter().position(|r| record_id(r) == Some(id)) else {
            debug!("Delete skipped: no record {} in {}", id, table);
            return Ok(None);
        };
        let removed = records.remove(index);

        self.save_table(table, &records).await?;
        debug!("Deleted record {} from {}", id, table);

        self.events.emit(
            &table.event_name(ChangeKind::Deleted),
            &Value::Object(removed.clone()),
        );
        self.log_change(table, ChangeKind::Deleted, &removed).await?;
        Ok(Some(removed))
    }

    /// Every record of `table`, in insertion order.
    pub async fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        self.load_table(table).await
    }

    /// Records of `table` satisfying every condition of `query`.
    pub async fn query(&self, table: Table, query: &Query) -> Result<Vec<Record>> {
        Ok(query.filter(self.load_table(table).await?))
    }

    /// Subscribes `callback` to `event`, or to every event with `"*"`.
    pub fn on<F>(&self, event: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.on(event, callback)
    }

    /// Unsubscribes a listener previously returned by [`Self::on`].
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.events.off(event, id)
    }

    /// Vehicles owned by a customer.
    pub async fn vehiculos_by_cliente(&self, cliente_id: &str) -> Result<Vec<Record>> {
        self.query(Table::Vehiculos, &Query::new().eq("clienteId", cliente_id))
            .await
    }

    /// Services ordered by a customer.
    pub async fn servicios_by_cliente(&self, cliente_id: &str) -> Result<Vec<Record>> {
        self.query(Table::Servicios, &Query::new().eq("clienteId", cliente_id))
            .await
    }

    /// Services performed on a vehicle.
    pub async fn servicios_by_vehiculo(&self, vehiculo_id: &str) -> Result<Vec<Record>> {
        self.query(Table::Servicios, &Query::new().eq("vehiculoId", vehiculo_id))
            .await
    }

    /// Case-insensitive substring search of `term` over the string `fields` of `table`.
    /// A blank term returns the whole table.
    pub async fn search(&self, table: Table, term: &str, fields: &[&str]) -> Result<Vec<Record>> {
        let needle = term.trim().to_lowercase();
        let records = self.load_table(table).await?;
        if needle.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|record| {
                fields.iter().any(|field| {
                    record
                        .get(*field)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            })
            .collect())
    }

    pub(super) async fn load_table(&self, table: Table) -> Result<Vec<Record>> {
        let key = self.table_key(table);
        match self.storage.get(&key).await? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|source| Error::CorruptData { key, source })
            }
            None => Ok(Vec::new()),
        }
    }

    pub(super) async fn save_table(&self, table: Table, records: &[Record]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.storage.set(&self.table_key(table), &raw).await
    }

    pub(super) async fn load_object(&self, key: &str) -> Result<Option<Record>> {
        match self.storage.get(key).await? {
            Some(raw) => serde_json::from_str::<Option<Record>>(&raw).map_err(|source| {
                Error::CorruptData {
                    key: key.to_string(),
                    source,
                }
            }),
            None => Ok(None),
        }
    }

    pub(super) async fn save_object(&self, key: &str, object: &Record) -> Result<()> {
        let raw = serde_json::to_string(object)?;
        self.storage.set(key, &raw).await
    }
}

/// The `id` field of a record, when it is a string.
#[must_use]
pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Current time as an ISO-8601 UTC string with millisecond precision.
#[must_use]
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Keeps `updatedAt` from moving backwards if the wall clock did.
fn later_timestamp(previous: Option<&Value>, now: String) -> String {
    match previous.and_then(Value::as_str) {
        // Same fixed-width format, so lexical order is chronological order
        Some(previous) if previous > now.as_str() => previous.to_string(),
        _ => now,
    }
}

/// Generates a record id: a random alphanumeric part followed by the base-36
/// millisecond creation timestamp. Uniqueness is probabilistic.
#[must_use]
pub fn generate_id() -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}{}", &random[..12], to_base36(millis))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let index = usize::try_from(value % 36).unwrap_or_default();
        digits.push(char::from(DIGITS[index]));
        value /= 36;
    }
    digits.iter().rev().collect()
}
