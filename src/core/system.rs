//! System configuration, current user and the stored uptime metric.

use super::{
    events::METRICS_UPDATED,
    store::{INITIAL_UPTIME, METRICS_RECORD_ID, RecordStore, record_id, timestamp},
};
use crate::{
    errors::Result,
    models::{ChangeKind, Record, Table},
    storage::Storage,
};
use serde_json::{Value, json};
use tracing::debug;

/// Name activities are attributed to when nobody is logged in.
pub const SYSTEM_USER: &str = "Sistema";

const MIN_UPTIME: f64 = 95.0;
const MAX_UPTIME: f64 = 100.0;

/// Configuration written on first initialization.
pub(super) fn default_config() -> Record {
    let mut config = Record::new();
    config.insert("nombreTaller".to_string(), json!("LoyolaMotors"));
    config.insert("moneda".to_string(), json!("EUR"));
    config.insert("iva".to_string(), json!(21));
    config.insert("horario".to_string(), json!("L-V 8:00-18:00"));
    config
}

impl<S: Storage> RecordStore<S> {
    /// The system configuration object, or the defaults when none is stored.
    pub async fn get_config(&self) -> Result<Record> {
        Ok(self
            .load_object(&self.config_key())
            .await?
            .unwrap_or_else(default_config))
    }

    /// Shallow-merges `updates` into the system configuration and emits
    /// `configuraciones_updated` with the result.
    pub async fn update_config(&self, updates: Record) -> Result<Record> {
        let _guard = self.write_lock.lock().await;

        let mut config = self.get_config().await?;
        config.extend(updates);
        config.insert("updatedAt".to_string(), json!(timestamp()));
        self.save_object(&self.config_key(), &config).await?;

        let event = Table::Configuraciones.event_name(ChangeKind::Updated);
        self.events.emit(&event, &Value::Object(config.clone()));
        self.append_activity(&event, "Actualización de la configuración del sistema", json!({}))
            .await?;
        Ok(config)
    }

    /// The logged-in user, if any.
    pub async fn current_user(&self) -> Result<Option<Record>> {
        self.load_object(&self.current_user_key()).await
    }

    /// Stores the logged-in user, or clears it with `None`.
    pub async fn set_current_user(&self, user: Option<&Record>) -> Result<()> {
        let key = self.current_user_key();
        match user {
            Some(user) => self.save_object(&key, user).await,
            None => self.storage.remove(&key).await,
        }
    }

    /// Display name activities are attributed to.
    pub(super) async fn current_user_name(&self) -> Result<String> {
        let name = self.current_user().await?.and_then(|user| {
            ["nombre", "username"].iter().find_map(|field| {
                user.get(*field)
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            })
        });
        Ok(name.unwrap_or_else(|| SYSTEM_USER.to_string()))
    }

    /// Uptime percentage from the metrics snapshot.
    pub async fn stored_uptime(&self) -> Result<f64> {
        Ok(self
            .load_table(Table::Metricas)
            .await?
            .iter()
            .find(|r| record_id(r) == Some(METRICS_RECORD_ID))
            .and_then(|r| r.get("uptime"))
            .and_then(Value::as_f64)
            .unwrap_or(INITIAL_UPTIME))
    }

    /// Shifts the stored uptime by `delta`, clamped to `[95, 100]` and rounded
    /// to two decimals, and emits `metrics_updated` with the snapshot.
    pub async fn perturb_uptime(&self, delta: f64) -> Result<f64> {
        let _guard = self.write_lock.lock().await;

        let mut metricas = self.load_table(Table::Metricas).await?;
        let index = match metricas
            .iter()
            .position(|r| record_id(r) == Some(METRICS_RECORD_ID))
        {
            Some(index) => index,
            None => {
                let mut snapshot = Record::new();
                snapshot.insert("id".to_string(), json!(METRICS_RECORD_ID));
                snapshot.insert("createdAt".to_string(), json!(timestamp()));
                metricas.push(snapshot);
                metricas.len() - 1
            }
        };

        let snapshot = &mut metricas[index];
        let current = snapshot
            .get("uptime")
            .and_then(Value::as_f64)
            .unwrap_or(INITIAL_UPTIME);
        let uptime = ((current + delta).clamp(MIN_UPTIME, MAX_UPTIME) * 100.0).round() / 100.0;
        let now = timestamp();
        snapshot.insert("uptime".to_string(), json!(uptime));
        snapshot.insert("ultimaActualizacion".to_string(), json!(now));
        snapshot.insert("updatedAt".to_string(), json!(now));
        let snapshot = snapshot.clone();

        self.save_table(Table::Metricas, &metricas).await?;
        debug!("Uptime moved from {} to {}", current, uptime);
        self.events.emit(METRICS_UPDATED, &Value::Object(snapshot));
        Ok(uptime)
    }
}
