//! Activity log - capped, newest-first history of store mutations.

use super::{
    events::ACTIVITY_ADDED,
    store::{RecordStore, generate_id, record_id, timestamp},
};
use crate::{
    errors::Result,
    models::{ChangeKind, Record, Table},
    storage::Storage,
};
use serde_json::{Value, json};
use tracing::trace;

impl<S: Storage> RecordStore<S> {
    /// Inserts an entry at the head of the activity log, evicting the oldest
    /// entries beyond the configured limit, and emits `activity_added`.
    ///
    /// The entry is attributed to the current user, or to `"Sistema"`.
    pub async fn add_activity(
        &self,
        tipo: &str,
        descripcion: &str,
        metadata: Value,
    ) -> Result<Record> {
        let _guard = self.write_lock.lock().await;
        self.append_activity(tipo, descripcion, metadata).await
    }

    /// The `limit` most recent activity entries, newest first.
    pub async fn get_recent_activities(&self, limit: usize) -> Result<Vec<Record>> {
        let mut log = self.load_table(Table::Actividades).await?;
        log.truncate(limit);
        Ok(log)
    }

    /// Caller must hold the write lock.
    pub(super) async fn append_activity(
        &self,
        tipo: &str,
        descripcion: &str,
        metadata: Value,
    ) -> Result<Record> {
        let usuario = self.current_user_name().await?;
        let now = timestamp();

        let mut entry = Record::new();
        entry.insert("id".to_string(), json!(generate_id()));
        entry.insert("tipo".to_string(), json!(tipo));
        entry.insert("descripcion".to_string(), json!(descripcion));
        entry.insert("usuario".to_string(), json!(usuario));
        entry.insert("metadata".to_string(), metadata);
        entry.insert("timestamp".to_string(), json!(now));

        let mut log = self.load_table(Table::Actividades).await?;
        log.insert(0, entry.clone());
        log.truncate(self.options.activity_limit);
        self.save_table(Table::Actividades, &log).await?;
        trace!("Activity '{}' logged ({} entries kept)", tipo, log.len());

        self.events.emit(ACTIVITY_ADDED, &Value::Object(entry.clone()));
        Ok(entry)
    }

    /// Logs a CRUD mutation. Changes to the activity log itself are not logged.
    /// Caller must hold the write lock.
    pub(super) async fn log_change(
        &self,
        table: Table,
        kind: ChangeKind,
        record: &Record,
    ) -> Result<()> {
        if table == Table::Actividades {
            return Ok(());
        }
        let action = match kind {
            ChangeKind::Created => "Alta",
            ChangeKind::Updated => "Actualización",
            ChangeKind::Deleted => "Baja",
        };
        let descripcion = match display_name(record) {
            Some(name) => format!("{action} de {}: {name}", table.label()),
            None => format!("{action} de {}", table.label()),
        };
        let metadata = json!({
            "tabla": table.as_str(),
            "registroId": record_id(record),
        });
        self.append_activity(&table.event_name(kind), &descripcion, metadata)
            .await?;
        Ok(())
    }
}

/// Best-effort label for a record: person name, vehicle make/model or description.
fn display_name(record: &Record) -> Option<String> {
    let text = |field: &str| {
        record
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let pair = |a: &str, b: &str| {
        text(a).map(|first| match text(b) {
            Some(second) => format!("{first} {second}"),
            None => first.to_string(),
        })
    };
    pair("nombre", "apellidos")
        .or_else(|| pair("marca", "modelo"))
        .or_else(|| text("descripcion").map(str::to_string))
        .or_else(|| text("username").map(str::to_string))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_cliente, record, setup_test_store};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_activity_cap_keeps_newest_first() -> Result<()> {
        let store = setup_test_store().await?;
        for i in 0..150 {
            store
                .add_activity("prueba", &format!("entrada {i}"), json!({ "n": i }))
                .await?;
        }

        let all = store.get_recent_activities(usize::MAX).await?;
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].get("descripcion"), Some(&json!("entrada 149")));
        assert_eq!(all[99].get("descripcion"), Some(&json!("entrada 50")));
        for (offset, entry) in all.iter().enumerate() {
            assert_eq!(entry["metadata"]["n"], json!(149 - offset));
        }

        let recent = store.get_recent_activities(5).await?;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0], all[0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_activity_attributed_to_sistema_without_user() -> Result<()> {
        let store = setup_test_store().await?;
        let entry = store.add_activity("login", "Inicio", json!(null)).await?;
        assert_eq!(entry.get("usuario"), Some(&json!("Sistema")));
        assert_eq!(entry.get("tipo"), Some(&json!("login")));
        assert!(entry.contains_key("timestamp"));
        Ok(())
    }

    #[tokio::test]
    async fn test_activity_attributed_to_current_user() -> Result<()> {
        let store = setup_test_store().await?;
        store
            .set_current_user(Some(&record(json!({ "id": "u1", "nombre": "Marta" }))))
            .await?;
        let entry = store.add_activity("export", "Exportación", json!({})).await?;
        assert_eq!(entry.get("usuario"), Some(&json!("Marta")));
        Ok(())
    }

    #[tokio::test]
    async fn test_crud_mutations_are_logged() -> Result<()> {
        let store = setup_test_store().await?;
        let cliente = create_test_cliente(&store, "Lucía", "VIP").await?;
        let id = record_id(&cliente).unwrap();
        store.delete(Table::Clientes, id).await?;

        let log = store.get_recent_activities(10).await?;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].get("tipo"), Some(&json!("clientes_deleted")));
        assert_eq!(
            log[0].get("descripcion"),
            Some(&json!("Baja de Cliente: Lucía Prueba"))
        );
        assert_eq!(log[1].get("tipo"), Some(&json!("clientes_created")));
        assert_eq!(log[1]["metadata"]["registroId"], json!(id));
        Ok(())
    }

    #[tokio::test]
    async fn test_creating_in_activity_table_is_not_logged_again() -> Result<()> {
        let store = setup_test_store().await?;
        store
            .create(Table::Actividades, record(json!({ "tipo": "manual" })))
            .await?;
        assert_eq!(store.get_recent_activities(10).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_activity_added_event() -> Result<()> {
        let store = setup_test_store().await?;
        let payloads: Arc<Mutex<Vec<Value>>> = Arc::default();
        {
            let payloads = Arc::clone(&payloads);
            store.on(ACTIVITY_ADDED, move |data| {
                payloads.lock().unwrap().push(data.clone());
            });
        }
        let entry = store.add_activity("nota", "Hola", json!(null)).await?;
        assert_eq!(*payloads.lock().unwrap(), vec![Value::Object(entry)]);
        Ok(())
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            display_name(&record(json!({ "marca": "BMW", "modelo": "X3" }))),
            Some("BMW X3".to_string())
        );
        assert_eq!(
            display_name(&record(json!({ "nombre": "Ana" }))),
            Some("Ana".to_string())
        );
        assert_eq!(display_name(&record(json!({ "nombre": "  " }))), None);
    }
}
