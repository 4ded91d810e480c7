//! Typed access to the business tables.
//!
//! The generic CRUD accepts any attribute bag. Callers that know the shape of
//! a table go through [`TableEntity`] instead, which validates at the boundary
//! before the record reaches the store.

use super::store::RecordStore;
use crate::{
    errors::{Error, Result},
    models::{Cliente, Servicio, Table, Usuario, Vehiculo},
    storage::Storage,
};
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A record shape bound to one table.
pub trait TableEntity: Serialize + DeserializeOwned {
    /// Table the entity lives in
    const TABLE: Table;

    /// Checks the entity before it is written.
    fn validate(&self) -> Result<()>;
}

fn invalid(table: Table, message: impl Into<String>) -> Error {
    Error::InvalidRecord {
        table: table.as_str().to_string(),
        message: message.into(),
    }
}

fn require(table: Table, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(table, format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

impl TableEntity for Cliente {
    const TABLE: Table = Table::Clientes;

    fn validate(&self) -> Result<()> {
        require(Self::TABLE, "nombre", &self.nombre)?;
        if !self.email.is_empty() && !looks_like_email(&self.email) {
            return Err(invalid(Self::TABLE, format!("invalid email '{}'", self.email)));
        }
        Ok(())
    }
}

impl TableEntity for Vehiculo {
    const TABLE: Table = Table::Vehiculos;

    fn validate(&self) -> Result<()> {
        require(Self::TABLE, "clienteId", &self.cliente_id)?;
        require(Self::TABLE, "marca", &self.marca)?;
        require(Self::TABLE, "modelo", &self.modelo)
    }
}

impl TableEntity for Servicio {
    const TABLE: Table = Table::Servicios;

    fn validate(&self) -> Result<()> {
        require(Self::TABLE, "clienteId", &self.cliente_id)?;
        require(Self::TABLE, "vehiculoId", &self.vehiculo_id)?;
        require(Self::TABLE, "estado", &self.estado)?;
        if NaiveDate::parse_from_str(&self.fecha, "%Y-%m-%d").is_err() {
            return Err(invalid(
                Self::TABLE,
                format!("fecha '{}' is not YYYY-MM-DD", self.fecha),
            ));
        }
        require_amount(self.costo)?;
        if let Some(duracion) = self.duracion {
            require_amount(duracion)?;
        }
        Ok(())
    }
}

impl TableEntity for Usuario {
    const TABLE: Table = Table::Usuarios;

    fn validate(&self) -> Result<()> {
        require(Self::TABLE, "username", &self.username)?;
        require(Self::TABLE, "nombre", &self.nombre)?;
        require(Self::TABLE, "rol", &self.rol)
    }
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

impl<S: Storage> RecordStore<S> {
    /// Validates and inserts `entity`, returning it with `id` and timestamps filled in.
    pub async fn insert_entity<T: TableEntity>(&self, entity: &T) -> Result<T> {
        entity.validate()?;
        let Value::Object(data) = serde_json::to_value(entity)? else {
            return Err(invalid(T::TABLE, "entity must serialize to an object"));
        };
        let record = self.create(T::TABLE, data).await?;
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    /// Reads the record `id` as `T`.
    pub async fn find_entity<T: TableEntity>(&self, id: &str) -> Result<Option<T>> {
        self.read(T::TABLE, id)
            .await?
            .map(|record| serde_json::from_value(Value::Object(record)))
            .transpose()
            .map_err(Error::from)
    }

    /// Every record of `T`'s table.
    pub async fn list_entities<T: TableEntity>(&self) -> Result<Vec<T>> {
        self.get_all(T::TABLE)
            .await?
            .into_iter()
            .map(|record| serde_json::from_value(Value::Object(record)).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{setup_seeded_store, setup_test_store};

    fn cliente(nombre: &str, email: &str) -> Cliente {
        Cliente {
            id: String::new(),
            nombre: nombre.to_string(),
            apellidos: "Prueba".to_string(),
            email: email.to_string(),
            telefono: "600000000".to_string(),
            dni: None,
            direccion: None,
            tipo: Some("VIP".to_string()),
            activo: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn servicio(fecha: &str, costo: f64) -> Servicio {
        Servicio {
            id: String::new(),
            cliente_id: "c1".to_string(),
            vehiculo_id: "v1".to_string(),
            descripcion: "ITV".to_string(),
            estado: "pendiente".to_string(),
            fecha: fecha.to_string(),
            costo,
            duracion: Some(1.0),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_entity() -> Result<()> {
        let store = setup_test_store().await?;
        let inserted = store
            .insert_entity(&cliente("Ana", "ana@email.com"))
            .await?;

        assert!(!inserted.id.is_empty());
        assert!(inserted.created_at.is_some());
        assert_eq!(inserted.nombre, "Ana");

        let found: Option<Cliente> = store.find_entity(&inserted.id).await?;
        assert_eq!(found, Some(inserted));
        assert_eq!(store.find_entity::<Cliente>("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_rejects_before_write() -> Result<()> {
        let store = setup_test_store().await?;

        let result = store.insert_entity(&cliente("  ", "")).await;
        assert!(matches!(result, Err(Error::InvalidRecord { table, .. }) if table == "clientes"));

        let result = store.insert_entity(&cliente("Ana", "not-an-email")).await;
        assert!(matches!(result, Err(Error::InvalidRecord { .. })));

        let result = store.insert_entity(&servicio("2024-05-01", -10.0)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount }) if amount == -10.0));

        let result = store.insert_entity(&servicio("01/05/2024", 10.0)).await;
        assert!(matches!(result, Err(Error::InvalidRecord { .. })));

        assert!(store.get_all(Table::Clientes).await?.is_empty());
        assert!(store.get_all(Table::Servicios).await?.is_empty());
        assert!(store.get_recent_activities(10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_seeded_entities() -> Result<()> {
        let store = setup_seeded_store().await?;

        let vehiculos: Vec<Vehiculo> = store.list_entities().await?;
        assert_eq!(vehiculos.len(), 3);
        assert_eq!(vehiculos[0].marca, "BMW");
        assert_eq!(vehiculos[0].anio, Some(2020));

        let usuarios: Vec<Usuario> = store.list_entities().await?;
        assert!(usuarios.iter().any(|u| u.rol == "admin"));

        let servicios: Vec<Servicio> = store.list_entities().await?;
        assert_eq!(servicios[0].costo, 120.0);
        Ok(())
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("taller@loyolamotors.es"));
        assert!(!looks_like_email("taller@loyolamotors"));
        assert!(!looks_like_email("@loyolamotors.es"));
        assert!(!looks_like_email("ta ller@loyolamotors.es"));
    }
}
