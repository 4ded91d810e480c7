//! Table names and record shapes shared across the store.
//!
//! Records are stored as loosely typed JSON objects. The structs in this
//! module describe the conventional shape of each business table and are used
//! when callers want validation at the boundary (see [`crate::core::typed`]).

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// A single stored record: an untyped attribute bag.
pub type Record = Map<String, Value>;

/// Identifies one of the store's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    /// Customers
    Clientes,
    /// Vehicles, owned by a customer through `clienteId`
    Vehiculos,
    /// Workshop services, linked through `clienteId` and `vehiculoId`
    Servicios,
    /// Back-office users
    Usuarios,
    /// Capped activity log, newest first
    Actividades,
    /// Free-form configuration records
    Configuraciones,
    /// Metrics snapshot (uptime and friends)
    Metricas,
}

/// The three mutation kinds that produce table events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl Table {
    /// Every table, in export order.
    pub const ALL: [Self; 7] = [
        Self::Clientes,
        Self::Vehiculos,
        Self::Servicios,
        Self::Usuarios,
        Self::Actividades,
        Self::Configuraciones,
        Self::Metricas,
    ];

    /// Short name used in storage keys, event names and the export format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clientes => "clientes",
            Self::Vehiculos => "vehiculos",
            Self::Servicios => "servicios",
            Self::Usuarios => "usuarios",
            Self::Actividades => "actividades",
            Self::Configuraciones => "configuraciones",
            Self::Metricas => "metricas",
        }
    }

    /// Human-readable singular label used in activity descriptions.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clientes => "Cliente",
            Self::Vehiculos => "Vehículo",
            Self::Servicios => "Servicio",
            Self::Usuarios => "Usuario",
            Self::Actividades => "Actividad",
            Self::Configuraciones => "Configuración",
            Self::Metricas => "Métrica",
        }
    }

    /// Event name for a mutation on this table, e.g. `clientes_created`.
    #[must_use]
    pub fn event_name(self, kind: ChangeKind) -> String {
        format!("{}_{}", self.as_str(), kind.suffix())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| Error::UnknownTable { name: s.to_string() })
    }
}

const fn default_true() -> bool {
    true
}

/// A customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cliente {
    /// Store-assigned id; empty until the record is created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Given name
    pub nombre: String,
    /// Family names
    #[serde(default)]
    pub apellidos: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Contact phone
    #[serde(default)]
    pub telefono: String,
    /// National id document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dni: Option<String>,
    /// Postal address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    /// Customer tier, e.g. "VIP" or "Regular"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    /// Inactive records are kept but excluded from the active counts
    #[serde(default = "default_true")]
    pub activo: bool,
    /// Set by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Set by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A vehicle belonging to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehiculo {
    /// Store-assigned id; empty until the record is created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Owning customer
    pub cliente_id: String,
    /// Make
    pub marca: String,
    /// Model
    pub modelo: String,
    /// Model year
    #[serde(rename = "año", default, skip_serializing_if = "Option::is_none")]
    pub anio: Option<u16>,
    /// Licence plate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matricula: Option<String>,
    /// Body colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Odometer reading in km
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kilometraje: Option<u64>,
    /// Inactive records are kept but excluded from the active counts
    #[serde(default = "default_true")]
    pub activo: bool,
    /// Set by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Set by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A workshop service performed on a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Servicio {
    /// Store-assigned id; empty until the record is created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Owning customer
    pub cliente_id: String,
    /// Serviced vehicle
    pub vehiculo_id: String,
    /// Work performed
    pub descripcion: String,
    /// Opaque workflow status: "pendiente", "en_proceso", "completado", ...
    pub estado: String,
    /// Service date, `YYYY-MM-DD`
    pub fecha: String,
    /// Price in the configured currency
    #[serde(default)]
    pub costo: f64,
    /// Duration in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duracion: Option<f64>,
    /// Set by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Set by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A back-office user. Roles gate UI routes and are opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    /// Store-assigned id; empty until the record is created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Login name
    pub username: String,
    /// Display name used for activity attribution
    pub nombre: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Role name, e.g. "admin" or "empleado"
    pub rol: String,
    /// Inactive records are kept but excluded from the active counts
    #[serde(default = "default_true")]
    pub activo: bool,
    /// Set by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Set by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
