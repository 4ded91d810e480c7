//! Key-value entry entity - Backing table for the database storage backend.
//! Each row holds one storage key (e.g. `loyola_clientes`) and the JSON text
//! stored under it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key-value database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kv_entries")]
pub struct Model {
    /// Storage key, unique
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// JSON text stored under the key
    #[sea_orm(column_type = "Text")]
    pub value: String,
    /// When this key was last written
    pub updated_at: DateTime,
}

/// `KvEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
