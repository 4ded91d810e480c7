//! Demo seed data loading.
//!
//! The demo records ship inside the binary (`seed.toml` at the crate root) and
//! can be replaced by another TOML file with the same layout: one array of
//! tables per store table, e.g. `[[clientes]]`.

use crate::errors::{Error, Result};
use crate::models::{Record, Table};
use serde::Deserialize;
use std::path::Path;

const DEMO_SEED: &str = include_str!("../../seed.toml");

/// Records to write into an empty store, grouped by table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub clientes: Vec<Record>,
    #[serde(default)]
    pub vehiculos: Vec<Record>,
    #[serde(default)]
    pub servicios: Vec<Record>,
    #[serde(default)]
    pub usuarios: Vec<Record>,
    #[serde(default)]
    pub configuraciones: Vec<Record>,
}

impl SeedData {
    /// The built-in demo data set.
    pub fn demo() -> Result<Self> {
        Self::parse(DEMO_SEED)
    }

    /// Loads a seed file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
            message: format!("Failed to read seed file {}: {e}", path_ref.display()),
        })?;
        Self::parse(&contents)
    }

    /// Parses seed TOML.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse seed TOML: {e}"),
        })
    }

    /// Seed records for `table`; the activity log and metrics are never seeded.
    #[must_use]
    pub fn records(&self, table: Table) -> &[Record] {
        match table {
            Table::Clientes => &self.clientes,
            Table::Vehiculos => &self.vehiculos,
            Table::Servicios => &self.servicios,
            Table::Usuarios => &self.usuarios,
            Table::Configuraciones => &self.configuraciones,
            Table::Actividades | Table::Metricas => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_demo_seed_parses() {
        let seed = SeedData::demo().unwrap();
        assert_eq!(seed.clientes.len(), 3);
        assert_eq!(seed.vehiculos.len(), 3);
        assert_eq!(seed.servicios.len(), 3);
        assert_eq!(seed.usuarios.len(), 2);
        assert!(seed.records(Table::Actividades).is_empty());

        let bmw = &seed.vehiculos[0];
        assert_eq!(bmw.get("marca"), Some(&json!("BMW")));
        assert_eq!(bmw.get("clienteId"), Some(&json!("c1")));
        assert_eq!(bmw.get("año"), Some(&json!(2020)));
    }

    #[test]
    fn test_demo_seed_references_are_consistent() {
        let seed = SeedData::demo().unwrap();
        let cliente_ids: Vec<_> = seed.clientes.iter().filter_map(|c| c.get("id")).collect();
        for vehiculo in &seed.vehiculos {
            assert!(cliente_ids.contains(&vehiculo.get("clienteId").unwrap()));
        }
    }

    #[test]
    fn test_parse_rejects_non_table_entries() {
        let result = SeedData::parse("clientes = \"nope\"\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_parse_partial_seed() {
        let seed = SeedData::parse("[[usuarios]]\nid = \"u9\"\nusername = \"x\"\n").unwrap();
        assert!(seed.clientes.is_empty());
        assert_eq!(seed.records(Table::Usuarios).len(), 1);
    }
}
