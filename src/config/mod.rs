/// Database connection and schema creation
pub mod database;

/// Demo seed data loading from seed.toml
pub mod seed;

/// Store configuration loading from config.toml
pub mod store;

pub use seed::SeedData;
pub use store::{AppConfig, Backend, StoreConfig, load_app_configuration};
