use thiserror::Error;

/// Every failure the record store can report.
///
/// Not-found lookups are not errors; they come back as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file or an override is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },

    /// A storage backend failed outside of the database driver.
    #[error("Storage error: {message}")]
    Storage {
        /// Backend-specific description of the failure.
        message: String,
    },

    /// The `SeaORM` driver reported an error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A persisted value could not be parsed back into records.
    #[error("Corrupt data under key '{key}': {source}")]
    CorruptData {
        /// Storage key holding the unreadable value.
        key: String,
        /// The JSON parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// An import payload was rejected before anything was written.
    #[error("Invalid import payload: {message}")]
    InvalidImport {
        /// Which part of the payload was malformed.
        message: String,
    },

    /// A typed record failed validation.
    #[error("Invalid record for table '{table}': {message}")]
    InvalidRecord {
        /// Short name of the target table.
        table: String,
        /// The rule the record broke.
        message: String,
    },

    /// A monetary amount was negative or not finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: f64,
    },

    /// A table name did not match any known table.
    #[error("Unknown table: {name}")]
    UnknownTable {
        /// The name that failed to parse.
        name: String,
    },

    /// Records could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration or seed file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
