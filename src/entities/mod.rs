//! Entity module - Contains the SeaORM entity definitions for the database backend.
//! The record store keeps every table as a JSON blob, so a single key-value
//! entity is enough.

pub mod kv_entry;

pub use kv_entry::{Column as KvEntryColumn, Entity as KvEntry, Model as KvEntryModel};
