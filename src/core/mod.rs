//! Core record store - framework-agnostic CRUD, events, queries and projections.

mod activity;
/// Synchronous publish/subscribe
pub mod events;
/// Dashboard metrics and chart data
pub mod metrics;
/// Literal and predicate filters
pub mod query;
/// The record store itself
pub mod store;
mod system;
mod transfer;
/// Validated access through typed entities
pub mod typed;
/// Background uptime refresh
pub mod uptime;

pub use events::{EventBus, ListenerId, WILDCARD};
pub use metrics::{ChartData, ChartPoint, Metricas};
pub use query::{Condition, Query};
pub use store::{RecordStore, StoreOptions, generate_id, record_id};
pub use system::SYSTEM_USER;
pub use typed::TableEntity;
pub use uptime::spawn_uptime_monitor;
