//! Conjunctive filters over untyped records.
//!
//! A [`Query`] is a list of per-field conditions that must all hold. Each
//! condition is either a literal compared with strict equality or a predicate
//! over the field value. A missing field never equals a literal; predicates
//! receive `None` for it.

use crate::models::Record;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Predicate over a field value, `None` when the field is absent.
pub type FieldPredicate = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// One field condition.
#[derive(Clone)]
pub enum Condition {
    /// Field must be present and strictly equal to the literal
    Equals(Value),
    /// Field value must satisfy the predicate
    Predicate(FieldPredicate),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl Condition {
    /// Whether `value` satisfies this condition.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => value.is_some_and(|actual| strict_eq(actual, expected)),
            Self::Predicate(predicate) => predicate(value),
        }
    }
}

/// Strict equality; numbers compare by numeric value so `500` equals `500.0`.
#[allow(clippy::float_cmp)]
fn strict_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
        }
        _ => actual == expected,
    }
}

/// A conjunction of field conditions. An empty query matches every record.
#[derive(Debug, Clone, Default)]
pub struct Query {
    conditions: Vec<(String, Condition)>,
}

impl Query {
    /// Query with no conditions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strict-equality condition on `field`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Equals(value.into())));
        self
    }

    /// Adds a predicate condition on `field`.
    #[must_use]
    pub fn matching<F>(mut self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.conditions
            .push((field.into(), Condition::Predicate(Arc::new(predicate))));
        self
    }

    /// Adds an already-built condition.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.conditions.push((field.into(), condition));
        self
    }

    /// Number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the query has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether `record` satisfies every condition.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(record.get(field)))
    }

    /// Keeps the records satisfying every condition, preserving order.
    #[must_use]
    pub fn filter(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn sample() -> Vec<Record> {
        vec![
            record(json!({ "id": "a", "tipo": "VIP" })),
            record(json!({ "id": "b", "tipo": "Regular", "activo": true })),
            record(json!({ "id": "c", "tipo": "VIP", "activo": false })),
        ]
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.get("id").and_then(Value::as_str).unwrap())
            .collect()
    }

    #[test]
    fn test_literal_ignores_other_fields() {
        let result = Query::new().eq("tipo", "VIP").filter(sample());
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn test_missing_field_never_equals_literal() {
        let result = Query::new().eq("activo", true).filter(sample());
        assert_eq!(ids(&result), vec!["b"]);
    }

    #[test]
    fn test_predicate_sees_missing_fields_as_none() {
        let not_inactive = Query::new().matching("activo", |v| v != Some(&json!(false)));
        assert_eq!(ids(&not_inactive.filter(sample())), vec!["a", "b"]);
    }

    #[test]
    fn test_conjunction() {
        let query = Query::new()
            .eq("tipo", "VIP")
            .matching("activo", |v| v.and_then(Value::as_bool) == Some(false));
        assert_eq!(query.len(), 2);
        assert_eq!(ids(&query.filter(sample())), vec!["c"]);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = Query::new();
        assert!(query.is_empty());
        assert_eq!(query.filter(sample()).len(), 3);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let records = vec![
            record(json!({ "id": "x", "kilometraje": 500 })),
            record(json!({ "id": "y", "kilometraje": 500.0 })),
            record(json!({ "id": "z", "kilometraje": "500" })),
        ];
        let result = Query::new().eq("kilometraje", 500).filter(records);
        assert_eq!(ids(&result), vec!["x", "y"]);
    }
}
