//! Document store contract and the local Loro-backed adapter.
//!
//! The engine only ever talks to [`DocumentStore`]. Records are flat field
//! maps; structured payloads travel as serialized JSON text and are decoded
//! by the entity layer.

mod loro_store;

pub use loro_store::LoroStore;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub const RFPS: &str = "rfps";
pub const RFP_SECTIONS: &str = "rfp_sections";
pub const RFP_BINDINGS: &str = "rfp_bindings";

/// Field map of a stored record.
pub type Fields = Map<String, Value>;

/// A stored record: store-assigned key plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Fields,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Filter predicate evaluated against a record's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Field is present, not null and not an empty string
    NotNull(String),
    /// Field is present and orders at or after the value
    Gte(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in(field: &str, values: Vec<Value>) -> Self {
        Filter::In(field.to_string(), values)
    }

    pub fn not_null(field: &str) -> Self {
        Filter::NotNull(field.to_string())
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => field_value(record, field) == Some(value),
            Filter::In(field, values) => field_value(record, field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Filter::NotNull(field) => match field_value(record, field) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.is_empty(),
                Some(_) => true,
            },
            Filter::Gte(field, value) => field_value(record, field)
                .and_then(|v| compare_values(v, value))
                .map(|ord| ord != Ordering::Less)
                .unwrap_or(false),
            Filter::And(filters) => filters.iter().all(|f| f.matches(record)),
        }
    }
}

fn field_value<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    record.fields.get(field)
}

/// Order two scalar values of the same kind. Mixed kinds do not compare.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    /// Records missing the field sort last in either direction.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match (a.fields.get(&self.field), b.fields.get(&self.field)) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                if self.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            sort: None,
            limit: None,
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter, sort and truncate an in-memory record set.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut matched: Vec<Record> = records
            .into_iter()
            .filter(|r| self.filter.matches(r))
            .collect();
        if let Some(ref sort) = self.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Durable keyed storage with predicate queries and batch writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one record by key
    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>>;

    /// Fetch all records matching the query
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>>;

    /// Create a record; the store assigns its key
    async fn create(&self, table: &str, fields: Fields) -> Result<Record>;

    /// Create several records in one write
    async fn create_many(&self, table: &str, batch: Vec<Fields>) -> Result<Vec<Record>>;

    /// Merge fields into an existing record. `Null` clears a field.
    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<Record>;

    /// Remove records by key. Unknown keys are ignored.
    async fn destroy(&self, table: &str, ids: &[String]) -> Result<()>;
}
