use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use loro::{LoroDoc, LoroList, LoroMap, LoroValue, ValueOrContainer};
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, Fields, Query, Record};
use crate::config::StoreConfig;
use crate::error::{RfpError, Result};

/// Document store backed by a single Loro CRDT document.
///
/// Each table is a root map; each record is a nested map keyed by its id.
/// Scalars and string lists are stored natively, anything else as JSON text.
pub struct LoroStore {
    doc: LoroDoc,
    path: Option<PathBuf>,
}

impl LoroStore {
    /// Initialize a new store under `root`
    pub fn init(root: &Path, config: &StoreConfig) -> Result<Self> {
        let store_dir = config.store_dir(root);

        if store_dir.exists() {
            return Err(RfpError::AlreadyInitialized);
        }

        fs::create_dir_all(&store_dir)?;

        let store = Self {
            doc: LoroDoc::new(),
            path: Some(config.db_path(root)),
        };
        store.save()?;

        Ok(store)
    }

    /// Open an existing store under `root`
    pub fn open(root: &Path, config: &StoreConfig) -> Result<Self> {
        let path = config.db_path(root);

        if !path.exists() {
            return Err(RfpError::NotInitialized);
        }

        let bytes = fs::read(&path)?;
        let doc = LoroDoc::new();
        doc.import(&bytes)?;

        Ok(Self {
            doc,
            path: Some(path),
        })
    }

    /// A store that lives only in memory. `save` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            doc: LoroDoc::new(),
            path: None,
        }
    }

    /// Save the document to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref path) = self.path {
            let bytes = self.doc.export(loro::ExportMode::Snapshot)?;
            fs::write(path, bytes)?;
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn records(&self, table: &str) -> Vec<Record> {
        let mut records = Vec::new();
        if let LoroValue::Map(map) = self.doc.get_map(table).get_deep_value() {
            records.extend(map.iter().filter_map(|(_, value)| record_from_value(value)));
        }
        records
    }

    fn record(&self, table: &str, id: &str) -> Option<Record> {
        match self.doc.get_map(table).get_deep_value() {
            LoroValue::Map(map) => map.get(id).and_then(record_from_value),
            _ => None,
        }
    }

    fn insert_record(&self, table: &str, fields: &Fields) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let entity_map = self
            .doc
            .get_map(table)
            .get_or_create_container(&id, LoroMap::new())?;

        entity_map.insert("id", id.clone())?;
        for (key, value) in fields {
            if key == "id" {
                continue;
            }
            write_field(&entity_map, key, value)?;
        }
        Ok(id)
    }
}

#[async_trait]
impl DocumentStore for LoroStore {
    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>> {
        Ok(self.record(table, id))
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>> {
        Ok(query.apply(self.records(table)))
    }

    async fn create(&self, table: &str, fields: Fields) -> Result<Record> {
        let id = self.insert_record(table, &fields)?;
        self.doc.commit();
        tracing::debug!(table, %id, "created record");

        self.record(table, &id)
            .ok_or_else(|| RfpError::Persistence(format!("{table}/{id} missing after create")))
    }

    async fn create_many(&self, table: &str, batch: Vec<Fields>) -> Result<Vec<Record>> {
        let mut ids = Vec::with_capacity(batch.len());
        for fields in &batch {
            ids.push(self.insert_record(table, fields)?);
        }
        self.doc.commit();
        tracing::debug!(table, count = ids.len(), "created records");

        ids.iter()
            .map(|id| {
                self.record(table, id).ok_or_else(|| {
                    RfpError::Persistence(format!("{table}/{id} missing after create"))
                })
            })
            .collect()
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<Record> {
        let entity_map = match self.doc.get_map(table).get(id) {
            Some(ValueOrContainer::Container(loro::Container::Map(map))) => map,
            _ => return Err(RfpError::NotFound(format!("{table}/{id}"))),
        };

        for (key, value) in &fields {
            if key == "id" {
                continue;
            }
            write_field(&entity_map, key, value)?;
        }
        self.doc.commit();
        tracing::debug!(table, id, fields = fields.len(), "updated record");

        self.record(table, id)
            .ok_or_else(|| RfpError::NotFound(format!("{table}/{id}")))
    }

    async fn destroy(&self, table: &str, ids: &[String]) -> Result<()> {
        let table_map = self.doc.get_map(table);
        for id in ids {
            if table_map.get(id).is_some() {
                table_map.delete(id)?;
            }
        }
        self.doc.commit();
        tracing::debug!(table, count = ids.len(), "destroyed records");
        Ok(())
    }
}

fn write_field(entity_map: &LoroMap, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => {
            if entity_map.get(key).is_some() {
                entity_map.delete(key)?;
            }
        }
        Value::Bool(b) => entity_map.insert(key, *b)?,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                entity_map.insert(key, i)?;
            } else if let Some(f) = n.as_f64() {
                entity_map.insert(key, f)?;
            }
        }
        Value::String(s) => entity_map.insert(key, s.clone())?,
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let list = entity_map.get_or_create_container(key, LoroList::new())?;
            while list.len() > 0 {
                list.delete(0, 1)?;
            }
            for item in items.iter().filter_map(Value::as_str) {
                list.push(item.to_string())?;
            }
        }
        other => entity_map.insert(key, other.to_string())?,
    }
    Ok(())
}

fn record_from_value(value: &LoroValue) -> Option<Record> {
    let map = match value {
        LoroValue::Map(map) => map,
        _ => return None,
    };
    let id = match map.get("id")? {
        LoroValue::String(s) => s.to_string(),
        _ => return None,
    };

    let fields = map
        .iter()
        .filter(|(k, _)| k.as_str() != "id")
        .map(|(k, v)| (k.to_string(), to_json(v)))
        .collect();

    Some(Record { id, fields })
}

fn to_json(value: &LoroValue) -> Value {
    match value {
        LoroValue::Null => Value::Null,
        LoroValue::Bool(b) => Value::Bool(*b),
        LoroValue::I64(n) => Value::from(*n),
        LoroValue::Double(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        LoroValue::String(s) => Value::String(s.to_string()),
        LoroValue::List(list) => Value::Array(list.iter().map(to_json).collect()),
        LoroValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), to_json(v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}
