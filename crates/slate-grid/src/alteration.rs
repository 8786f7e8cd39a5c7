use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GridError;

/// A viewer's persisted overlay for one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub key: String,
    #[serde(default)]
    pub alter: Value,
}

impl GridRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            alter: Value::Null,
        }
    }
}

/// Where grid alterations live between requests.
pub trait AlterationStore: Send + Sync {
    fn find_one(&self, key: &str) -> BoxFuture<'_, Result<Option<GridRecord>, GridError>>;

    /// Upserts by `record.key`. The last save wins.
    fn save(&self, record: GridRecord) -> BoxFuture<'_, Result<(), GridError>>;
}

/// Keys records by grid id when the grid has one, otherwise by
/// `<viewer or session>:<route>`.
pub fn record_key(
    id: Option<&str>,
    viewer: Option<&str>,
    session: Option<&str>,
    route: Option<&str>,
) -> String {
    match id {
        Some(id) => id.to_string(),
        None => format!(
            "{}:{}",
            viewer.or(session).unwrap_or_default(),
            route.unwrap_or_default()
        ),
    }
}

#[derive(Debug, Default)]
pub struct MemoryAlterationStore {
    records: Mutex<HashMap<String, GridRecord>>,
}

impl MemoryAlterationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, GridRecord>>, GridError> {
        self.records
            .lock()
            .map_err(|e| GridError::Persistence(format!("alteration store poisoned: {e}")))
    }
}

impl AlterationStore for MemoryAlterationStore {
    fn find_one(&self, key: &str) -> BoxFuture<'_, Result<Option<GridRecord>, GridError>> {
        let found = self.records().map(|records| records.get(key).cloned());
        Box::pin(async move { found })
    }

    fn save(&self, record: GridRecord) -> BoxFuture<'_, Result<(), GridError>> {
        let saved = self.records().map(|mut records| {
            records.insert(record.key.clone(), record);
        });
        Box::pin(async move { saved })
    }
}
