//! `database` driver
//!
//! [`DatabaseBackend`] parses the operation out of the call arguments and
//! hands it to the [`DbStrategy`] named by `options.engine` (default
//! `memory`). The table comes from `options.table`, else from the `table`
//! argument.
//!
//! | `operation` | Arguments | Result fields |
//! |-------------|-----------|---------------|
//! | `put_item` (default) | `item` | `item` |
//! | `get_item` | `key` | `item` (null when absent) |
//! | `delete_item` | `key` | `deleted` |
//! | `query` | `filter`, `limit` | `items`, `count` |
//! | `scan` | `limit` | `items`, `count` |

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use toolgate_application::ports::backend::BackendStrategy;
use toolgate_domain::{InvocationError, ToolArgs, ToolSpec};
use tracing::debug;

pub const DATABASE_DRIVER: &str = "database";
pub const DEFAULT_ENGINE: &str = "memory";
/// Item field identifying rows unless `options.primary_key` says otherwise
pub const DEFAULT_PRIMARY_KEY: &str = "id";

type Item = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum DbOperation {
    PutItem { item: Item },
    GetItem { key: Item },
    DeleteItem { key: Item },
    Query { filter: Item, limit: Option<usize> },
    Scan { limit: Option<usize> },
}

impl DbOperation {
    pub fn name(&self) -> &'static str {
        match self {
            DbOperation::PutItem { .. } => "put_item",
            DbOperation::GetItem { .. } => "get_item",
            DbOperation::DeleteItem { .. } => "delete_item",
            DbOperation::Query { .. } => "query",
            DbOperation::Scan { .. } => "scan",
        }
    }

    pub fn from_args(args: &ToolArgs) -> Result<Self, InvocationError> {
        let operation = args
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("put_item");
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        match operation {
            "put_item" => Ok(DbOperation::PutItem {
                item: object_arg(args, "item")?,
            }),
            "get_item" => Ok(DbOperation::GetItem {
                key: object_arg(args, "key")?,
            }),
            "delete_item" => Ok(DbOperation::DeleteItem {
                key: object_arg(args, "key")?,
            }),
            "query" => Ok(DbOperation::Query {
                filter: object_arg(args, "filter")?,
                limit,
            }),
            "scan" => Ok(DbOperation::Scan { limit }),
            other => Err(InvocationError::backend(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

fn object_arg(args: &ToolArgs, name: &str) -> Result<Item, InvocationError> {
    match args.get(name) {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(InvocationError::backend(format!(
            "Argument '{}' must be an object",
            name
        ))),
    }
}

/// One database engine
#[async_trait]
pub trait DbStrategy: Send + Sync {
    /// Engine name selected by `options.engine`
    fn engine(&self) -> &str;

    async fn execute_operation(
        &self,
        operation: DbOperation,
        table: &str,
        spec: &ToolSpec,
        timeout: Duration,
    ) -> Result<Value, InvocationError>;
}

/// Tables of JSON objects held in process memory
#[derive(Debug, Default)]
pub struct InMemoryDbStrategy {
    tables: Mutex<HashMap<String, Vec<Item>>>,
}

impl InMemoryDbStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or(0, Vec::len)
    }
}

fn matches(item: &Item, fields: &Item) -> bool {
    fields.iter().all(|(k, v)| item.get(k) == Some(v))
}

#[async_trait]
impl DbStrategy for InMemoryDbStrategy {
    fn engine(&self) -> &str {
        DEFAULT_ENGINE
    }

    async fn execute_operation(
        &self,
        operation: DbOperation,
        table: &str,
        spec: &ToolSpec,
        _timeout: Duration,
    ) -> Result<Value, InvocationError> {
        let name = operation.name();
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let rows = tables.entry(table.to_string()).or_default();

        let mut response = match operation {
            DbOperation::PutItem { item } => {
                let primary_key = spec.option_str("primary_key").unwrap_or(DEFAULT_PRIMARY_KEY);
                let id = item.get(primary_key).cloned().ok_or_else(|| {
                    InvocationError::backend(format!("Item is missing primary key '{}'", primary_key))
                })?;
                rows.retain(|row| row.get(primary_key) != Some(&id));
                rows.push(item.clone());
                json!({ "item": item })
            }
            DbOperation::GetItem { key } => {
                let item = rows.iter().find(|row| matches(row, &key)).cloned();
                json!({ "key": key, "item": item })
            }
            DbOperation::DeleteItem { key } => {
                let before = rows.len();
                rows.retain(|row| !matches(row, &key));
                json!({ "key": key, "deleted": before - rows.len() })
            }
            DbOperation::Query { filter, limit } => {
                let items: Vec<&Item> = rows
                    .iter()
                    .filter(|row| matches(row, &filter))
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                json!({ "items": items, "count": items.len() })
            }
            DbOperation::Scan { limit } => {
                let items: Vec<&Item> = rows.iter().take(limit.unwrap_or(usize::MAX)).collect();
                json!({ "items": items, "count": items.len() })
            }
        };

        if let Value::Object(map) = &mut response {
            map.insert("operation".into(), json!(name));
            map.insert("table_name".into(), json!(table));
            map.insert("status".into(), json!("success"));
        }
        Ok(response)
    }
}

pub struct DatabaseBackend {
    engines: RwLock<HashMap<String, Arc<dyn DbStrategy>>>,
}

impl DatabaseBackend {
    /// Backend with the in-memory engine registered
    pub fn new() -> Self {
        Self::empty().with_engine(Arc::new(InMemoryDbStrategy::new()))
    }

    pub fn empty() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_engine(self, strategy: Arc<dyn DbStrategy>) -> Self {
        self.register_engine(strategy);
        self
    }

    pub fn register_engine(&self, strategy: Arc<dyn DbStrategy>) {
        self.engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(strategy.engine().to_string(), strategy);
    }

    fn engine(&self, name: &str) -> Result<Arc<dyn DbStrategy>, InvocationError> {
        self.engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| InvocationError::backend(format!("Unknown database engine '{}'", name)))
    }
}

impl Default for DatabaseBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendStrategy for DatabaseBackend {
    fn driver(&self) -> &str {
        DATABASE_DRIVER
    }

    async fn execute(
        &self,
        args: &ToolArgs,
        spec: &ToolSpec,
        timeout: Duration,
    ) -> Result<Value, InvocationError> {
        let engine = self.engine(spec.option_str("engine").unwrap_or(DEFAULT_ENGINE))?;
        let table = spec
            .option_str("table")
            .or_else(|| args.get("table").and_then(Value::as_str))
            .ok_or_else(|| InvocationError::backend("No table configured or given"))?;
        let operation = DbOperation::from_args(args)?;

        debug!(
            tool = %spec.id,
            engine = engine.engine(),
            table,
            operation = operation.name(),
            "Executing database operation"
        );
        engine.execute_operation(operation, table, spec, timeout).await
    }
}

impl std::fmt::Debug for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut engines: Vec<String> = self
            .engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        engines.sort();
        f.debug_struct("DatabaseBackend")
            .field("engines", &engines)
            .finish()
    }
}
