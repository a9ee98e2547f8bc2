//! Remote structured store contract.
//!
//! The synchronizers describe what they want as a [`StoreQuery`] and decode
//! the returned rows themselves; a [`ContentStore`] only moves rows.

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Named collections exposed by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    News,
    Programs,
    Contacts,
    Advertisements,
    Settings,
}

impl Collection {
    /// Table name in the store
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Programs => "programs",
            Self::Contacts => "contacts",
            Self::Advertisements => "advertisements",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Filtered, ordered read over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl StoreQuery {
    /// Select every row of `collection`
    #[must_use]
    pub const fn from(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order: None,
        }
    }

    /// Keep only rows where `column` equals `value`
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Order rows by `column`
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Whether a row satisfies every filter
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|filter| row.get(&filter.column) == Some(&filter.value))
    }
}

/// Trait for remote structured stores
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Get the store name
    fn name(&self) -> &'static str;

    /// Run a filtered, ordered read and return raw rows
    async fn select(&self, query: &StoreQuery) -> Result<Vec<Value>>;

    /// Insert a single row
    async fn insert(&self, collection: Collection, row: Value) -> Result<()>;
}

/// Decode raw rows into typed records.
///
/// Rows that do not match the record shape (unknown enum values, missing
/// fields) are dropped with a warning.
pub fn decode_rows<T: DeserializeOwned>(collection: Collection, rows: Vec<Value>) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Rejecting {} row (id: {}): {}", collection, id, e);
                    None
                }
            }
        })
        .collect();

    if decoded.len() != total {
        debug!(
            "Decoded {}/{} {} rows",
            decoded.len(),
            total,
            collection
        );
    }
    decoded
}

/// Compare two JSON scalars for ordering.
///
/// Numbers compare numerically, strings lexicographically (ISO timestamps and
/// `HH:MM:SS` times sort correctly that way), nulls sort last.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// In-process store honoring equality filters and ordering
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with rows
    #[must_use]
    pub fn with_rows(collection: Collection, rows: Vec<Value>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(collection, rows);
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Replace the rows of a collection
    pub async fn set_rows(&self, collection: Collection, rows: Vec<Value>) {
        self.tables.write().await.insert(collection, rows);
    }

    /// Snapshot the rows of a collection in insertion order
    pub async fn rows(&self, collection: Collection) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &StoreQuery) -> Result<Vec<Value>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&query.collection)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<()> {
        if !row.is_object() {
            return Err(CoreError::MalformedRow {
                collection: collection.to_string(),
                reason: "row must be a JSON object".into(),
            });
        }
        self.tables
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": 1, "kind": "a", "rank": 3}),
            json!({"id": 2, "kind": "b", "rank": 1}),
            json!({"id": 3, "kind": "a", "rank": 2}),
        ]
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn test_query_builder() {
        let query = StoreQuery::from(Collection::News)
            .eq("published", true)
            .order_by("created_at", Direction::Descending);

        assert_eq!(query.collection, Collection::News);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].value, json!(true));
        assert_eq!(
            query.order,
            Some(Order {
                column: "created_at".to_string(),
                direction: Direction::Descending,
            })
        );
    }

    #[test]
    fn test_matches_requires_all_filters() {
        let query = StoreQuery::from(Collection::News).eq("kind", "a").eq("rank", 2);
        assert!(query.matches(&json!({"kind": "a", "rank": 2})));
        assert!(!query.matches(&json!({"kind": "a", "rank": 3})));
        assert!(!query.matches(&json!({"rank": 2})));
    }

    #[tokio::test]
    async fn test_memory_store_filter_and_order() {
        let store = MemoryStore::with_rows(Collection::News, rows());

        let query = StoreQuery::from(Collection::News)
            .eq("kind", "a")
            .order_by("rank", Direction::Ascending);
        assert_eq!(ids(&store.select(&query).await.unwrap()), vec![3, 1]);

        let query = StoreQuery::from(Collection::News).order_by("rank", Direction::Descending);
        assert_eq!(ids(&store.select(&query).await.unwrap()), vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_memory_store_missing_collection_is_empty() {
        let store = MemoryStore::new();
        let rows = store
            .select(&StoreQuery::from(Collection::Programs))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_insert() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Contacts, json!({"name": "Ana"}))
            .await
            .unwrap();
        assert_eq!(store.rows(Collection::Contacts).await.len(), 1);

        let result = store.insert(Collection::Contacts, json!([1, 2])).await;
        assert!(matches!(result, Err(CoreError::MalformedRow { .. })));
    }

    #[test]
    fn test_decode_rows_drops_invalid() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: i64,
        }

        let decoded: Vec<Row> = decode_rows(
            Collection::News,
            vec![json!({"id": 1}), json!({"id": "x"}), json!({"id": 3})],
        );
        assert_eq!(decoded.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_compare_values_nulls_last() {
        assert_eq!(compare_values(&Value::Null, &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(1), &json!(2)), Ordering::Less);
        assert_eq!(
            compare_values(&json!("2024-02-01"), &json!("2024-01-01")),
            Ordering::Greater
        );
    }
}
