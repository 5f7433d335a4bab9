//! Item store adapter: the forward-only, index-partitioned key-value contract
//! the pagination engine is built on.
//!
//! A query returns at most `limit` evaluated items plus an optional
//! continuation key ([`Cursor`]) naming where the next page starts. There is
//! no backward primitive; see [`crate::pagination`] for how previous pages
//! are synthesized on top of this.

pub mod memory;

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::types::{Field, IndexName};

pub use memory::MemoryStore;

/// Raw attribute map as held by the store.
pub type Item = Map<String, Value>;

/// A store-native continuation key: ordered `(attribute, value)` pairs
/// identifying the last evaluated position of a query.
///
/// Order is the order the store emitted the components in. An empty cursor
/// means "start from the beginning".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    components: Vec<(String, String)>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component, replacing the value if the name is already present.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.components.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.components.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        self.get(field.attribute_name())
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.components
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// True if every attribute in `fields` has a component.
    pub fn covers(&self, fields: &[Field]) -> bool {
        fields.iter().all(|f| self.field(*f).is_some())
    }
}

/// Key condition of an index query: equality on the index partition key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    pub index: IndexName,
    pub partition_value: String,
}

/// An additional equality predicate evaluated after items are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equality {
    pub field: Field,
    pub value: String,
}

impl Equality {
    pub fn new(field: Field, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        item.get(self.field.attribute_name()).and_then(Value::as_str) == Some(self.value.as_str())
    }
}

/// A range read over one secondary index partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub key: KeyCondition,
    pub filter: Vec<Equality>,
    /// Maximum number of items evaluated (before `filter` is applied).
    pub limit: usize,
    pub scan_forward: bool,
    pub exclusive_start_key: Option<Cursor>,
}

impl QueryRequest {
    pub fn new(index: IndexName, partition_value: impl Into<String>, limit: usize) -> Self {
        Self {
            key: KeyCondition {
                index,
                partition_value: partition_value.into(),
            },
            filter: Vec::new(),
            limit,
            scan_forward: true,
            exclusive_start_key: None,
        }
    }

    pub fn filter(mut self, eq: Equality) -> Self {
        self.filter.push(eq);
        self
    }

    pub fn scan_forward(mut self, forward: bool) -> Self {
        self.scan_forward = forward;
        self
    }

    pub fn exclusive_start_key(mut self, cursor: Option<Cursor>) -> Self {
        self.exclusive_start_key = cursor.filter(|c| !c.is_empty());
        self
    }
}

/// A read over the whole table in primary key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub limit: usize,
    pub exclusive_start_key: Option<Cursor>,
}

/// One page of items and the key to continue from, if more remain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Cursor>,
}

/// Blocking access to the underlying item store.
///
/// Implementations do not retry; transport failures surface as
/// [`StoreError`] and are propagated unchanged by callers.
pub trait ItemStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Item>, StoreError>;

    /// Insert or replace the item keyed by its `id` attribute.
    fn put(&self, item: Item) -> Result<(), StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;

    fn query(&self, request: &QueryRequest) -> Result<QueryResult, StoreError>;

    fn scan(&self, request: &ScanRequest) -> Result<QueryResult, StoreError>;
}

impl<S: ItemStore + ?Sized> ItemStore for std::sync::Arc<S> {
    fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
        (**self).get(id)
    }

    fn put(&self, item: Item) -> Result<(), StoreError> {
        (**self).put(item)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryResult, StoreError> {
        (**self).query(request)
    }

    fn scan(&self, request: &ScanRequest) -> Result<QueryResult, StoreError> {
        (**self).scan(request)
    }
}
