//! In-process item store with maintained secondary indexes.
//!
//! Items live in a primary map keyed by `id`. Each secondary index is an
//! ordered set of `(partition value, sort value, id)` entries, updated on
//! every put and delete. Items lacking an index's key attributes are simply
//! absent from that index.
//!
//! Reads take a shared lock and writes an exclusive one; the lock is held for
//! the duration of a single call only.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::path::Path;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{Field, IndexName, TABLE_KEY, TABLE_NAME};

use super::{Cursor, Item, ItemStore, QueryRequest, QueryResult, ScanRequest};

/// `(partition value, sort value, id)`.
type IndexEntry = (String, String, String);

#[derive(Default)]
struct State {
    items: BTreeMap<String, Item>,
    indexes: HashMap<IndexName, BTreeSet<IndexEntry>>,
}

impl State {
    fn index_insert(&mut self, id: &str, item: &Item) {
        for index in IndexName::ALL {
            if let Some(entry) = index_entry(index, id, item) {
                self.indexes.entry(index).or_default().insert(entry);
            }
        }
    }

    fn index_remove(&mut self, id: &str, item: &Item) {
        for index in IndexName::ALL {
            if let Some(entry) = index_entry(index, id, item)
                && let Some(set) = self.indexes.get_mut(&index)
            {
                set.remove(&entry);
            }
        }
    }
}

/// A thread-safe, in-memory [`ItemStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryStore::save`]. A missing file
    /// yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::new();
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(store);
        }

        let bytes = std::fs::read(path)?;
        let items: Vec<Item> = serde_json::from_slice(&bytes)?;
        let count = items.len();
        for item in items {
            store.put(item)?;
        }
        info!(table = TABLE_NAME, path = %path.display(), items = count, "snapshot loaded");
        Ok(store)
    }

    /// Write every item to `path` as a JSON array.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let state = self.state.read();
        let items: Vec<&Item> = state.items.values().collect();
        let bytes = serde_json::to_vec_pretty(&items)?;
        std::fs::write(path, bytes)?;
        info!(table = TABLE_NAME, path = %path.display(), items = items.len(), "snapshot saved");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.state.read().items.get(id).cloned())
    }

    fn put(&self, item: Item) -> Result<(), StoreError> {
        let id = string_attr(&item, TABLE_KEY)
            .ok_or_else(|| {
                StoreError::InvalidKey(format!(
                    "item is missing string key attribute '{TABLE_KEY}'"
                ))
            })?
            .to_string();

        let mut state = self.state.write();
        if let Some(old) = state.items.remove(&id) {
            state.index_remove(&id, &old);
        }
        state.index_insert(&id, &item);
        state.items.insert(id, item);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if let Some(old) = state.items.remove(id) {
            state.index_remove(id, &old);
        }
        Ok(())
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryResult, StoreError> {
        let index = request.key.index;
        let partition = &request.key.partition_value;

        let skip_key = match &request.exclusive_start_key {
            Some(cursor) => Some(index_start_key(index, partition, cursor)?),
            None => None,
        };

        let state = self.state.read();
        let Some(entries) = state.indexes.get(&index) else {
            return Ok(QueryResult::default());
        };

        let lower = (partition.clone(), String::new(), String::new());
        let mut keys: Vec<&IndexEntry> = entries
            .range(lower..)
            .take_while(|(pv, _, _)| pv == partition)
            .filter(|key| match &skip_key {
                // Forward: skip keys at or before the cursor.
                // Reverse: skip keys at or after it.
                Some(sk) if request.scan_forward => *key > sk,
                Some(sk) => *key < sk,
                None => true,
            })
            .collect();

        if !request.scan_forward {
            keys.reverse();
        }

        // Limit counts evaluated items; the filter only decides what is returned.
        let mut items = Vec::new();
        let mut last_evaluated: Option<&IndexEntry> = None;
        let mut has_more = false;

        for (evaluated, key) in keys.iter().copied().enumerate() {
            if evaluated >= request.limit {
                has_more = true;
                break;
            }
            last_evaluated = Some(key);

            let Some(item) = state.items.get(&key.2) else {
                continue;
            };
            if request.filter.iter().all(|eq| eq.matches(item)) {
                items.push(item.clone());
            }
        }

        let last_evaluated_key = if has_more {
            last_evaluated.map(|key| index_cursor(index, key))
        } else {
            None
        };

        debug!(
            index = %index,
            partition = %partition,
            limit = request.limit,
            forward = request.scan_forward,
            returned = items.len(),
            has_more,
            "index query"
        );

        Ok(QueryResult {
            items,
            last_evaluated_key,
        })
    }

    fn scan(&self, request: &ScanRequest) -> Result<QueryResult, StoreError> {
        let start = match &request.exclusive_start_key {
            Some(cursor) => {
                let id = cursor.field(TABLE_KEY).ok_or_else(|| {
                    StoreError::InvalidKey(format!(
                        "exclusive start key is missing '{TABLE_KEY}'"
                    ))
                })?;
                Bound::Excluded(id.to_string())
            }
            None => Bound::Unbounded,
        };

        let state = self.state.read();
        let mut range = state.items.range::<String, _>((start, Bound::Unbounded));
        let items: Vec<(&String, &Item)> = range.by_ref().take(request.limit).collect();
        let has_more = range.next().is_some();

        let last_evaluated_key = match items.last() {
            Some((id, _)) if has_more => {
                Some(Cursor::new().with(TABLE_KEY.attribute_name(), id.as_str()))
            }
            _ => None,
        };

        Ok(QueryResult {
            items: items.into_iter().map(|(_, item)| item.clone()).collect(),
            last_evaluated_key,
        })
    }
}

fn string_attr(item: &Item, field: Field) -> Option<&str> {
    item.get(field.attribute_name()).and_then(Value::as_str)
}

fn index_entry(index: IndexName, id: &str, item: &Item) -> Option<IndexEntry> {
    let partition = string_attr(item, index.partition_key())?;
    let sort = string_attr(item, index.sort_key())?;
    Some((partition.to_string(), sort.to_string(), id.to_string()))
}

fn index_start_key(
    index: IndexName,
    partition: &str,
    cursor: &Cursor,
) -> Result<IndexEntry, StoreError> {
    let component = |field: Field| {
        cursor.field(field).map(str::to_string).ok_or_else(|| {
            StoreError::InvalidKey(format!(
                "exclusive start key for {index} is missing '{field}'"
            ))
        })
    };
    let sort = component(index.sort_key())?;
    let id = component(TABLE_KEY)?;
    Ok((partition.to_string(), sort, id))
}

fn index_cursor(index: IndexName, (partition, sort, id): &IndexEntry) -> Cursor {
    Cursor::new()
        .with(TABLE_KEY.attribute_name(), id.as_str())
        .with(index.partition_key().attribute_name(), partition.as_str())
        .with(index.sort_key().attribute_name(), sort.as_str())
}
