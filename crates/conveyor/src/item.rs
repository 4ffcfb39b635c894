//! Items carried on stream channels
//!
//! Channels are untyped: every stage sends and receives [`Item`]s, and each
//! stage checks the dynamic type of an item against the type it declares at
//! the moment it receives it. Items whose type does not match are dropped
//! with a debug event on the log bus.

use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, owned value flowing between stages
pub struct Item {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Item {
    /// Wrap a value
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the type this item was built from
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the item holds a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the value as a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the value out as a `T`, or get the untouched item back
    pub fn downcast<T: Any>(self) -> Result<T, Item> {
        let type_name = self.type_name;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Item { value, type_name }),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Key/value entry published by the map re-streamer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn into_tuple(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Richer envelope a kernel may emit; the engine carries it downstream verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamItem<T> {
    /// Position assigned by the emitting kernel
    pub index: u64,

    /// The payload
    pub item: T,

    /// Free-form metadata, kept in key order
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl<T> StreamItem<T> {
    pub fn new(index: u64, item: T) -> Self {
        Self {
            index,
            item,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_downcast() {
        let item = Item::new(42_i64);
        assert!(item.is::<i64>());
        assert_eq!(item.downcast_ref::<i64>(), Some(&42));
        assert_eq!(item.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn test_item_downcast_mismatch_returns_item() {
        let item = Item::new("hello".to_string());
        let item = item.downcast::<i32>().unwrap_err();
        assert!(item.type_name().ends_with("String"));
        assert_eq!(item.downcast::<String>().unwrap(), "hello");
    }

    #[test]
    fn test_item_debug_names_type() {
        let item = Item::new(vec![1u8, 2, 3]);
        let debug = format!("{:?}", item);
        assert!(debug.contains("Vec<u8>"));
    }

    #[test]
    fn test_stream_item_metadata() {
        let item = StreamItem::new(3, "payload")
            .with_metadata("source", "csv")
            .with_metadata("line", 4);

        assert_eq!(item.index, 3);
        assert_eq!(item.metadata.len(), 2);
        assert_eq!(item.metadata["line"], serde_json::json!(4));
    }

    #[test]
    fn test_pair_into_tuple() {
        let pair = Pair::new("device", 7);
        assert_eq!(pair.into_tuple(), ("device", 7));
    }
}
