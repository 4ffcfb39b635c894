//! Keying strategies
//!
//! Grouping, keyed sums and keyed sorts all read one value out of every row
//! of a window. A [`Keying`] says where that value lives:
//!
//! - [`ByIndex`]: position `p` of a `Vec` row
//! - [`ByField`]: a named field of a serializable record
//! - [`ByMapKey`]: an entry of a `HashMap`/`BTreeMap` row
//!
//! The kernels in [`group`](super::group), [`sum`](super::sum) and
//! [`sort`](super::sort) are generic over the strategy.

use super::record::{field, FieldKey};
use crate::error::KernelError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Reads the key of a row of type `R`
pub trait Keying<R>: Send + Sync + 'static {
    /// Value read from a row
    type Key;
    /// What a group keeps of each row
    type Group;

    /// Key of `row`; `Ok(None)` when the row does not carry one
    ///
    /// Errors are reserved for rows that cannot be inspected at all.
    fn key(&self, row: &R) -> Result<Option<Self::Key>, KernelError>;

    /// Consume `row` into its key and group entry; `None` skips the row
    fn split(&self, row: R) -> Option<(Self::Key, Self::Group)>;
}

/// Position `p` of a `Vec` row
///
/// Grouping removes the key column from the grouped rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByIndex(pub usize);

impl<E: Clone> Keying<Vec<E>> for ByIndex {
    type Key = E;
    type Group = Vec<E>;

    fn key(&self, row: &Vec<E>) -> Result<Option<E>, KernelError> {
        Ok(row.get(self.0).cloned())
    }

    fn split(&self, mut row: Vec<E>) -> Option<(E, Vec<E>)> {
        if self.0 >= row.len() {
            return None;
        }
        let key = row.remove(self.0);
        Some((key, row))
    }
}

/// Named field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByField(pub String);

impl ByField {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl<S: Serialize> Keying<S> for ByField {
    type Key = FieldKey;
    type Group = S;

    fn key(&self, row: &S) -> Result<Option<FieldKey>, KernelError> {
        Ok(field(row, &self.0)?.map(FieldKey::from))
    }

    fn split(&self, row: S) -> Option<(FieldKey, S)> {
        let key = self.key(&row).ok().flatten()?;
        Some((key, row))
    }
}

/// Entry `k` of a map row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByMapKey<K>(pub K);

impl<K, V> Keying<HashMap<K, V>> for ByMapKey<K>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone,
{
    type Key = V;
    type Group = HashMap<K, V>;

    fn key(&self, row: &HashMap<K, V>) -> Result<Option<V>, KernelError> {
        Ok(row.get(&self.0).cloned())
    }

    fn split(&self, row: HashMap<K, V>) -> Option<(V, HashMap<K, V>)> {
        let key = row.get(&self.0)?.clone();
        Some((key, row))
    }
}

impl<K, V> Keying<BTreeMap<K, V>> for ByMapKey<K>
where
    K: Ord + Send + Sync + 'static,
    V: Clone,
{
    type Key = V;
    type Group = BTreeMap<K, V>;

    fn key(&self, row: &BTreeMap<K, V>) -> Result<Option<V>, KernelError> {
        Ok(row.get(&self.0).cloned())
    }

    fn split(&self, row: BTreeMap<K, V>) -> Option<(V, BTreeMap<K, V>)> {
        let key = row.get(&self.0)?.clone();
        Some((key, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_by_index_split_removes_key_column() {
        let keying = ByIndex(1);
        assert_eq!(keying.split(vec![1, 2, 3]), Some((2, vec![1, 3])));
        assert_eq!(keying.split(vec![1]), None);
        assert_eq!(keying.key(&vec![7, 8]).unwrap(), Some(8));
    }

    #[test]
    fn test_by_field_reads_records() {
        let keying = ByField::new("device");
        let row = json!({"device": "a", "value": 1});
        assert_eq!(
            keying.key(&row).unwrap(),
            Some(FieldKey::String("a".to_string()))
        );
        assert_eq!(Keying::<serde_json::Value>::key(&ByField::new("x"), &row).unwrap(), None);
        assert!(keying.key(&json!(3)).is_err());
        assert!(keying.split(json!(3)).is_none());
    }

    #[test]
    fn test_by_map_key() {
        let keying = ByMapKey("Device".to_string());
        let mut row = HashMap::new();
        row.insert("Device".to_string(), "sensor".to_string());

        assert_eq!(keying.key(&row).unwrap(), Some("sensor".to_string()));
        assert_eq!(keying.split(HashMap::<String, String>::new()), None);

        let tree: BTreeMap<String, i32> = [("Device".to_string(), 4)].into_iter().collect();
        assert_eq!(keying.key(&tree).unwrap(), Some(4));
    }
}
