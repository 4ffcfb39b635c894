//! Grouping kernels
//!
//! Input is a window (`Vec<R>`), output is a `HashMap` from key to the rows
//! carrying that key, in window order. Rows without a key are skipped.

use super::keying::{ByField, ByIndex, ByMapKey, Keying};
use crate::context::OperatorContext;
use crate::pipeline::operator::{Kernel, KernelOperator};
use crate::pipeline::outcome::Outcome;
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use tracing::trace;

/// Group `rows` by the key `keying` reads from each of them
pub fn group_rows<R, G>(rows: Vec<R>, keying: &G) -> HashMap<G::Key, Vec<G::Group>>
where
    G: Keying<R>,
    G::Key: Eq + Hash,
{
    let mut groups: HashMap<G::Key, Vec<G::Group>> = HashMap::new();
    for row in rows {
        if let Some((key, entry)) = keying.split(row) {
            groups.entry(key).or_default().push(entry);
        }
    }
    groups
}

/// Window kernel grouping rows of type `R` with strategy `G`
pub struct GroupBy<G, R> {
    keying: G,
    _phantom: PhantomData<fn(R)>,
}

impl<G, R> GroupBy<G, R>
where
    G: Keying<R>,
{
    pub fn new(keying: G) -> Self {
        Self {
            keying,
            _phantom: PhantomData,
        }
    }

    pub fn keying(&self) -> &G {
        &self.keying
    }
}

#[async_trait]
impl<G, R> Kernel for GroupBy<G, R>
where
    G: Keying<R>,
    G::Key: Eq + Hash + Any + Send,
    G::Group: Any + Send,
    R: Any + Send,
{
    type Input = Vec<R>;

    async fn apply(&self, ctx: &OperatorContext, rows: Vec<R>) -> Outcome {
        let total = rows.len();
        let groups = group_rows(rows, &self.keying);
        let grouped: usize = groups.values().map(Vec::len).sum();
        if grouped < total {
            trace!(
                operator = ctx.operator(),
                skipped = total - grouped,
                "rows without a key skipped"
            );
        }
        Outcome::forward(groups)
    }
}

pub type GroupByIndex<E> = GroupBy<ByIndex, Vec<E>>;
pub type GroupByField<S> = GroupBy<ByField, S>;
pub type GroupByMapKey<K, V> = GroupBy<ByMapKey<K>, HashMap<K, V>>;

/// Grouping operator for any keying strategy
pub fn group_by<R, G>(keying: G) -> KernelOperator<GroupBy<G, R>>
where
    G: Keying<R>,
    G::Key: Eq + Hash + Any + Send,
    G::Group: Any + Send,
    R: Any + Send,
{
    KernelOperator::new("group-by", GroupBy::new(keying))
}

/// `Vec<Vec<E>>` windows to `HashMap<E, Vec<Vec<E>>>`, keyed by column `index`
///
/// The key column is removed from the grouped rows.
pub fn group_by_index<E>(index: usize) -> KernelOperator<GroupByIndex<E>>
where
    E: Clone + Eq + Hash + Any + Send,
{
    group_by(ByIndex(index)).with_name("group-by-index")
}

/// `Vec<S>` windows to `HashMap<FieldKey, Vec<S>>`, keyed by field `name`
pub fn group_by_field<S>(name: impl Into<String>) -> KernelOperator<GroupByField<S>>
where
    S: Serialize + Any + Send,
{
    group_by(ByField::new(name)).with_name("group-by-field")
}

/// `Vec<HashMap<K, V>>` windows to `HashMap<V, Vec<HashMap<K, V>>>`
pub fn group_by_map_key<K, V>(key: K) -> KernelOperator<GroupByMapKey<K, V>>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Eq + Hash + Any + Send,
{
    group_by(ByMapKey(key)).with_name("group-by-map-key")
}
