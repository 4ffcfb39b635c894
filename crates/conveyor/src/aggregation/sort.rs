//! Sorting kernels
//!
//! All sorts are stable and ascending. Comparisons are made total: values
//! that do not compare with themselves (NaN) order after everything else,
//! and rows without a key order after rows that have one.

use super::keying::{ByField, ByIndex, ByMapKey, Keying};
use crate::context::OperatorContext;
use crate::error::KernelError;
use crate::pipeline::operator::{Kernel, KernelOperator};
use crate::pipeline::outcome::{IntoOutcome, Outcome};
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Total order over a partial one; unordered values go last
pub fn compare_partial<T: PartialOrd + ?Sized>(a: &T, b: &T) -> Ordering {
    if let Some(ordering) = a.partial_cmp(b) {
        return ordering;
    }
    let a_unordered = a.partial_cmp(a).is_none();
    let b_unordered = b.partial_cmp(b).is_none();
    match (a_unordered, b_unordered) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn compare_keys<K: PartialOrd>(a: &Option<K>, b: &Option<K>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_partial(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ascending in-place sort
pub fn sort_values<O: PartialOrd>(values: &mut [O]) {
    values.sort_by(compare_partial);
}

/// Sort with a caller comparator
pub fn sort_values_by<T, F>(values: &mut [T], compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    values.sort_by(compare);
}

/// Sort `rows` by the key `keying` reads from each row
///
/// Fails if any row cannot be inspected, for example a non-record under
/// [`ByField`].
pub fn sort_rows<R, G>(rows: Vec<R>, keying: &G) -> Result<Vec<R>, KernelError>
where
    G: Keying<R>,
    G::Key: PartialOrd,
{
    let mut keyed = rows
        .into_iter()
        .map(|row| Ok((keying.key(&row)?, row)))
        .collect::<Result<Vec<_>, KernelError>>()?;
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Window kernel sorting rows by a keyed value
///
/// A window holding an uninspectable row is dropped and reported as an
/// item error.
pub struct SortBy<G, R> {
    keying: G,
    _phantom: PhantomData<fn(R)>,
}

impl<G: Keying<R>, R> SortBy<G, R> {
    pub fn new(keying: G) -> Self {
        Self {
            keying,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<G, R> Kernel for SortBy<G, R>
where
    G: Keying<R>,
    G::Key: PartialOrd,
    R: Any + Send,
{
    type Input = Vec<R>;

    async fn apply(&self, _ctx: &OperatorContext, rows: Vec<R>) -> Outcome {
        sort_rows(rows, &self.keying).into_outcome()
    }
}

/// Sorts `Vec<O>` windows by their elements
pub struct SortSlice<O> {
    _phantom: PhantomData<fn(O)>,
}

impl<O> SortSlice<O> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<O> Default for SortSlice<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<O: PartialOrd + Any + Send> Kernel for SortSlice<O> {
    type Input = Vec<O>;

    async fn apply(&self, _ctx: &OperatorContext, mut values: Vec<O>) -> Outcome {
        sort_values(&mut values);
        Outcome::forward(values)
    }
}

/// Sorts `Vec<T>` windows with a user comparator
pub struct SortWithFunc<F, T> {
    compare: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> SortWithFunc<F, T>
where
    F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
{
    pub fn new(compare: F) -> Self {
        Self {
            compare,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Kernel for SortWithFunc<F, T>
where
    F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    T: Any + Send,
{
    type Input = Vec<T>;

    async fn apply(&self, _ctx: &OperatorContext, mut values: Vec<T>) -> Outcome {
        sort_values_by(&mut values, &self.compare);
        Outcome::forward(values)
    }
}

pub type SortSliceByIndex<O> = SortBy<ByIndex, Vec<O>>;
pub type SortByField<S> = SortBy<ByField, S>;
pub type SortByMapKey<K, V> = SortBy<ByMapKey<K>, HashMap<K, V>>;

pub fn sort_by<R, G>(keying: G) -> KernelOperator<SortBy<G, R>>
where
    G: Keying<R>,
    G::Key: PartialOrd,
    R: Any + Send,
{
    KernelOperator::new("sort-by", SortBy::new(keying))
}

pub fn sort_slice<O: PartialOrd + Any + Send>() -> KernelOperator<SortSlice<O>> {
    KernelOperator::new("sort-slice", SortSlice::new())
}

/// `Vec<Vec<O>>` windows sorted by column `index`
///
/// Rows shorter than `index + 1` do not compare equal to the others: they
/// keep their relative order and move after every row that has the column.
pub fn sort_slice_by_index<O>(index: usize) -> KernelOperator<SortSliceByIndex<O>>
where
    O: PartialOrd + Clone + Any + Send,
{
    sort_by(ByIndex(index)).with_name("sort-slice-by-index")
}

/// Windows of records sorted by field `name`; a non-record fails the window
pub fn sort_by_field<S>(name: impl Into<String>) -> KernelOperator<SortByField<S>>
where
    S: Serialize + Any + Send,
{
    sort_by(ByField::new(name)).with_name("sort-by-field")
}

/// Windows of maps sorted by the value at `key`; maps without it go last
pub fn sort_by_map_key<K, V>(key: K) -> KernelOperator<SortByMapKey<K, V>>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: PartialOrd + Clone + Any + Send,
{
    sort_by(ByMapKey(key)).with_name("sort-by-map-key")
}

pub fn sort_with_func<F, T>(compare: F) -> KernelOperator<SortWithFunc<F, T>>
where
    F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    T: Any + Send,
{
    KernelOperator::new("sort-with-func", SortWithFunc::new(compare))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nan_sorts_last() {
        let mut values = vec![3.0, f64::NAN, 1.0, 2.0];
        sort_values(&mut values);
        assert_eq!(&values[..3], &[1.0, 2.0, 3.0]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_sort_by_index_puts_short_rows_last() {
        let rows = vec![vec![3, 0], vec![1], vec![1, 9], vec![2, 2]];
        let sorted = sort_rows(rows, &ByIndex(1)).unwrap();
        assert_eq!(sorted, vec![vec![3, 0], vec![2, 2], vec![1, 9], vec![1]]);
    }

    #[test]
    fn test_sort_by_field() {
        let rows = vec![json!({"n": 3}), json!({"n": 1}), json!({}), json!({"n": 2})];
        let sorted = sort_rows(rows, &ByField::new("n")).unwrap();
        assert_eq!(
            sorted,
            vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3}), json!({})]
        );
    }

    #[test]
    fn test_sort_by_field_rejects_non_records() {
        let rows = vec![json!({"n": 1}), json!(5)];
        let err = sort_rows(rows, &ByField::new("n")).unwrap_err();
        assert!(matches!(err, KernelError::NotARecord { .. }));
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut once = vec!["pear", "apple", "fig", "apple"];
        sort_values(&mut once);
        let mut twice = once.clone();
        sort_values(&mut twice);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_sort_with_func_descending() {
        let ctx = OperatorContext::detached("sort");
        let kernel = SortWithFunc::new(|a: &i32, b: &i32| b.cmp(a));
        let outcome = kernel.apply(&ctx, vec![1, 3, 2]).await;
        let sorted = outcome.into_items().remove(0).downcast::<Vec<i32>>().unwrap();
        assert_eq!(sorted, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_sort_by_field_kernel_reports_error() {
        let ctx = OperatorContext::detached("sort");
        let kernel: SortByField<serde_json::Value> = SortBy::new(ByField::new("n"));
        let outcome = kernel.apply(&ctx, vec![json!("x")]).await;
        assert!(outcome.is_skip());
        assert!(outcome.error().is_some());
    }
}
