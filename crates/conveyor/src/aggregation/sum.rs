//! Summing kernels
//!
//! Every variant reduces a window to one `f64`. Values with no numeric
//! reading, rows without a key, and rows that cannot be inspected are
//! ignored. An empty window sums to `0.0`.

use super::keying::{ByField, ByIndex, ByMapKey, Keying};
use super::numeric::Numeric;
use crate::context::OperatorContext;
use crate::pipeline::operator::{Kernel, KernelOperator};
use crate::pipeline::outcome::Outcome;
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Sum of the numeric keys `keying` reads from `rows`
pub fn sum_rows<R, G>(rows: &[R], keying: &G) -> f64
where
    G: Keying<R>,
    G::Key: Numeric,
{
    rows.iter()
        .filter_map(|row| keying.key(row).ok().flatten())
        .filter_map(|key| key.to_f64())
        .sum()
}

/// Sum of all numeric values
pub fn sum_values<N: Numeric>(values: &[N]) -> f64 {
    values.iter().filter_map(Numeric::to_f64).sum()
}

/// Sum of all numeric values of all rows
pub fn sum_nested<N: Numeric>(rows: &[Vec<N>]) -> f64 {
    rows.iter().map(|row| sum_values(row)).sum()
}

/// Window kernel summing one keyed value per row
pub struct SumBy<G, R> {
    keying: G,
    _phantom: PhantomData<fn(R)>,
}

impl<G: Keying<R>, R> SumBy<G, R> {
    pub fn new(keying: G) -> Self {
        Self {
            keying,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<G, R> Kernel for SumBy<G, R>
where
    G: Keying<R>,
    G::Key: Numeric,
    R: Any + Send,
{
    type Input = Vec<R>;

    async fn apply(&self, _ctx: &OperatorContext, rows: Vec<R>) -> Outcome {
        Outcome::forward(sum_rows(&rows, &self.keying))
    }
}

/// `Vec<N>` windows to their sum
pub struct SumAll1D<N> {
    _phantom: PhantomData<fn(N)>,
}

impl<N> SumAll1D<N> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<N> Default for SumAll1D<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<N: Numeric + Any + Send> Kernel for SumAll1D<N> {
    type Input = Vec<N>;

    async fn apply(&self, _ctx: &OperatorContext, values: Vec<N>) -> Outcome {
        Outcome::forward(sum_values(&values))
    }
}

/// `Vec<Vec<N>>` windows to the sum of every inner value
pub struct SumAll2D<N> {
    _phantom: PhantomData<fn(N)>,
}

impl<N> SumAll2D<N> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<N> Default for SumAll2D<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<N: Numeric + Any + Send> Kernel for SumAll2D<N> {
    type Input = Vec<Vec<N>>;

    async fn apply(&self, _ctx: &OperatorContext, rows: Vec<Vec<N>>) -> Outcome {
        Outcome::forward(sum_nested(&rows))
    }
}

pub type SumByIndex<N> = SumBy<ByIndex, Vec<N>>;
pub type SumByField<S> = SumBy<ByField, S>;
pub type SumByMapKey<K, V> = SumBy<ByMapKey<K>, HashMap<K, V>>;

pub fn sum_by<R, G>(keying: G) -> KernelOperator<SumBy<G, R>>
where
    G: Keying<R>,
    G::Key: Numeric,
    R: Any + Send,
{
    KernelOperator::new("sum-by", SumBy::new(keying))
}

pub fn sum_by_index<N>(index: usize) -> KernelOperator<SumByIndex<N>>
where
    N: Numeric + Clone + Any + Send,
{
    sum_by(ByIndex(index)).with_name("sum-by-index")
}

pub fn sum_by_field<S>(name: impl Into<String>) -> KernelOperator<SumByField<S>>
where
    S: Serialize + Any + Send,
{
    sum_by(ByField::new(name)).with_name("sum-by-field")
}

pub fn sum_by_map_key<K, V>(key: K) -> KernelOperator<SumByMapKey<K, V>>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Numeric + Clone + Any + Send,
{
    sum_by(ByMapKey(key)).with_name("sum-by-map-key")
}

pub fn sum_all_1d<N: Numeric + Any + Send>() -> KernelOperator<SumAll1D<N>> {
    KernelOperator::new("sum-all-1d", SumAll1D::new())
}

pub fn sum_all_2d<N: Numeric + Any + Send>() -> KernelOperator<SumAll2D<N>> {
    KernelOperator::new("sum-all-2d", SumAll2D::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Order {
        sku: &'static str,
        total: f64,
    }

    #[test]
    fn test_sum_nested() {
        let rows = vec![vec![10, 70, 20], vec![40, 60, 90], vec![0, 80, 30]];
        assert_eq!(sum_nested(&rows), 400.0);
        assert_eq!(sum_nested::<i32>(&[]), 0.0);
    }

    #[test]
    fn test_sum_by_index_ignores_short_rows() {
        let rows = vec![vec![1.5, 2.0], vec![3.0], vec![0.0, 4.0]];
        assert_eq!(sum_rows(&rows, &ByIndex(1)), 6.0);
    }

    #[test]
    fn test_sum_by_field() {
        let orders = vec![
            Order { sku: "a", total: 2.5 },
            Order { sku: "b", total: 7.5 },
        ];
        assert_eq!(sum_rows(&orders, &ByField::new("total")), 10.0);
        assert_eq!(sum_rows(&orders, &ByField::new("sku")), 0.0);
    }

    #[test]
    fn test_sum_skips_non_numeric_json() {
        let values = vec![json!(1), json!("two"), json!(3.5), json!(null)];
        assert_eq!(sum_values(&values), 4.5);
    }

    #[test]
    fn test_sum_by_map_key() {
        let rows: Vec<HashMap<&str, u32>> = vec![
            [("bytes", 100), ("count", 1)].into_iter().collect(),
            [("count", 2)].into_iter().collect(),
            [("bytes", 50)].into_iter().collect(),
        ];
        assert_eq!(sum_rows(&rows, &ByMapKey("bytes")), 150.0);
    }

    #[tokio::test]
    async fn test_sum_all_2d_kernel() {
        let ctx = OperatorContext::detached("sum");
        let outcome = SumAll2D::<u8>::new().apply(&ctx, vec![vec![1, 2], vec![3]]).await;
        let total = outcome.into_items().remove(0).downcast::<f64>().unwrap();
        assert_eq!(total, 6.0);
    }
}
