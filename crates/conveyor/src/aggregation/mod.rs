//! Window kernels: grouping, summing and sorting
//!
//! These kernels consume the `Vec<T>` windows produced by the
//! [`window`](crate::window) operators. Each one is available three ways:
//!
//! - as a plain function over a slice (`group_rows`, `sum_nested`, ...)
//! - as a [`Kernel`](crate::pipeline::Kernel) struct (`GroupBy`, `SumAll2D`, ...)
//! - as a ready operator constructor (`group_by_map_key`, `sum_all_2d`, ...)
//!
//! Keyed variants are generic over a [`Keying`] strategy: [`ByIndex`],
//! [`ByField`] or [`ByMapKey`].
//!
//! # Examples
//!
//! ```rust
//! use conveyor::aggregation::{sort_values, sum_nested};
//!
//! let rows = vec![vec![10, 70, 20], vec![40, 60, 90], vec![0, 80, 30]];
//! assert_eq!(sum_nested(&rows), 400.0);
//!
//! let mut values = vec![3.0, 1.0, 2.0];
//! sort_values(&mut values);
//! assert_eq!(values, vec![1.0, 2.0, 3.0]);
//! ```

pub mod group;
pub mod keying;
pub mod numeric;
pub mod record;
pub mod sort;
pub mod sum;

pub use group::{
    group_by, group_by_field, group_by_index, group_by_map_key, group_rows, GroupBy,
    GroupByField, GroupByIndex, GroupByMapKey,
};
pub use keying::{ByField, ByIndex, ByMapKey, Keying};
pub use numeric::Numeric;
pub use record::{field, to_record, FieldKey};
pub use sort::{
    compare_partial, sort_by, sort_by_field, sort_by_map_key, sort_rows, sort_slice,
    sort_slice_by_index, sort_values, sort_values_by, sort_with_func, SortBy, SortByField,
    SortByMapKey, SortSlice, SortSliceByIndex, SortWithFunc,
};
pub use sum::{
    sum_all_1d, sum_all_2d, sum_by, sum_by_field, sum_by_index, sum_by_map_key, sum_nested,
    sum_rows, sum_values, SumAll1D, SumAll2D, SumBy, SumByField, SumByIndex, SumByMapKey,
};
