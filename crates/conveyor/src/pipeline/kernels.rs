//! Per-item operator kernels
//!
//! Each kernel is a small struct wrapping a user function; the free
//! functions at the bottom build a ready-to-run [`KernelOperator`] for it.

use crate::context::OperatorContext;
use crate::item::{Item, Pair};
use crate::pipeline::operator::{Kernel, KernelOperator};
use crate::pipeline::outcome::{FilterOutcome, IntoOutcome, Outcome};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::marker::PhantomData;

/// One-to-one transformation; the result is always forwarded
pub struct Map<F, T, U> {
    func: F,
    _phantom: PhantomData<fn(T) -> U>,
}

impl<F, T, U> Map<F, T, U>
where
    F: Fn(T) -> U + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, U> Kernel for Map<F, T, U>
where
    F: Fn(T) -> U + Send + Sync + 'static,
    T: Any + Send,
    U: Any + Send,
{
    type Input = T;

    async fn apply(&self, _ctx: &OperatorContext, input: T) -> Outcome {
        Outcome::forward((self.func)(input))
    }
}

/// Keeps the items matching a predicate
pub struct Filter<F, T> {
    predicate: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> Filter<F, T>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Kernel for Filter<F, T>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
    T: Any + Send,
{
    type Input = T;

    async fn apply(&self, _ctx: &OperatorContext, input: T) -> Outcome {
        FilterOutcome::new((self.predicate)(&input), input).into_outcome()
    }
}

/// One-to-many transformation; every produced element is forwarded in order
pub struct FlatMap<F, T, I> {
    func: F,
    _phantom: PhantomData<fn(T) -> I>,
}

impl<F, T, I> FlatMap<F, T, I>
where
    F: Fn(T) -> I + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, I> Kernel for FlatMap<F, T, I>
where
    F: Fn(T) -> I + Send + Sync + 'static,
    T: Any + Send,
    I: IntoIterator + 'static,
    I::Item: Any + Send,
{
    type Input = T;

    async fn apply(&self, _ctx: &OperatorContext, input: T) -> Outcome {
        Outcome::expand((self.func)(input).into_iter().map(Item::new).collect())
    }
}

/// General-purpose kernel returning any result shape
///
/// `R` may be an `Option`, a `FilterOutcome`, a `StreamResult`, a `Result`
/// or a prepared `Outcome`.
pub struct Execute<F, T, R> {
    func: F,
    _phantom: PhantomData<fn(T) -> R>,
}

impl<F, T, R> Execute<F, T, R>
where
    F: Fn(&OperatorContext, T) -> R + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, R> Kernel for Execute<F, T, R>
where
    F: Fn(&OperatorContext, T) -> R + Send + Sync + 'static,
    T: Any + Send,
    R: IntoOutcome + 'static,
{
    type Input = T;

    async fn apply(&self, ctx: &OperatorContext, input: T) -> Outcome {
        (self.func)(ctx, input).into_outcome()
    }
}

/// Asynchronous general-purpose kernel, for I/O bound work such as HTTP
/// calls or database queries
pub struct ExecuteAsync<F, T, Fut> {
    func: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> ExecuteAsync<F, T, Fut>
where
    F: Fn(OperatorContext, T) -> Fut + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, Fut> Kernel for ExecuteAsync<F, T, Fut>
where
    F: Fn(OperatorContext, T) -> Fut + Send + Sync + 'static,
    T: Any + Send,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutcome,
{
    type Input = T;

    async fn apply(&self, ctx: &OperatorContext, input: T) -> Outcome {
        (self.func)(ctx.clone(), input).await.into_outcome()
    }
}

/// Publishes every element of a `Vec<T>` individually
///
/// Anything that is not a `Vec<T>` is forwarded unchanged.
pub struct RestreamSlice<T> {
    _phantom: PhantomData<fn(T)>,
}

impl<T> RestreamSlice<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for RestreamSlice<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Any + Send> Kernel for RestreamSlice<T> {
    type Input = Vec<T>;

    async fn apply(&self, _ctx: &OperatorContext, input: Vec<T>) -> Outcome {
        Outcome::expand(input.into_iter().map(Item::new).collect())
    }

    fn on_mismatch(&self, item: Item) -> std::result::Result<Outcome, Item> {
        Ok(Outcome::forward_item(item))
    }
}

/// Publishes every entry of a `HashMap<K, V>` as a [`Pair`]
pub struct RestreamMap<K, V> {
    _phantom: PhantomData<fn(K, V)>,
}

impl<K, V> RestreamMap<K, V> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<K, V> Default for RestreamMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Kernel for RestreamMap<K, V>
where
    K: Any + Send + Eq + Hash,
    V: Any + Send,
{
    type Input = HashMap<K, V>;

    async fn apply(&self, _ctx: &OperatorContext, input: HashMap<K, V>) -> Outcome {
        Outcome::expand(
            input
                .into_iter()
                .map(|(key, value)| Item::new(Pair::new(key, value)))
                .collect(),
        )
    }
}

pub fn map<F, T, U>(func: F) -> KernelOperator<Map<F, T, U>>
where
    F: Fn(T) -> U + Send + Sync + 'static,
    T: Any + Send,
    U: Any + Send,
{
    KernelOperator::new("map", Map::new(func))
}

pub fn filter<F, T>(predicate: F) -> KernelOperator<Filter<F, T>>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
    T: Any + Send,
{
    KernelOperator::new("filter", Filter::new(predicate))
}

pub fn flat_map<F, T, I>(func: F) -> KernelOperator<FlatMap<F, T, I>>
where
    F: Fn(T) -> I + Send + Sync + 'static,
    T: Any + Send,
    I: IntoIterator + 'static,
    I::Item: Any + Send,
{
    KernelOperator::new("flat-map", FlatMap::new(func))
}

pub fn execute<F, T, R>(func: F) -> KernelOperator<Execute<F, T, R>>
where
    F: Fn(&OperatorContext, T) -> R + Send + Sync + 'static,
    T: Any + Send,
    R: IntoOutcome + 'static,
{
    KernelOperator::new("execute", Execute::new(func))
}

pub fn execute_async<F, T, Fut>(func: F) -> KernelOperator<ExecuteAsync<F, T, Fut>>
where
    F: Fn(OperatorContext, T) -> Fut + Send + Sync + 'static,
    T: Any + Send,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutcome,
{
    KernelOperator::new("execute-async", ExecuteAsync::new(func))
}

pub fn restream_slice<T: Any + Send>() -> KernelOperator<RestreamSlice<T>> {
    KernelOperator::new("restream-slice", RestreamSlice::new())
}

pub fn restream_map<K, V>() -> KernelOperator<RestreamMap<K, V>>
where
    K: Any + Send + Eq + Hash,
    V: Any + Send,
{
    KernelOperator::new("restream-map", RestreamMap::new())
}
