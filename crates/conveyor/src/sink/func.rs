use super::{downcast_input, spawn_consumer, Consume, Sink};
use crate::channel::ItemReceiver;
use crate::completion::Completion;
use crate::error::{BoxError, PipelineError, Result};
use crate::item::Item;
use crate::log::LogEmitter;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use tokio_util::sync::CancellationToken;

type SinkFn<T> = Box<dyn FnMut(T) -> std::result::Result<(), BoxError> + Send>;

/// Calls a function for every item; an error ends the sink with that error
pub struct FnSink<T> {
    name: String,
    func: Option<SinkFn<T>>,
    input: Option<ItemReceiver>,
    log: LogEmitter,
}

impl<T: Any + Send> FnSink<T> {
    pub fn new<F, E>(mut func: F) -> Self
    where
        F: FnMut(T) -> std::result::Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: "fn-sink".to_string(),
            func: Some(Box::new(move |value: T| -> std::result::Result<(), BoxError> {
                func(value).map_err(Into::into)
            })),
            input: None,
            log: LogEmitter::disabled(),
        }
    }

    /// A sink around an infallible function
    pub fn each<F>(mut func: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self::new(move |value| {
            func(value);
            Ok::<(), BoxError>(())
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

struct Caller<T> {
    func: SinkFn<T>,
}

#[async_trait]
impl<T: Any + Send> Consume for Caller<T> {
    type Input = T;

    fn accept(&self, item: Item) -> std::result::Result<T, Item> {
        downcast_input(item)
    }

    async fn consume(&mut self, value: T) -> Result<()> {
        (self.func)(value).map_err(PipelineError::execution)
    }
}

impl<T: Any + Send> Sink for FnSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_input(&mut self, input: ItemReceiver) {
        self.input = Some(input);
    }

    fn set_log_sink(&mut self, log: LogEmitter) {
        self.log = log;
    }

    fn open(&mut self, cancel: CancellationToken) -> Completion {
        let Some(func) = self.func.take() else {
            return Completion::ready(Err(PipelineError::SinkDestinationUndefined));
        };
        spawn_consumer(
            self.name.clone(),
            Caller { func },
            self.input.take(),
            self.log.clone(),
            cancel,
        )
    }
}

impl<T> fmt::Debug for FnSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").field("name", &self.name).finish()
    }
}

/// Drains its input and drops every item, whatever its type
#[derive(Debug)]
pub struct DiscardSink {
    name: String,
    input: Option<ItemReceiver>,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self {
            name: "discard-sink".to_string(),
            input: None,
        }
    }
}

impl Default for DiscardSink {
    fn default() -> Self {
        Self::new()
    }
}

struct Discard;

#[async_trait]
impl Consume for Discard {
    type Input = Item;

    fn accept(&self, item: Item) -> std::result::Result<Item, Item> {
        Ok(item)
    }

    async fn consume(&mut self, _item: Item) -> Result<()> {
        Ok(())
    }
}

impl Sink for DiscardSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_input(&mut self, input: ItemReceiver) {
        self.input = Some(input);
    }

    fn open(&mut self, cancel: CancellationToken) -> Completion {
        spawn_consumer(
            self.name.clone(),
            Discard,
            self.input.take(),
            LogEmitter::disabled(),
            cancel,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::item_channel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fn_sink_calls_function() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut sink = FnSink::each(move |len: usize| {
            counter.fetch_add(len, Ordering::SeqCst);
        });

        let (tx, rx) = item_channel(4);
        sink.set_input(rx);
        let completion = sink.open(CancellationToken::new());
        tx.send(Item::new(3usize)).await.unwrap();
        tx.send(Item::new(4usize)).await.unwrap();
        drop(tx);

        completion.await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_fn_sink_error_is_terminal() {
        let mut sink = FnSink::new(|line: String| {
            if line.is_empty() {
                Err("empty line")
            } else {
                Ok(())
            }
        });

        let (tx, rx) = item_channel(4);
        sink.set_input(rx);
        let completion = sink.open(CancellationToken::new());
        tx.send(Item::new(String::new())).await.unwrap();

        let err = completion.await.unwrap_err();
        assert!(err.to_string().contains("empty line"));
    }

    #[tokio::test]
    async fn test_discard_sink_accepts_anything() {
        let mut sink = DiscardSink::new();
        let (tx, rx) = item_channel(4);
        sink.set_input(rx);
        let completion = sink.open(CancellationToken::new());
        tx.send(Item::new(1u8)).await.unwrap();
        tx.send(Item::new("two")).await.unwrap();
        drop(tx);
        assert!(completion.await.is_ok());
    }
}
