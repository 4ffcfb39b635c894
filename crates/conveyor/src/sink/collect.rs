use super::{downcast_input, spawn_consumer, Consume, Sink};
use crate::channel::ItemReceiver;
use crate::completion::Completion;
use crate::error::Result;
use crate::item::Item;
use crate::log::LogEmitter;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared view of the values gathered by a [`CollectSink`]
pub struct Collected<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Collected<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
        }
    }
}

impl<T> Collected<T> {
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Move the gathered values out, leaving the collection empty
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.lock())
    }

    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.values.lock().clone()
    }
}

impl<T> fmt::Debug for Collected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collected").field("len", &self.len()).finish()
    }
}

/// Collects every item of type `T`, in arrival order
pub struct CollectSink<T> {
    name: String,
    collected: Collected<T>,
    input: Option<ItemReceiver>,
    log: LogEmitter,
}

impl<T: Any + Send> CollectSink<T> {
    pub fn new() -> Self {
        Self {
            name: "collect-sink".to_string(),
            collected: Collected {
                values: Arc::new(Mutex::new(Vec::new())),
            },
            input: None,
            log: LogEmitter::disabled(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Handle to the gathered values, valid after the sink is moved into a stream
    pub fn collected(&self) -> Collected<T> {
        self.collected.clone()
    }
}

impl<T: Any + Send> Default for CollectSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Collector<T> {
    values: Arc<Mutex<Vec<T>>>,
}

#[async_trait]
impl<T: Any + Send> Consume for Collector<T> {
    type Input = T;

    fn accept(&self, item: Item) -> std::result::Result<T, Item> {
        downcast_input(item)
    }

    async fn consume(&mut self, value: T) -> Result<()> {
        self.values.lock().push(value);
        Ok(())
    }
}

impl<T: Any + Send> Sink for CollectSink<T> {
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
        let collector = Collector {
            values: self.collected.values.clone(),
        };
        spawn_consumer(
            self.name.clone(),
            collector,
            self.input.take(),
            self.log.clone(),
            cancel,
        )
    }
}

impl<T> fmt::Debug for CollectSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectSink")
            .field("name", &self.name)
            .field("collected", &self.collected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::item_channel;

    #[tokio::test]
    async fn test_collects_in_order() {
        let mut sink = CollectSink::<u32>::new();
        let collected = sink.collected();
        let (tx, rx) = item_channel(4);
        sink.set_input(rx);
        let completion = sink.open(CancellationToken::new());

        for i in 0..3u32 {
            tx.send(Item::new(i)).await.unwrap();
        }
        drop(tx);

        completion.await.unwrap();
        assert_eq!(collected.snapshot(), vec![0, 1, 2]);
        assert_eq!(collected.take(), vec![0, 1, 2]);
        assert!(collected.is_empty());
    }
}
