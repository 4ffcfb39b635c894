//! Sources: the first stage of a stream
//!
//! A source owns its output channel. `open` starts a background producer and
//! returns immediately; the producer closes the output when it is exhausted
//! or the stream is cancelled.

mod csv;
mod lines;

pub use self::csv::CsvSource;
pub use self::lines::{LinesSource, Tokenize};

use crate::channel::{send_item, ItemReceiver, ItemSender, Outlet, DEFAULT_CHANNEL_CAPACITY};
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::{LogEmitter, LogEvent};
use std::any::Any;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Producer stage feeding the first operator
pub trait Source: Send {
    fn name(&self) -> &str {
        "source"
    }

    /// Read side of the source's output, available once
    fn take_output(&mut self) -> Option<ItemReceiver>;

    /// Install the log bus emitter; sources that never log may ignore it
    fn set_log_sink(&mut self, _log: LogEmitter) {}

    /// Start producing in the background
    ///
    /// An error means the source cannot start and aborts the stream before
    /// any operator runs.
    fn open(&mut self, cancel: CancellationToken) -> Result<()>;
}

/// Output channel, capacity and log emitter shared by the bundled sources
#[derive(Debug)]
pub(crate) struct SourcePorts {
    pub(crate) name: String,
    pub(crate) capacity: usize,
    pub(crate) log: LogEmitter,
    output: Outlet,
}

impl SourcePorts {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            log: LogEmitter::disabled(),
            output: Outlet::default(),
        }
    }

    pub(crate) fn take_output(&mut self) -> Option<ItemReceiver> {
        self.output.receiver(self.capacity)
    }

    pub(crate) fn start(&mut self) -> Result<ItemSender> {
        self.output.sender(self.capacity).ok_or_else(|| {
            PipelineError::configuration(format!("source {} was already opened", self.name))
        })
    }
}

/// Emits every element of an iterator, then closes
///
/// Also serves as a generator source: an endless iterator produces until
/// the stream is cancelled.
pub struct IterSource<I> {
    iter: Option<I>,
    ports: SourcePorts,
}

impl<I> IterSource<I>
where
    I: IntoIterator + Send + 'static,
    I::IntoIter: Send,
    I::Item: Any + Send,
{
    pub fn new(iter: I) -> Self {
        Self {
            iter: Some(iter),
            ports: SourcePorts::new("iter-source"),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.ports.name = name.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.ports.capacity = capacity;
        self
    }
}

impl<I> Source for IterSource<I>
where
    I: IntoIterator + Send + 'static,
    I::IntoIter: Send,
    I::Item: Any + Send,
{
    fn name(&self) -> &str {
        &self.ports.name
    }

    fn take_output(&mut self) -> Option<ItemReceiver> {
        self.ports.take_output()
    }

    fn set_log_sink(&mut self, log: LogEmitter) {
        self.ports.log = log;
    }

    fn open(&mut self, cancel: CancellationToken) -> Result<()> {
        let iter = self.iter.take().ok_or(PipelineError::SourceInputUndefined)?;
        let output = self.ports.start()?;
        let log = self.ports.log.clone();
        let name = self.ports.name.clone();

        tokio::spawn(async move {
            let mut sent = 0u64;
            for value in iter {
                if !send_item(&output, Item::new(value), &cancel).await.is_sent() {
                    break;
                }
                sent += 1;
            }
            debug!(source = %name, sent, "source finished");
            log.emit(LogEvent::debug("source finished").with_attr("items", sent));
        });

        Ok(())
    }
}

impl<I> fmt::Debug for IterSource<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterSource").field("ports", &self.ports).finish()
    }
}

/// Forwards values from a caller-owned channel
///
/// The stream ends when every sender of the caller's channel is dropped.
pub struct ChannelSource<T> {
    input: Option<mpsc::Receiver<T>>,
    ports: SourcePorts,
}

impl<T: Any + Send> ChannelSource<T> {
    pub fn new(input: mpsc::Receiver<T>) -> Self {
        Self {
            input: Some(input),
            ports: SourcePorts::new("channel-source"),
        }
    }

    /// A source whose input is wired later with [`ChannelSource::set_receiver`]
    pub fn unwired() -> Self {
        Self {
            input: None,
            ports: SourcePorts::new("channel-source"),
        }
    }

    pub fn set_receiver(&mut self, input: mpsc::Receiver<T>) {
        self.input = Some(input);
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.ports.name = name.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.ports.capacity = capacity;
        self
    }
}

impl<T: Any + Send> Source for ChannelSource<T> {
    fn name(&self) -> &str {
        &self.ports.name
    }

    fn take_output(&mut self) -> Option<ItemReceiver> {
        self.ports.take_output()
    }

    fn set_log_sink(&mut self, log: LogEmitter) {
        self.ports.log = log;
    }

    fn open(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut input = self.input.take().ok_or(PipelineError::SourceInputUndefined)?;
        let output = self.ports.start()?;
        let name = self.ports.name.clone();

        tokio::spawn(async move {
            loop {
                let value = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    value = input.recv() => match value {
                        Some(value) => value,
                        None => break,
                    },
                };
                if !send_item(&output, Item::new(value), &cancel).await.is_sent() {
                    break;
                }
            }
            debug!(source = %name, "source finished");
        });

        Ok(())
    }
}

impl<T> fmt::Debug for ChannelSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSource")
            .field("wired", &self.input.is_some())
            .field("ports", &self.ports)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect<T: Any>(rx: &mut ItemReceiver) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(item) = rx.recv().await {
            values.push(item.downcast::<T>().unwrap());
        }
        values
    }

    #[tokio::test]
    async fn test_iter_source_emits_all_then_closes() {
        let mut source = IterSource::new(vec!["a", "b", "c"]);
        let mut out = source.take_output().unwrap();
        source.open(CancellationToken::new()).unwrap();
        assert_eq!(collect::<&str>(&mut out).await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_iter_source_opens_once() {
        let mut source = IterSource::new(0..3);
        let _out = source.take_output().unwrap();
        source.open(CancellationToken::new()).unwrap();
        assert!(matches!(
            source.open(CancellationToken::new()),
            Err(PipelineError::SourceInputUndefined)
        ));
    }

    #[tokio::test]
    async fn test_endless_iter_source_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let mut source = IterSource::new(0u64..).with_capacity(4);
        let mut out = source.take_output().unwrap();
        source.open(cancel.clone()).unwrap();

        let first = out.recv().await.unwrap().downcast::<u64>().unwrap();
        assert_eq!(first, 0);
        cancel.cancel();

        let mut remaining = 0;
        while out.recv().await.is_some() {
            remaining += 1;
        }
        assert!(remaining <= 4);
    }

    #[tokio::test]
    async fn test_channel_source_forwards_until_closed() {
        let (tx, rx) = mpsc::channel(8);
        let mut source = ChannelSource::new(rx);
        let mut out = source.take_output().unwrap();
        source.open(CancellationToken::new()).unwrap();

        for i in 0..3 {
            tx.send(i).await.unwrap();
        }
        drop(tx);
        assert_eq!(collect::<i32>(&mut out).await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_unwired_channel_source_fails_to_open() {
        let mut source = ChannelSource::<i32>::unwired();
        let err = source.open(CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceInputUndefined));
    }
}
