use super::{downcast_input, spawn_consumer, Consume, Sink};
use crate::channel::ItemReceiver;
use crate::completion::Completion;
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::LogEmitter;
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use std::fmt::{self, Display};
use std::io::Write;
use std::marker::PhantomData;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Writes every item as one line of text
pub struct WriterSink<W, T> {
    name: String,
    writer: Option<W>,
    input: Option<ItemReceiver>,
    log: LogEmitter,
    _phantom: PhantomData<fn(T)>,
}

impl<W, T> WriterSink<W, T>
where
    W: AsyncWrite + Unpin + Send + 'static,
    T: Display + Any + Send,
{
    pub fn new(writer: W) -> Self {
        let mut sink = Self::unwired();
        sink.writer = Some(writer);
        sink
    }

    /// A sink whose destination is set later with [`WriterSink::set_writer`]
    pub fn unwired() -> Self {
        Self {
            name: "writer-sink".to_string(),
            writer: None,
            input: None,
            log: LogEmitter::disabled(),
            _phantom: PhantomData,
        }
    }

    pub fn set_writer(&mut self, writer: W) {
        self.writer = Some(writer);
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

struct LineWriter<W, T> {
    writer: W,
    _phantom: PhantomData<fn(T)>,
}

#[async_trait]
impl<W, T> Consume for LineWriter<W, T>
where
    W: AsyncWrite + Unpin + Send + 'static,
    T: Display + Any + Send,
{
    type Input = T;

    fn accept(&self, item: Item) -> std::result::Result<T, Item> {
        downcast_input(item)
    }

    async fn consume(&mut self, value: T) -> Result<()> {
        let line = format!("{}\n", value);
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

impl<W, T> Sink for WriterSink<W, T>
where
    W: AsyncWrite + Unpin + Send + 'static,
    T: Display + Any + Send,
{
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
        let Some(writer) = self.writer.take() else {
            return Completion::ready(Err(PipelineError::SinkDestinationUndefined));
        };
        let consumer = LineWriter::<W, T> {
            writer,
            _phantom: PhantomData,
        };
        spawn_consumer(self.name.clone(), consumer, self.input.take(), self.log.clone(), cancel)
    }
}

impl<W, T> fmt::Debug for WriterSink<W, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink")
            .field("name", &self.name)
            .field("wired", &self.writer.is_some())
            .finish()
    }
}

/// Writes serializable rows as CSV records
///
/// Rows may be `Vec<String>`, tuples or structs. With headers enabled, a
/// struct's field names are written before its first record. Writes happen
/// on the sink task, so the writer should be buffered or in memory.
pub struct CsvSink<W, T> {
    name: String,
    writer: Option<W>,
    has_headers: bool,
    delimiter: u8,
    input: Option<ItemReceiver>,
    log: LogEmitter,
    _phantom: PhantomData<fn(T)>,
}

impl<W, T> CsvSink<W, T>
where
    W: Write + Send + 'static,
    T: Serialize + Any + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            name: "csv-sink".to_string(),
            writer: Some(writer),
            has_headers: false,
            delimiter: b',',
            input: None,
            log: LogEmitter::disabled(),
            _phantom: PhantomData,
        }
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

struct RecordWriter<W: Write, T> {
    writer: ::csv::Writer<W>,
    _phantom: PhantomData<fn(T)>,
}

#[async_trait]
impl<W, T> Consume for RecordWriter<W, T>
where
    W: Write + Send + 'static,
    T: Serialize + Any + Send,
{
    type Input = T;

    fn accept(&self, item: Item) -> std::result::Result<T, Item> {
        downcast_input(item)
    }

    async fn consume(&mut self, value: T) -> Result<()> {
        self.writer.serialize(value)?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W, T> Sink for CsvSink<W, T>
where
    W: Write + Send + 'static,
    T: Serialize + Any + Send,
{
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
        let Some(writer) = self.writer.take() else {
            return Completion::ready(Err(PipelineError::SinkDestinationUndefined));
        };
        let writer = ::csv::WriterBuilder::new()
            .has_headers(self.has_headers)
            .delimiter(self.delimiter)
            .from_writer(writer);
        let consumer = RecordWriter::<W, T> {
            writer,
            _phantom: PhantomData,
        };
        spawn_consumer(self.name.clone(), consumer, self.input.take(), self.log.clone(), cancel)
    }
}

impl<W, T> fmt::Debug for CsvSink<W, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvSink")
            .field("name", &self.name)
            .field("has_headers", &self.has_headers)
            .field("wired", &self.writer.is_some())
            .finish()
    }
}
