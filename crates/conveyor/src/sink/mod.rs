//! Sinks: the terminal stage of a stream
//!
//! A sink consumes its input until the channel closes (success) or the
//! stream is cancelled, and reports exactly one result through the
//! [`Completion`] returned by `open`.

mod collect;
mod func;
mod log_sink;
mod writer;

pub use collect::{CollectSink, Collected};
pub use func::{DiscardSink, FnSink};
pub use log_sink::TracingSink;
pub use writer::{CsvSink, WriterSink};

use crate::channel::{recv_item, ItemReceiver, Recv};
use crate::completion::Completion;
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::{LogEmitter, LogEvent};
use async_trait::async_trait;
use std::any::{type_name, Any};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Consumer stage at the end of a stream
pub trait Sink: Send {
    fn name(&self) -> &str {
        "sink"
    }

    /// Wire the read side of the last stage's output
    fn set_input(&mut self, input: ItemReceiver);

    /// Install the log bus emitter; sinks that never log may ignore it
    fn set_log_sink(&mut self, _log: LogEmitter) {}

    /// Start consuming in the background
    ///
    /// Configuration problems resolve the completion immediately.
    fn open(&mut self, cancel: CancellationToken) -> Completion;
}

/// Per-item behaviour plugged into the shared consumption loop
#[async_trait]
pub(crate) trait Consume: Send + 'static {
    type Input: Send;

    /// Extract the typed value, or give the item back on a type mismatch
    fn accept(&self, item: Item) -> std::result::Result<Self::Input, Item>;

    async fn consume(&mut self, value: Self::Input) -> Result<()>;

    /// Called once after the input closed
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Accept items holding exactly `T`
pub(crate) fn downcast_input<T: Any>(item: Item) -> std::result::Result<T, Item> {
    item.downcast::<T>()
}

/// Run `consumer` over `input` on a new task
pub(crate) fn spawn_consumer<C: Consume>(
    name: String,
    consumer: C,
    input: Option<ItemReceiver>,
    log: LogEmitter,
    cancel: CancellationToken,
) -> Completion {
    let Some(input) = input else {
        return Completion::ready(Err(PipelineError::InputChannelUndefined));
    };

    let (done, completion) = Completion::channel();
    tokio::spawn(async move {
        let result = drive(&name, consumer, input, &log, &cancel).await;
        match &result {
            Ok(()) => debug!(sink = %name, "sink finished"),
            Err(err) => debug!(sink = %name, error = %err, "sink stopped"),
        }
        let _ = done.send(result);
    });
    completion
}

async fn drive<C: Consume>(
    name: &str,
    mut consumer: C,
    mut input: ItemReceiver,
    log: &LogEmitter,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut consumed = 0u64;
    loop {
        let item = match recv_item(&mut input, cancel).await {
            Recv::Item(item) => item,
            Recv::Closed => break,
            Recv::Cancelled => return Err(PipelineError::Cancelled),
        };

        let value = match consumer.accept(item) {
            Ok(value) => value,
            Err(item) => {
                let expected = type_name::<C::Input>();
                trace!(sink = name, expected, received = item.type_name(), "type mismatch");
                log.emit(LogEvent::type_mismatch(expected, item.type_name()));
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = consumer.consume(value) => result?,
        }
        consumed += 1;
    }

    trace!(sink = name, consumed, "input closed");
    consumer.finish().await
}
