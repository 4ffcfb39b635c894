use super::{downcast_input, spawn_consumer, Consume, Sink};
use crate::channel::ItemReceiver;
use crate::completion::Completion;
use crate::error::Result;
use crate::item::Item;
use crate::log::{LogEvent, LogLevel};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Log sink re-emitting stream events through `tracing`
///
/// Attributes are attached as a single JSON object field, `attributes`.
#[derive(Debug)]
pub struct TracingSink {
    name: String,
    min_level: LogLevel,
    input: Option<ItemReceiver>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self {
            name: "tracing-sink".to_string(),
            min_level: LogLevel::Debug,
            input: None,
        }
    }

    /// Ignore events below `level`
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

struct Relay {
    min_level: LogLevel,
}

#[async_trait]
impl Consume for Relay {
    type Input = LogEvent;

    fn accept(&self, item: Item) -> std::result::Result<LogEvent, Item> {
        downcast_input(item)
    }

    async fn consume(&mut self, event: LogEvent) -> Result<()> {
        if event.level < self.min_level {
            return Ok(());
        }

        let attributes = serde_json::Value::Object(event.attributes.into_iter().collect());
        let message = event.message;
        match event.level {
            LogLevel::Debug => debug!(target: "conveyor::stream", %attributes, "{}", message),
            LogLevel::Info => info!(target: "conveyor::stream", %attributes, "{}", message),
            LogLevel::Warn => warn!(target: "conveyor::stream", %attributes, "{}", message),
            LogLevel::Error => error!(target: "conveyor::stream", %attributes, "{}", message),
        }
        Ok(())
    }
}

impl Sink for TracingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_input(&mut self, input: ItemReceiver) {
        self.input = Some(input);
    }

    fn open(&mut self, cancel: CancellationToken) -> Completion {
        let relay = Relay {
            min_level: self.min_level,
        };
        spawn_consumer(
            self.name.clone(),
            relay,
            self.input.take(),
            crate::log::LogEmitter::disabled(),
            cancel,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::item_channel;

    #[tokio::test]
    async fn test_tracing_sink_consumes_events() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut sink = TracingSink::new().with_min_level(LogLevel::Info);
        let (tx, rx) = item_channel(4);
        sink.set_input(rx);
        let completion = sink.open(CancellationToken::new());

        tx.send(Item::new(LogEvent::debug("filtered out"))).await.unwrap();
        tx.send(Item::new(LogEvent::warn("item error").with_attr("stage", "parse")))
            .await
            .unwrap();
        drop(tx);

        assert!(completion.await.is_ok());
    }
}
