//! Log bus: a non-blocking side channel for structured stream events
//!
//! Every stage receives a [`LogEmitter`]. Emission never waits: when the bus
//! is full, closed, or the pipeline is cancelled the event is dropped, so
//! logging can never stall the data path. Events are relayed to an ordinary
//! sink (the log sink) that the stream opens alongside the data pipeline.
//!
//! Engine lifecycle messages go through `tracing` instead; the bus only
//! carries events meant for the user's log sink.

use crate::channel::{ItemSender, DEFAULT_CHANNEL_CAPACITY};
use crate::item::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Default capacity of the log bus
pub const DEFAULT_LOG_CAPACITY: usize = DEFAULT_CHANNEL_CAPACITY;

/// Severity of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Structured event seen by the log sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,

    /// Ordered key/value attributes
    #[serde(default)]
    pub attributes: Vec<(String, serde_json::Value)>,

    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            attributes: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Append an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Event reported when a stage drops an item of the wrong type
    pub fn type_mismatch(expected: &str, received: &str) -> Self {
        Self::debug("type mismatch, item dropped")
            .with_attr("expected", expected)
            .with_attr("received", received)
    }

    /// Look up the first attribute with this key
    pub fn attr(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5} {}",
            self.timestamp.to_rfc3339(),
            self.level,
            self.message
        )?;
        for (key, value) in &self.attributes {
            match value {
                serde_json::Value::String(s) => write!(f, " {}={}", key, s)?,
                other => write!(f, " {}={}", key, other)?,
            }
        }
        Ok(())
    }
}

struct EmitterInner {
    tx: mpsc::Sender<LogEvent>,
    cancel: CancellationToken,
}

/// Handle used by stages to publish events on the log bus
///
/// Cloning is cheap. A disabled emitter (the default) drops everything.
#[derive(Clone, Default)]
pub struct LogEmitter {
    inner: Option<Arc<EmitterInner>>,
    stage: Option<Arc<str>>,
}

impl LogEmitter {
    /// An emitter that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Same bus, with every event tagged by the given stage name
    pub fn scoped(&self, stage: impl Into<Arc<str>>) -> Self {
        Self {
            inner: self.inner.clone(),
            stage: Some(stage.into()),
        }
    }

    /// Stage this emitter is scoped to
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Publish an event without waiting; returns whether it was accepted
    pub fn emit(&self, event: LogEvent) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };
        if inner.cancel.is_cancelled() {
            return false;
        }

        let event = match &self.stage {
            Some(stage) => {
                let mut event = event;
                event
                    .attributes
                    .insert(0, ("stage".to_string(), serde_json::Value::from(stage.as_ref())));
                event
            }
            None => event,
        };

        match inner.tx.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                trace!(error = %err, "log event dropped");
                false
            }
        }
    }
}

impl fmt::Debug for LogEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEmitter")
            .field("enabled", &self.is_enabled())
            .field("stage", &self.stage)
            .finish()
    }
}

/// Receiving end of the log bus, forwarding events into the log sink's input
pub(crate) struct LogRelay {
    rx: mpsc::Receiver<LogEvent>,
    close: CancellationToken,
}

/// Create a log bus; events are dropped once `cancel` fires
pub(crate) fn log_bus(capacity: usize, cancel: CancellationToken) -> (LogEmitter, LogRelay) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let emitter = LogEmitter {
        inner: Some(Arc::new(EmitterInner { tx, cancel })),
        stage: None,
    };
    let relay = LogRelay {
        rx,
        close: CancellationToken::new(),
    };
    (emitter, relay)
}

impl LogRelay {
    /// Token that closes the bus: no more events are accepted, buffered ones drain
    pub(crate) fn closer(&self) -> CancellationToken {
        self.close.clone()
    }

    /// Forward events until the bus is closed, then drain and close `output`
    pub(crate) fn spawn(self, output: ItemSender) -> JoinHandle<()> {
        let LogRelay { mut rx, close } = self;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = close.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => {
                            if output.send(Item::new(event)).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    },
                }
            }

            rx.close();
            while let Some(event) = rx.recv().await {
                if output.send(Item::new(event)).await.is_err() {
                    break;
                }
            }
            trace!("log bus drained");
        })
    }
}
