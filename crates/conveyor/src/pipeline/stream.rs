//! Stream orchestrator
//!
//! A [`Stream`] is a linear pipeline: one source, zero or more operators in
//! declaration order, and one sink, plus an optional log sink fed by the
//! log bus. Opening a stream wires every stage's input to the previous
//! stage's output, starts the stages from source to sink, and supervises
//! them until the sink completes or the caller cancels.
//!
//! # Example
//!
//! ```rust,no_run
//! use conveyor::pipeline::{filter, map, Stream};
//! use conveyor::sink::CollectSink;
//! use conveyor::source::IterSource;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> conveyor::Result<()> {
//! let sink = CollectSink::<String>::new();
//! let collected = sink.collected();
//!
//! Stream::from_source(IterSource::new(vec!["hello", "world"]))
//!     .run(map(|s: &'static str| s.to_uppercase()))
//!     .run(filter(|s: &String| s.starts_with('H')))
//!     .into_sink(sink)
//!     .execute(&CancellationToken::new())
//!     .await?;
//!
//! assert_eq!(collected.take(), vec!["HELLO"]);
//! # Ok(())
//! # }
//! ```

use crate::channel::item_channel;
use crate::completion::{Completion, CompletionSender};
use crate::config::StreamConfig;
use crate::error::{PipelineError, Result};
use crate::log::{log_bus, LogEmitter, LogEvent};
use crate::pipeline::operator::Operator;
use crate::sink::Sink;
use crate::source::Source;
use std::fmt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Linear pipeline of a source, operators and a sink
pub struct Stream {
    config: StreamConfig,
    source: Option<Box<dyn Source>>,
    operators: Vec<Box<dyn Operator>>,
    sink: Option<Box<dyn Sink>>,
    log_sink: Option<Box<dyn Sink>>,
    opened: bool,
}

impl Stream {
    /// An empty stream; set at least a source and a sink before opening
    pub fn new() -> Self {
        Self {
            config: StreamConfig::default(),
            source: None,
            operators: Vec::new(),
            sink: None,
            log_sink: None,
            opened: false,
        }
    }

    /// Start a stream from `source`
    pub fn from_source(source: impl Source + 'static) -> Self {
        Self::new().with_source(source)
    }

    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Append an operator after the ones already added
    pub fn run(mut self, operator: impl Operator + 'static) -> Self {
        self.operators.push(Box::new(operator));
        self
    }

    /// Append several operators, in order
    pub fn run_boxed(mut self, operators: impl IntoIterator<Item = Box<dyn Operator>>) -> Self {
        self.operators.extend(operators);
        self
    }

    /// Terminate the stream in `sink`
    pub fn into_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Route log bus events to `sink`
    pub fn with_log_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.log_sink = Some(Box::new(sink));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Capacity of the log bus
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Number of operators between source and sink
    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    /// Start the stream and return its completion handle
    ///
    /// The completion yields exactly one result: `Ok(())` when the sink
    /// drained its input, the first stage error, or
    /// [`PipelineError::Cancelled`] when `cancel` fires first. Must be called
    /// from within a Tokio runtime.
    pub fn open(&mut self, cancel: &CancellationToken) -> Completion {
        let (done, completion) = Completion::channel();

        let stages = match self.take_stages() {
            Ok(stages) => stages,
            Err(err) => {
                warn!(stream = %self.config.name, error = %err, "stream rejected");
                let _ = done.send(Err(err));
                return completion;
            }
        };

        let name = self.config.name.clone();
        let token = cancel.child_token();
        let log = stages
            .log_sink
            .map(|sink| LogPipeline::start(sink, self.config.log_capacity, &token));
        let emitter = log
            .as_ref()
            .map(|log| log.emitter.clone())
            .unwrap_or_default();

        info!(stream = %name, operators = stages.operators.len(), "opening stream");
        let started = start(stages.source, stages.operators, stages.sink, &emitter, &token);

        tokio::spawn(supervise(
            name,
            cancel.clone(),
            token,
            started,
            emitter,
            log,
            done,
        ));

        completion
    }

    /// Open the stream and wait for its completion
    pub async fn execute(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.open(cancel).await
    }

    fn take_stages(&mut self) -> Result<Stages> {
        if self.opened {
            return Err(PipelineError::StreamEmpty);
        }
        self.config.validate()?;
        if self.source.is_none() {
            return Err(PipelineError::SourceEmpty);
        }
        if self.sink.is_none() {
            return Err(PipelineError::SinkEmpty);
        }

        let (Some(source), Some(sink)) = (self.source.take(), self.sink.take()) else {
            return Err(PipelineError::StreamEmpty);
        };
        self.opened = true;

        Ok(Stages {
            source,
            operators: std::mem::take(&mut self.operators),
            sink,
            log_sink: self.log_sink.take(),
        })
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operators: Vec<&str> = self.operators.iter().map(|op| op.name()).collect();
        f.debug_struct("Stream")
            .field("config", &self.config)
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("operators", &operators)
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field("log_sink", &self.log_sink.as_ref().map(|s| s.name()))
            .field("opened", &self.opened)
            .finish()
    }
}

struct Stages {
    source: Box<dyn Source>,
    operators: Vec<Box<dyn Operator>>,
    sink: Box<dyn Sink>,
    log_sink: Option<Box<dyn Sink>>,
}

/// Log bus plus the sink draining it
struct LogPipeline {
    emitter: LogEmitter,
    closer: CancellationToken,
    relay: JoinHandle<()>,
    completion: Completion,
}

impl LogPipeline {
    fn start(mut sink: Box<dyn Sink>, capacity: usize, stages: &CancellationToken) -> Self {
        let (emitter, relay) = log_bus(capacity, stages.clone());
        let (tx, rx) = item_channel(capacity);
        sink.set_input(rx);
        // the log sink keeps draining after the stages are cancelled
        let completion = sink.open(CancellationToken::new());
        let closer = relay.closer();
        let relay = relay.spawn(tx);
        Self {
            emitter,
            closer,
            relay,
            completion,
        }
    }

    /// Stop accepting events and wait until the log sink has drained them
    async fn close(self, stream: &str) {
        self.closer.cancel();
        if let Err(err) = self.relay.await {
            warn!(stream, error = %err, "log relay failed");
        }
        if let Err(err) = self.completion.await {
            warn!(stream, error = %err, "log sink failed");
        }
    }
}

/// Wire every stage and start them from source to sink
fn start(
    mut source: Box<dyn Source>,
    mut operators: Vec<Box<dyn Operator>>,
    mut sink: Box<dyn Sink>,
    log: &LogEmitter,
    token: &CancellationToken,
) -> Result<Completion> {
    let scope = source.name().to_string();
    source.set_log_sink(log.scoped(scope));
    let mut upstream = source.take_output().ok_or(PipelineError::SourceInputUndefined)?;

    for operator in operators.iter_mut() {
        let scope = operator.name().to_string();
        operator.set_input(upstream);
        operator.set_log_sink(log.scoped(scope));
        upstream = operator
            .take_output()
            .ok_or(PipelineError::InputChannelUndefined)?;
    }

    let scope = sink.name().to_string();
    sink.set_input(upstream);
    sink.set_log_sink(log.scoped(scope));

    source.open(token.clone())?;
    debug!(source = source.name(), "source opened");

    for operator in operators.iter_mut() {
        operator.exec(token.clone())?;
    }

    Ok(sink.open(token.clone()))
}

async fn supervise(
    name: String,
    cancel: CancellationToken,
    token: CancellationToken,
    started: Result<Completion>,
    emitter: LogEmitter,
    log: Option<LogPipeline>,
    done: CompletionSender,
) {
    let sink = match started {
        Ok(sink) => sink,
        Err(err) => {
            warn!(stream = %name, error = %err, "stream failed to start");
            token.cancel();
            let _ = done.send(Err(err));
            if let Some(log) = log {
                log.close(&name).await;
            }
            return;
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(stream = %name, "stream cancelled");
            let _ = done.send(Err(PipelineError::Cancelled));
            if let Some(log) = log {
                log.close(&name).await;
            }
        }
        result = sink => {
            match &result {
                Ok(()) => {
                    info!(stream = %name, "stream completed");
                    emitter.emit(LogEvent::info("stream completed"));
                }
                Err(err) => {
                    warn!(stream = %name, error = %err, "stream failed");
                    emitter.emit(LogEvent::error("stream failed").with_attr("error", err.to_string()));
                }
            }
            if let Some(log) = log {
                log.close(&name).await;
            }
            let _ = done.send(result);
        }
    }

    // release upstream stages still blocked after an early sink exit
    token.cancel();
}
