//! Operator runtime
//!
//! An operator owns one input channel (read side only), one output channel
//! (which it alone closes) and a [`Kernel`] applied to every input item by
//! `concurrency` workers. Workers share the input, so with more than one
//! worker the output order is not preserved.
//!
//! Shutdown is driven by a supervisor task: it waits for every worker to
//! observe end of input (or cancellation) and only then drops the last
//! output sender, closing the channel exactly once.

use crate::channel::{recv_shared, send_item, ItemReceiver, ItemSender, Outlet, Recv, SharedReceiver};
use crate::config::OperatorConfig;
use crate::context::OperatorContext;
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::{LogEmitter, LogEvent};
use crate::pipeline::outcome::{Directive, Outcome};
use crate::stats::OperatorStats;
use async_trait::async_trait;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// A stage between the source and the sink
pub trait Operator: Send {
    /// Operator name, used to scope log events
    fn name(&self) -> &str;

    /// Wire the read side of the upstream stage's output
    fn set_input(&mut self, input: ItemReceiver);

    /// Hand out the read side of this operator's output
    ///
    /// Returns `None` once the receiver has been taken.
    fn take_output(&mut self) -> Option<ItemReceiver>;

    /// Install the log bus emitter
    fn set_log_sink(&mut self, log: LogEmitter);

    /// Start the operator's workers and return without waiting for them
    ///
    /// Fails synchronously when the operator cannot start, e.g. because its
    /// input was never wired or its configuration is invalid.
    fn exec(&mut self, cancel: CancellationToken) -> Result<()>;
}

/// Per-item function run by a [`KernelOperator`]
#[async_trait]
pub trait Kernel: Send + Sync + 'static {
    /// Type the operator accepts; other items are dropped with a debug event
    type Input: Any + Send;

    /// Process one input
    async fn apply(&self, ctx: &OperatorContext, input: Self::Input) -> Outcome;

    /// Handle an item whose type is not `Input`
    ///
    /// The default gives the item back, which makes the runtime drop it.
    fn on_mismatch(&self, item: Item) -> std::result::Result<Outcome, Item> {
        Err(item)
    }
}

/// Channel plumbing, configuration and counters shared by all operator kinds
pub(crate) struct Ports {
    pub(crate) config: OperatorConfig,
    pub(crate) log: LogEmitter,
    pub(crate) stats: OperatorStats,
    input: Option<ItemReceiver>,
    output: Outlet,
}

impl Ports {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            config: OperatorConfig::new(name),
            log: LogEmitter::disabled(),
            stats: OperatorStats::new(),
            input: None,
            output: Outlet::default(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn set_input(&mut self, input: ItemReceiver) {
        self.input = Some(input);
    }

    pub(crate) fn set_log(&mut self, log: LogEmitter) {
        self.log = log;
    }

    pub(crate) fn take_output(&mut self) -> Option<ItemReceiver> {
        self.output.receiver(self.config.capacity)
    }

    pub(crate) fn take_input(&mut self) -> Result<ItemReceiver> {
        self.input.take().ok_or(PipelineError::InputChannelUndefined)
    }

    /// Validate and hand the channel ends to the running operator
    pub(crate) fn start(&mut self) -> Result<(ItemReceiver, ItemSender)> {
        self.config.validate()?;
        if self.output.is_sealed() {
            return Err(PipelineError::configuration(format!(
                "operator {} was already started",
                self.config.name
            )));
        }
        let input = self.take_input()?;
        let output = self
            .output
            .sender(self.config.capacity)
            .ok_or(PipelineError::InputChannelUndefined)?;
        Ok((input, output))
    }
}

impl fmt::Debug for Ports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ports")
            .field("config", &self.config)
            .field("input_wired", &self.input.is_some())
            .field("started", &self.output.is_sealed())
            .finish()
    }
}

/// Report an item of the wrong type and count it
pub(crate) fn report_mismatch(log: &LogEmitter, stats: &OperatorStats, expected: &str, item: &Item) {
    stats.inc_type_mismatches();
    trace!(expected, received = item.type_name(), "type mismatch");
    log.emit(LogEvent::type_mismatch(expected, item.type_name()));
}

/// Publish a kernel outcome; returns false once the output is unusable
pub(crate) async fn publish(
    ctx: &OperatorContext,
    stats: &OperatorStats,
    output: &ItemSender,
    outcome: Outcome,
) -> bool {
    let (directive, error) = outcome.into_parts();

    if let Some(err) = error {
        stats.inc_item_errors();
        ctx.emit(
            LogEvent::warn("item error")
                .with_attr("worker", ctx.worker())
                .with_attr("error", err.to_string()),
        );
    }

    match directive {
        Directive::Forward(item) | Directive::Reroute(item) => {
            send_counted(ctx, stats, output, item).await
        }
        Directive::Expand(items) => {
            for item in items {
                if !send_counted(ctx, stats, output, item).await {
                    return false;
                }
            }
            true
        }
        Directive::Drop => {
            stats.inc_dropped();
            true
        }
    }
}

async fn send_counted(
    ctx: &OperatorContext,
    stats: &OperatorStats,
    output: &ItemSender,
    item: Item,
) -> bool {
    if send_item(output, item, ctx.cancellation()).await.is_sent() {
        stats.inc_forwarded();
        true
    } else {
        false
    }
}

/// Operator running a [`Kernel`] on `concurrency` workers
pub struct KernelOperator<K> {
    kernel: Arc<K>,
    ports: Ports,
}

impl<K: Kernel> KernelOperator<K> {
    pub fn new(name: impl Into<String>, kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            ports: Ports::new(name),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.ports.config.name = name.into();
        self
    }

    /// Number of workers sharing the input
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.ports.config.concurrency = concurrency;
        self
    }

    /// Capacity of the output channel
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.ports.config.capacity = capacity;
        self
    }

    pub fn with_config(mut self, config: OperatorConfig) -> Self {
        self.ports.config = config;
        self
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.ports.config
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Handle to this operator's counters, usable after the stream starts
    pub fn stats(&self) -> OperatorStats {
        self.ports.stats.clone()
    }
}

impl<K: Kernel> Operator for KernelOperator<K> {
    fn name(&self) -> &str {
        self.ports.name()
    }

    fn set_input(&mut self, input: ItemReceiver) {
        self.ports.set_input(input);
    }

    fn take_output(&mut self) -> Option<ItemReceiver> {
        self.ports.take_output()
    }

    fn set_log_sink(&mut self, log: LogEmitter) {
        self.ports.set_log(log);
    }

    fn exec(&mut self, cancel: CancellationToken) -> Result<()> {
        let (input, output) = self.ports.start()?;
        let input: SharedReceiver = Arc::new(Mutex::new(input));
        let name: Arc<str> = Arc::from(self.ports.name());
        let concurrency = self.ports.config.concurrency;

        debug!(operator = %name, concurrency, "starting operator");

        let workers: Vec<_> = (0..concurrency)
            .map(|worker| {
                let ctx = OperatorContext::new(
                    name.clone(),
                    worker,
                    cancel.clone(),
                    self.ports.log.clone(),
                );
                tokio::spawn(run_worker(
                    self.kernel.clone(),
                    ctx,
                    input.clone(),
                    output.clone(),
                    self.ports.stats.clone(),
                ))
            })
            .collect();

        let log = self.ports.log.clone();
        tokio::spawn(async move {
            for handle in workers {
                if let Err(err) = handle.await {
                    error!(operator = %name, error = %err, "operator worker failed");
                    log.emit(LogEvent::error("operator worker failed").with_attr("error", err.to_string()));
                }
            }
            drop(output);
            debug!(operator = %name, "operator output closed");
        });

        Ok(())
    }
}

impl<K> fmt::Debug for KernelOperator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelOperator")
            .field("kernel", &type_name::<K>())
            .field("ports", &self.ports)
            .finish()
    }
}

async fn run_worker<K: Kernel>(
    kernel: Arc<K>,
    ctx: OperatorContext,
    input: SharedReceiver,
    output: ItemSender,
    stats: OperatorStats,
) {
    trace!(operator = ctx.operator(), worker = ctx.worker(), "worker started");

    loop {
        let item = match recv_shared(&input, ctx.cancellation()).await {
            Recv::Item(item) => item,
            Recv::Closed | Recv::Cancelled => break,
        };
        stats.inc_received();

        let outcome = match item.downcast::<K::Input>() {
            Ok(value) => kernel.apply(&ctx, value).await,
            Err(item) => match kernel.on_mismatch(item) {
                Ok(outcome) => outcome,
                Err(item) => {
                    report_mismatch(ctx.log(), &stats, type_name::<K::Input>(), &item);
                    continue;
                }
            },
        };

        if !publish(&ctx, &stats, &output, outcome).await {
            break;
        }
    }

    trace!(operator = ctx.operator(), worker = ctx.worker(), "worker stopped");
}
