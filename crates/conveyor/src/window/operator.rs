//! Window/batch operator
//!
//! Admitted items accumulate in a buffer; whenever the trigger fires the
//! buffer is sent downstream as one `Vec<T>` item and a new window opens.
//! A non-empty buffer is flushed when the input closes. On cancellation the
//! output is closed without flushing.
//!
//! Window operators always run a single worker so that buffers keep
//! admission order.

use super::trigger::{TriggerAll, TriggerByDuration, TriggerByFunc, TriggerBySize, WindowTrigger};
use super::types::WindowContext;
use crate::channel::{recv_item, send_item, ItemReceiver, ItemSender, Recv};
use crate::context::OperatorContext;
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::{LogEmitter, LogEvent};
use crate::pipeline::operator::{report_mismatch, Operator, Ports};
use crate::stats::OperatorStats;
use chrono::Utc;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Operator grouping items of type `T` into windows closed by `G`
pub struct WindowOperator<T, G> {
    trigger: Option<G>,
    ports: Ports,
    _phantom: PhantomData<fn(T)>,
}

impl<T, G> WindowOperator<T, G>
where
    T: Any + Send,
    G: WindowTrigger<T> + 'static,
{
    pub fn new(name: impl Into<String>, trigger: G) -> Self {
        Self {
            trigger: Some(trigger),
            ports: Ports::new(name),
            _phantom: PhantomData,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.ports.config.name = name.into();
        self
    }

    /// Capacity of the output channel, in windows
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.ports.config.capacity = capacity;
        self
    }

    pub fn stats(&self) -> OperatorStats {
        self.ports.stats.clone()
    }
}

impl<T, G> Operator for WindowOperator<T, G>
where
    T: Any + Send,
    G: WindowTrigger<T> + 'static,
{
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
        let trigger = self
            .trigger
            .take()
            .ok_or_else(|| PipelineError::configuration("window trigger already consumed"))?;
        if let Err(err) = WindowTrigger::<T>::validate(&trigger) {
            self.trigger = Some(trigger);
            return Err(err);
        }
        let (input, output) = match self.ports.start() {
            Ok(ports) => ports,
            Err(err) => {
                self.trigger = Some(trigger);
                return Err(err);
            }
        };
        let name: Arc<str> = Arc::from(self.ports.name());
        let ctx = OperatorContext::new(name, 0, cancel, self.ports.log.clone());

        debug!(operator = ctx.operator(), trigger = ?trigger, "starting window operator");
        tokio::spawn(run_window::<T, G>(
            trigger,
            ctx,
            input,
            output,
            self.ports.stats.clone(),
        ));
        Ok(())
    }
}

impl<T, G: fmt::Debug> fmt::Debug for WindowOperator<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowOperator")
            .field("item", &type_name::<T>())
            .field("trigger", &self.trigger)
            .field("ports", &self.ports)
            .finish()
    }
}

async fn run_window<T, G>(
    mut trigger: G,
    ctx: OperatorContext,
    mut input: ItemReceiver,
    output: ItemSender,
    stats: OperatorStats,
) where
    T: Any + Send,
    G: WindowTrigger<T>,
{
    let operator_start_time = Utc::now();
    let mut operator_item_count = 0u64;
    let mut window_start_time = operator_start_time;
    let mut buffer: Vec<T> = Vec::new();

    loop {
        let item = match recv_item(&mut input, ctx.cancellation()).await {
            Recv::Item(item) => item,
            Recv::Closed => break,
            Recv::Cancelled => {
                trace!(operator = ctx.operator(), pending = buffer.len(), "window cancelled");
                return;
            }
        };
        stats.inc_received();

        let value = match item.downcast::<T>() {
            Ok(value) => value,
            Err(item) => {
                report_mismatch(ctx.log(), &stats, type_name::<T>(), &item);
                continue;
            }
        };

        operator_item_count += 1;
        let fire = {
            let window = WindowContext {
                operator_start_time,
                operator_item_count,
                window_start_time,
                window_item_count: buffer.len() as u64 + 1,
                item: &value,
                item_admit_time: Utc::now(),
            };
            trigger.on_item(&ctx, &window).is_fire()
        };
        buffer.push(value);

        if fire {
            let window = std::mem::take(&mut buffer);
            if !emit(&ctx, &stats, &output, window).await {
                return;
            }
            window_start_time = Utc::now();
        }
    }

    if !buffer.is_empty() {
        emit(&ctx, &stats, &output, buffer).await;
    }
    trace!(operator = ctx.operator(), admitted = operator_item_count, "window input closed");
}

async fn emit<T: Any + Send>(
    ctx: &OperatorContext,
    stats: &OperatorStats,
    output: &ItemSender,
    window: Vec<T>,
) -> bool {
    let size = window.len();
    if !send_item(output, Item::new(window), ctx.cancellation()).await.is_sent() {
        return false;
    }
    stats.inc_windows_emitted();
    stats.inc_forwarded();
    ctx.emit(LogEvent::debug("window emitted").with_attr("size", size));
    true
}

/// A single window holding the whole stream
pub fn batch<T: Any + Send>() -> WindowOperator<T, TriggerAll> {
    WindowOperator::new("batch", TriggerAll)
}

/// Windows of `size` items; the last one may be smaller
pub fn window_by_size<T: Any + Send>(size: u64) -> WindowOperator<T, TriggerBySize> {
    WindowOperator::new("window-by-size", TriggerBySize::new(size))
}

/// Windows closed by the first admission `duration` after they opened
pub fn window_by_duration<T: Any + Send>(
    duration: std::time::Duration,
) -> WindowOperator<T, TriggerByDuration> {
    WindowOperator::new("window-by-duration", TriggerByDuration::new(duration))
}

/// Windows closed by a user predicate
pub fn window_by_func<T, F>(func: F) -> WindowOperator<T, TriggerByFunc<F>>
where
    T: Any + Send,
    F: Fn(&OperatorContext, &WindowContext<'_, T>) -> bool + Send + 'static,
{
    WindowOperator::new("window-by-func", TriggerByFunc::new::<T>(func))
}
