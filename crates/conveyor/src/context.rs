//! Context handed to kernels and triggers on every invocation

use crate::log::{LogEmitter, LogEvent};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-worker view of the running operator
#[derive(Debug, Clone)]
pub struct OperatorContext {
    operator: Arc<str>,
    worker: usize,
    cancel: CancellationToken,
    log: LogEmitter,
}

impl OperatorContext {
    pub fn new(
        operator: impl Into<Arc<str>>,
        worker: usize,
        cancel: CancellationToken,
        log: LogEmitter,
    ) -> Self {
        Self {
            operator: operator.into(),
            worker,
            cancel,
            log,
        }
    }

    /// A context with a fresh token and no log sink, for driving kernels directly
    pub fn detached(operator: impl Into<Arc<str>>) -> Self {
        Self::new(operator, 0, CancellationToken::new(), LogEmitter::disabled())
    }

    /// Name of the operator
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Index of the worker running this invocation
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Pipeline cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn log(&self) -> &LogEmitter {
        &self.log
    }

    /// Publish an event on the log bus
    pub fn emit(&self, event: LogEvent) -> bool {
        self.log.emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_context() {
        let ctx = OperatorContext::detached("sum");
        assert_eq!(ctx.operator(), "sum");
        assert_eq!(ctx.worker(), 0);
        assert!(!ctx.is_cancelled());
        assert!(!ctx.emit(LogEvent::info("nobody listens")));
    }

    #[test]
    fn test_context_observes_cancellation() {
        let cancel = CancellationToken::new();
        let ctx = OperatorContext::new("map", 2, cancel.clone(), LogEmitter::disabled());
        cancel.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.worker(), 2);
    }
}
