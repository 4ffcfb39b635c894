//! One-shot completion handle returned by sinks and streams

use crate::error::{PipelineError, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Sending half of a [`Completion`]
pub type CompletionSender = oneshot::Sender<Result<()>>;

/// Resolves exactly once with the terminal result of a sink or stream
///
/// If the producing task goes away without reporting, the completion
/// resolves with an execution error instead of hanging.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<()>>,
}

impl Completion {
    /// Create a completion together with the sender that resolves it
    pub fn channel() -> (CompletionSender, Completion) {
        let (tx, rx) = oneshot::channel();
        (tx, Completion { rx })
    }

    /// A completion that is already resolved
    pub fn ready(result: Result<()>) -> Self {
        let (tx, completion) = Self::channel();
        let _ = tx.send(result);
        completion
    }

    /// Take the result if it is already available
    pub fn try_result(&mut self) -> Option<Result<()>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(abandoned())),
        }
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(abandoned())))
    }
}

fn abandoned() -> PipelineError {
    PipelineError::execution("stage finished without reporting a result")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_completion() {
        assert!(Completion::ready(Ok(())).await.is_ok());
        let err = Completion::ready(Err(PipelineError::SinkEmpty)).await.unwrap_err();
        assert!(matches!(err, PipelineError::SinkEmpty));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_execution_error() {
        let (tx, completion) = Completion::channel();
        drop(tx);
        assert!(matches!(completion.await, Err(PipelineError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_try_result() {
        let (tx, mut completion) = Completion::channel();
        assert!(completion.try_result().is_none());
        tx.send(Ok(())).unwrap();
        assert!(matches!(completion.try_result(), Some(Ok(()))));
    }
}
