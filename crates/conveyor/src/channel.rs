//! Bounded item channels between stages
//!
//! A channel is created and owned by its producer stage, which is the only
//! party that closes it (by dropping its senders). Capacity is the
//! backpressure lever: a full channel suspends the producer until the
//! consumer catches up. Every send and receive here is raced against the
//! pipeline's cancellation token, with cancellation taking priority.

use crate::item::Item;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Default capacity of every stage's output channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub type ItemSender = mpsc::Sender<Item>;
pub type ItemReceiver = mpsc::Receiver<Item>;

/// Receive side shared by the workers of one operator
pub(crate) type SharedReceiver = Arc<Mutex<ItemReceiver>>;

/// Create a bounded item channel
pub fn item_channel(capacity: usize) -> (ItemSender, ItemReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Lazily created output channel of a producer stage
///
/// The receiver can be handed out before the producer starts; the sender is
/// taken exactly once, when the producer starts.
#[derive(Debug, Default)]
pub(crate) struct Outlet {
    tx: Option<ItemSender>,
    rx: Option<ItemReceiver>,
    sealed: bool,
}

impl Outlet {
    /// Read side of the channel, available once
    pub(crate) fn receiver(&mut self, capacity: usize) -> Option<ItemReceiver> {
        if !self.sealed && self.tx.is_none() && self.rx.is_none() {
            let (tx, rx) = item_channel(capacity);
            self.tx = Some(tx);
            self.rx = Some(rx);
        }
        self.rx.take()
    }

    /// Write side of the channel; `None` if the producer already started
    pub(crate) fn sender(&mut self, capacity: usize) -> Option<ItemSender> {
        if self.sealed {
            return None;
        }
        self.sealed = true;
        match self.tx.take() {
            Some(tx) => Some(tx),
            None => {
                let (tx, rx) = item_channel(capacity);
                self.rx = Some(rx);
                Some(tx)
            }
        }
    }

    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed
    }
}

/// Result of a cancellable send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The item was accepted by the channel
    Sent,
    /// The pipeline was cancelled before the channel had room
    Cancelled,
    /// The consumer is gone
    Closed,
}

impl Delivery {
    pub fn is_sent(self) -> bool {
        self == Delivery::Sent
    }
}

/// Result of a cancellable receive
#[derive(Debug)]
pub enum Recv {
    Item(Item),
    /// The producer closed the channel and it is drained
    Closed,
    Cancelled,
}

/// Send an item, giving up if the pipeline is cancelled first
pub async fn send_item(output: &ItemSender, item: Item, cancel: &CancellationToken) -> Delivery {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Delivery::Cancelled,
        sent = output.send(item) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        },
    }
}

/// Receive the next item, giving up if the pipeline is cancelled first
pub async fn recv_item(input: &mut ItemReceiver, cancel: &CancellationToken) -> Recv {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Recv::Cancelled,
        item = input.recv() => match item {
            Some(item) => Recv::Item(item),
            None => Recv::Closed,
        },
    }
}

/// Receive from an input shared between workers; each item reaches one worker
pub(crate) async fn recv_shared(input: &SharedReceiver, cancel: &CancellationToken) -> Recv {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Recv::Cancelled,
        item = async { input.lock().await.recv().await } => match item {
            Some(item) => Recv::Item(item),
            None => Recv::Closed,
        },
    }
}
