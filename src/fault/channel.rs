use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use super::Fault;

/// Topic every fault is published under.
pub const EXCEPTION_TOPIC: &str = "Exception";

/// Publish/subscribe channel for faults.
///
/// Each subscriber owns an unbounded queue drained by a single consumer, so
/// faults from one source arrive in the order they were published.
#[derive(Clone, Default)]
pub struct FaultChannel {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<Fault>>>>,
}

impl FaultChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a copy of `fault` to every live subscriber and returns how
    /// many received it.
    pub fn publish(&self, fault: Fault) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(fault.clone()).is_ok());

        if subscribers.is_empty() {
            tracing::warn!(topic = EXCEPTION_TOPIC, %fault, "fault published with no subscriber");
        }
        subscribers.len()
    }

    pub fn subscribe(&self) -> FaultSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        FaultSubscription { receiver: rx }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

/// Receiving end of a [`FaultChannel`] subscription.
pub struct FaultSubscription {
    receiver: mpsc::UnboundedReceiver<Fault>,
}

impl FaultSubscription {
    /// Waits for the next fault. Returns `None` once the subscription is
    /// closed and every buffered fault has been received.
    pub async fn recv(&mut self) -> Option<Fault> {
        self.receiver.recv().await
    }

    /// Takes the next queued fault without waiting.
    pub fn try_recv(&mut self) -> Option<Fault> {
        self.receiver.try_recv().ok()
    }

    /// Stops accepting new faults. Faults already queued stay receivable.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
