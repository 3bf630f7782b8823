//! Execution contexts: where command work is scheduled and where it reports
//! faults.

pub mod factory;

pub use factory::{ContextFactory, ProcessContextFactory, ScopedContextFactory};

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::fault::{Fault, FaultChannel, FaultScope, FaultSubscription};
use crate::transaction::Transaction;

/// A started execution context.
///
/// Clones share the same runtime, fault channel and stop signal.
#[derive(Clone)]
pub struct ExecutionContext {
    runtime: Handle,
    channel: FaultChannel,
    scope: Arc<FaultScope>,
    transaction: Option<Arc<Transaction>>,
    stop: CancellationToken,
}

impl ExecutionContext {
    pub(crate) fn new(runtime: Handle, channel: FaultChannel) -> Self {
        ExecutionContext {
            runtime,
            channel,
            scope: FaultScope::root(),
            transaction: None,
            stop: CancellationToken::new(),
        }
    }

    pub(crate) fn with_scope(mut self, scope: Arc<FaultScope>) -> Self {
        self.scope = scope;
        self
    }

    pub(crate) fn with_channel(mut self, channel: FaultChannel) -> Self {
        self.channel = channel;
        self
    }

    pub(crate) fn with_transaction(mut self, transaction: Option<Arc<Transaction>>) -> Self {
        if transaction.is_some() {
            self.transaction = transaction;
        }
        self
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Records `fault` in this context's scope, then publishes it.
    pub fn publish(&self, fault: Fault) {
        self.scope.record();
        tracing::debug!(%fault, "publishing fault");
        self.channel.publish(fault);
    }

    pub fn subscribe(&self) -> FaultSubscription {
        self.channel.subscribe()
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }

    /// The ambient transaction, when running inside a transactional
    /// container.
    pub fn transaction(&self) -> Option<&Arc<Transaction>> {
        self.transaction.as_ref()
    }

    pub fn scope(&self) -> &Arc<FaultScope> {
        &self.scope
    }
}
