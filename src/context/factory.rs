use std::sync::Arc;

use tokio::runtime::Handle;

use super::ExecutionContext;
use crate::fault::{FaultChannel, FaultScope};
use crate::transaction::Transaction;
use crate::types::EtlError;

/// Creates started execution contexts.
pub trait ContextFactory: Send + Sync {
    fn create_and_start(&self) -> ExecutionContext;
}

/// Schedules work on a tokio runtime. All contexts it creates share one
/// fault channel.
#[derive(Clone)]
pub struct ProcessContextFactory {
    runtime: Handle,
    channel: FaultChannel,
}

impl ProcessContextFactory {
    pub fn new(runtime: Handle, channel: FaultChannel) -> Self {
        ProcessContextFactory { runtime, channel }
    }

    /// Uses the runtime the caller is running on.
    pub fn current() -> Result<Self, EtlError> {
        Ok(Self::new(Handle::try_current()?, FaultChannel::new()))
    }

    pub fn channel(&self) -> &FaultChannel {
        &self.channel
    }
}

impl ContextFactory for ProcessContextFactory {
    fn create_and_start(&self) -> ExecutionContext {
        ExecutionContext::new(self.runtime.clone(), self.channel.clone())
    }
}

/// Stamps every context of an inner factory with a fault scope and, inside a
/// transactional container, the ambient transaction. A target run also
/// stamps its own fault channel so runs sharing a factory stay isolated.
pub struct ScopedContextFactory {
    inner: Arc<dyn ContextFactory>,
    scope: Arc<FaultScope>,
    channel: Option<FaultChannel>,
    transaction: Option<Arc<Transaction>>,
}

impl ScopedContextFactory {
    pub fn new(inner: Arc<dyn ContextFactory>, scope: Arc<FaultScope>) -> Self {
        ScopedContextFactory {
            inner,
            scope,
            channel: None,
            transaction: None,
        }
    }

    /// Routes every created context's faults to `channel` instead of the
    /// inner factory's.
    pub fn with_channel(mut self, channel: FaultChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub(crate) fn with_transaction(mut self, transaction: Arc<Transaction>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn scope(&self) -> &Arc<FaultScope> {
        &self.scope
    }
}

impl ContextFactory for ScopedContextFactory {
    fn create_and_start(&self) -> ExecutionContext {
        let context = self.inner.create_and_start();
        let context = match &self.channel {
            Some(channel) => context.with_channel(channel.clone()),
            None => context,
        };
        context
            .with_scope(Arc::clone(&self.scope))
            .with_transaction(self.transaction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;
    use crate::transaction::IsolationLevel;

    #[test]
    fn test_current_requires_runtime() {
        assert!(matches!(
            ProcessContextFactory::current(),
            Err(EtlError::Runtime(_))
        ));
    }

    #[tokio::test]
    async fn test_contexts_share_channel() {
        let factory = ProcessContextFactory::current().unwrap();
        let listener = factory.create_and_start();
        let mut subscription = listener.subscribe();

        let worker = factory.create_and_start();
        worker.publish(Fault::new("Load", "Orders", EtlError::AlreadyExecuted("Orders".into())));

        assert_eq!(subscription.recv().await.unwrap().command(), "Orders");
    }

    #[tokio::test]
    async fn test_scoped_contexts_record_faults() {
        let factory: Arc<dyn ContextFactory> = Arc::new(ProcessContextFactory::current().unwrap());
        let run = FaultScope::root();
        let tx = Arc::new(Transaction::begin(IsolationLevel::default()));
        let scoped = ScopedContextFactory::new(factory, FaultScope::child(&run))
            .with_transaction(Arc::clone(&tx));

        let context = scoped.create_and_start();
        context.publish(Fault::new("Load", "Orders", EtlError::AlreadyExecuted("Orders".into())));

        assert_eq!(run.fault_count(), 1);
        assert_eq!(context.transaction().map(|t| t.id()), Some(tx.id()));
    }

    #[tokio::test]
    async fn test_scoped_channel_isolates_contexts() {
        let factory = ProcessContextFactory::current().unwrap();
        let mut shared = factory.channel().subscribe();
        let own = FaultChannel::new();
        let mut isolated = own.subscribe();
        let scoped = ScopedContextFactory::new(Arc::new(factory), FaultScope::root())
            .with_channel(own);

        scoped
            .create_and_start()
            .publish(Fault::new("Load", "Orders", EtlError::AlreadyExecuted("Orders".into())));

        assert_eq!(isolated.recv().await.unwrap().target(), "Load");
        assert!(shared.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_stop_is_shared_by_clones() {
        let context = ProcessContextFactory::current().unwrap().create_and_start();
        let clone = context.clone();

        context.stop();
        clone.stopped().await;
        assert!(clone.is_stopped());
    }
}
