use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::command::Command;
use crate::context::ExecutionContext;
use crate::fault::{Fault, FaultSubscription};

/// The single consumer of a run's faults.
///
/// Every fault is appended to the target's list, then the whole tree is
/// forced to stop waiting.
pub(crate) struct FaultListener {
    context: ExecutionContext,
    task: JoinHandle<()>,
}

impl FaultListener {
    pub(crate) fn start(
        context: ExecutionContext,
        root: Arc<dyn Command>,
        faults: Arc<Mutex<Vec<Fault>>>,
    ) -> Self {
        let subscription = context.subscribe();
        let task = context.spawn(listen(context.clone(), subscription, root, faults));
        FaultListener { context, task }
    }

    pub(crate) fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Stops listening after every fault already published was recorded.
    pub(crate) async fn stop(self) {
        self.context.stop();
        if let Err(error) = self.task.await {
            tracing::error!(%error, "fault listener ended abnormally");
        }
    }
}

async fn listen(
    context: ExecutionContext,
    mut subscription: FaultSubscription,
    root: Arc<dyn Command>,
    faults: Arc<Mutex<Vec<Fault>>>,
) {
    loop {
        tokio::select! {
            fault = subscription.recv() => match fault {
                Some(fault) => record(&root, &faults, fault),
                None => return,
            },
            _ = context.stopped() => break,
        }
    }

    subscription.close();
    while let Some(fault) = subscription.recv().await {
        tracing::debug!(%fault, "fault drained after listener stop");
        record(&root, &faults, fault);
    }
}

pub(crate) fn record(root: &Arc<dyn Command>, faults: &Mutex<Vec<Fault>>, fault: Fault) {
    tracing::warn!(%fault, "fault recorded");
    faults
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(fault);
    root.force_end_of_completion_without_further_wait();
}
