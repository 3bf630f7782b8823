use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use super::{Children, Command, CommandContainer, CommandKind, Completion};
use crate::context::ContextFactory;
use crate::fault::Fault;
use crate::types::EtlError;

/// Starts every child at once; done when all of them are.
pub struct ParallelCommand {
    target: String,
    children: Children,
    completion: Completion,
}

impl ParallelCommand {
    pub fn new(target: impl Into<String>) -> Self {
        ParallelCommand {
            target: target.into(),
            children: Children::default(),
            completion: Completion::new(),
        }
    }
}

impl CommandContainer for ParallelCommand {
    fn add(&self, command: Arc<dyn Command>) -> Result<(), EtlError> {
        self.children.add(self.name(), command)
    }

    fn into_command(self: Arc<Self>) -> Arc<dyn Command> {
        self
    }
}

#[async_trait]
impl Command for ParallelCommand {
    fn name(&self) -> &str {
        "parallel"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Parallel
    }

    fn completion(&self) -> &Completion {
        &self.completion
    }

    fn execute(self: Arc<Self>, factory: Arc<dyn ContextFactory>) -> Result<(), EtlError> {
        let children = self.children.start(self.name(), &self.completion)?;
        let context = factory.create_and_start();
        tracing::debug!(target_name = %self.target, children = children.len(), "starting parallel commands");

        let started = start_all(&self.target, &children, &factory);
        let this = Arc::clone(&self);
        context.clone().spawn(async move {
            finish_all(&started).await;
            this.completion.finish();
            context.stop();
        });
        Ok(())
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        self.children.snapshot()
    }

    fn force_end_of_completion_without_further_wait(&self) {
        self.children.force_end(&self.completion);
    }
}

/// Starts each child and returns the ones that started. A child that refuses
/// to start is reported as a fault.
pub(crate) fn start_all(
    target: &str,
    children: &[Arc<dyn Command>],
    factory: &Arc<dyn ContextFactory>,
) -> Vec<Arc<dyn Command>> {
    let mut started = Vec::with_capacity(children.len());
    for child in children {
        match Arc::clone(child).execute(Arc::clone(factory)) {
            Ok(()) => started.push(Arc::clone(child)),
            Err(error) => factory
                .create_and_start()
                .publish(Fault::new(target, child.name(), error)),
        }
    }
    started
}

/// Resolves when every command's work has ended, ignoring forced ends.
pub(crate) async fn finish_all(commands: &[Arc<dyn Command>]) {
    join_all(commands.iter().map(|command| command.completion().finished())).await;
}
