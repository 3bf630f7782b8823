use std::sync::Arc;

use async_trait::async_trait;

use super::{Children, Command, CommandContainer, CommandKind, Completion};
use crate::context::ContextFactory;
use crate::fault::Fault;
use crate::types::EtlError;

/// Runs children one after another in declaration order.
///
/// A child starts only once its predecessor has ended, whether it succeeded
/// or faulted. After a forced end no further child is started; the child
/// already running is still awaited before the sequence reports done.
pub struct SequenceCommand {
    target: String,
    children: Children,
    completion: Completion,
}

impl SequenceCommand {
    pub fn new(target: impl Into<String>) -> Self {
        SequenceCommand {
            target: target.into(),
            children: Children::default(),
            completion: Completion::new(),
        }
    }
}

impl CommandContainer for SequenceCommand {
    fn add(&self, command: Arc<dyn Command>) -> Result<(), EtlError> {
        self.children.add(self.name(), command)
    }

    fn into_command(self: Arc<Self>) -> Arc<dyn Command> {
        self
    }
}

#[async_trait]
impl Command for SequenceCommand {
    fn name(&self) -> &str {
        "sequence"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Sequence
    }

    fn completion(&self) -> &Completion {
        &self.completion
    }

    fn execute(self: Arc<Self>, factory: Arc<dyn ContextFactory>) -> Result<(), EtlError> {
        let children = self.children.start(self.name(), &self.completion)?;
        let context = factory.create_and_start();

        let this = Arc::clone(&self);
        context.clone().spawn(async move {
            for (position, child) in children.iter().enumerate() {
                if this.completion.is_forced() {
                    tracing::debug!(
                        target_name = %this.target,
                        skipped = children.len() - position,
                        "sequence forced to end, not starting remaining commands"
                    );
                    break;
                }

                tracing::debug!(target_name = %this.target, command = child.name(), position, "starting");
                match Arc::clone(child).execute(Arc::clone(&factory)) {
                    Ok(()) => child.completion().finished().await,
                    Err(error) => context.publish(Fault::new(&this.target, child.name(), error)),
                }
            }
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
