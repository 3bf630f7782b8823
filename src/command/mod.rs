//! The execution tree: leaf commands and the containers composing them.
//!
//! - [`ParallelCommand`] starts every child at once.
//! - [`SequenceCommand`] starts each child after its predecessor ends.
//! - [`TransactionCommand`] runs children in parallel inside one ambient
//!   transaction.
//! - [`ExecutePipeline`] runs a single pipeline definition.

pub mod completion;
pub mod execute_pipeline;
pub mod parallel;
pub mod sequence;
pub mod transaction;

pub use completion::Completion;
pub use execute_pipeline::ExecutePipeline;
pub use parallel::ParallelCommand;
pub use sequence::SequenceCommand;
pub use transaction::TransactionCommand;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::context::ContextFactory;
use crate::types::EtlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Pipeline,
    Parallel,
    Sequence,
    Transaction,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Pipeline => "pipeline",
            CommandKind::Parallel => "parallel",
            CommandKind::Sequence => "sequence",
            CommandKind::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// A unit of work that can be started, waited on and released early.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> CommandKind;

    fn completion(&self) -> &Completion;

    /// Starts the work on contexts created by `factory` and returns without
    /// waiting for it. A command can only be executed once.
    fn execute(self: Arc<Self>, factory: Arc<dyn ContextFactory>) -> Result<(), EtlError>;

    /// Child commands in declaration order. Empty for leaves.
    fn commands(&self) -> Vec<Arc<dyn Command>> {
        Vec::new()
    }

    /// Waits until the work (children included) has ended or the end was
    /// forced. Returns false if `timeout` elapsed first.
    async fn wait_for_completion(&self, timeout: Duration) -> bool {
        self.completion().wait(timeout).await
    }

    /// Releases every waiter immediately. In-flight work keeps running.
    fn force_end_of_completion_without_further_wait(&self) {
        self.completion().force_end();
    }
}

/// A command owning an ordered list of children.
pub trait CommandContainer: Command {
    /// Appends a child. Fails once the container has started executing.
    fn add(&self, command: Arc<dyn Command>) -> Result<(), EtlError>;

    fn into_command(self: Arc<Self>) -> Arc<dyn Command>;
}

/// Child list that is sealed when its container starts.
#[derive(Default)]
pub(crate) struct Children {
    state: Mutex<ChildList>,
}

#[derive(Default)]
struct ChildList {
    sealed: bool,
    commands: Vec<Arc<dyn Command>>,
}

impl Children {
    pub(crate) fn add(&self, container: &str, command: Arc<dyn Command>) -> Result<(), EtlError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.sealed {
            return Err(EtlError::ContainerStarted {
                container: container.to_string(),
                child: command.name().to_string(),
            });
        }
        state.commands.push(command);
        Ok(())
    }

    /// Marks the container started and hands back the children to run.
    pub(crate) fn start(
        &self,
        container: &str,
        completion: &Completion,
    ) -> Result<Vec<Arc<dyn Command>>, EtlError> {
        if !completion.start() {
            return Err(EtlError::AlreadyExecuted(container.to_string()));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sealed = true;
        Ok(state.commands.clone())
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Command>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commands
            .clone()
    }

    /// Forces `completion` and, on the first call only, every child.
    pub(crate) fn force_end(&self, completion: &Completion) {
        if completion.force_end() {
            for child in self.snapshot() {
                child.force_end_of_completion_without_further_wait();
            }
        }
    }
}
