use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::command::{
    CommandContainer, ExecutePipeline, ParallelCommand, SequenceCommand, TransactionCommand,
};
use crate::configuration::Configuration;
use crate::transaction::IsolationLevel;
use crate::types::EtlError;

/// Declares the command tree of a target.
///
/// Commands are added to the innermost open scope. `sequence`, `parallel`
/// and `transaction` open a new scope for the duration of their callback and
/// then attach it, as one child, to the scope that was open before.
pub struct CommandBuilder {
    target: String,
    configuration: Arc<Configuration>,
    root: Arc<dyn CommandContainer>,
    scopes: Vec<Arc<dyn CommandContainer>>,
}

impl CommandBuilder {
    pub(crate) fn new(target: &str, configuration: Arc<Configuration>) -> Self {
        CommandBuilder {
            target: target.to_string(),
            configuration,
            root: Arc::new(ParallelCommand::new(target)),
            scopes: Vec::new(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn root(&self) -> &Arc<dyn CommandContainer> {
        &self.root
    }

    /// Number of scopes currently open around the root.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Adds a command running the pipeline registered as `pipeline`.
    pub fn execute(&mut self, pipeline: &str) -> Result<Arc<ExecutePipeline>, EtlError> {
        let definition = self
            .configuration
            .pipeline(pipeline)
            .ok_or_else(|| EtlError::UnknownPipeline(pipeline.to_string()))?;

        let command = Arc::new(ExecutePipeline::new(self.target.as_str(), definition));
        self.current().add(command.clone())?;
        Ok(command)
    }

    pub fn sequence<F>(&mut self, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        let container = Arc::new(SequenceCommand::new(self.target.as_str()));
        self.scoped(container, build)
    }

    pub fn parallel<F>(&mut self, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        let container = Arc::new(ParallelCommand::new(self.target.as_str()));
        self.scoped(container, build)
    }

    /// Runs the commands of the scope in parallel inside one transaction
    /// with the default isolation level.
    pub fn transaction<F>(&mut self, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        let container = Arc::new(TransactionCommand::new(self.target.as_str(), None));
        self.scoped(container, build)
    }

    pub fn transaction_with<F>(
        &mut self,
        isolation_level: IsolationLevel,
        build: F,
    ) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        let container = Arc::new(TransactionCommand::new(
            self.target.as_str(),
            Some(isolation_level),
        ));
        self.scoped(container, build)
    }

    fn current(&self) -> &Arc<dyn CommandContainer> {
        self.scopes.last().unwrap_or(&self.root)
    }

    fn scoped<F>(&mut self, container: Arc<dyn CommandContainer>, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        {
            let mut scope = Scope::enter(self, Arc::clone(&container));
            build(&mut *scope)?;
        }
        self.current().add(container.into_command())
    }
}

/// Keeps a scope open while borrowed; closes it on drop, including when the
/// callback returns an error or panics.
struct Scope<'a> {
    builder: &'a mut CommandBuilder,
}

impl<'a> Scope<'a> {
    fn enter(builder: &'a mut CommandBuilder, container: Arc<dyn CommandContainer>) -> Self {
        builder.scopes.push(container);
        Scope { builder }
    }
}

impl Deref for Scope<'_> {
    type Target = CommandBuilder;

    fn deref(&self) -> &CommandBuilder {
        self.builder
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut CommandBuilder {
        self.builder
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.builder.scopes.pop();
    }
}

/// Something that declares the commands of a target.
pub trait TargetDefinition {
    fn prepare(&self, commands: &mut CommandBuilder) -> Result<(), EtlError>;
}

impl<F> TargetDefinition for F
where
    F: Fn(&mut CommandBuilder) -> Result<(), EtlError>,
{
    fn prepare(&self, commands: &mut CommandBuilder) -> Result<(), EtlError> {
        self(commands)
    }
}
