//! The root orchestrator: declares a command tree, runs it, collects its
//! faults and bounds the wait for it.

pub mod builder;
pub mod config;
mod listener;

pub use builder::{CommandBuilder, TargetDefinition};
pub use config::{Config, ConfigBuilder, DEFAULT_TIMEOUT};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::command::{Command, ExecutePipeline};
use crate::configuration::Configuration;
use crate::context::{ContextFactory, ExecutionContext, ScopedContextFactory};
use crate::fault::{Fault, FaultChannel, FaultScope};
use crate::globals;
use crate::result::ExecutionResult;
use crate::transaction::IsolationLevel;
use crate::types::EtlError;
use listener::FaultListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Configuring,
    Running,
    Waiting,
    Succeeded,
    Faulted,
    TimedOut,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            TargetState::Configuring => "configuring",
            TargetState::Running => "running",
            TargetState::Waiting => "waiting",
            TargetState::Succeeded => "succeeded",
            TargetState::Faulted => "faulted",
            TargetState::TimedOut => "timed out",
        };
        f.write_str(state)
    }
}

/// A named, independently runnable unit of orchestrated work.
///
/// # Lifecycle
///
/// 1. Declare commands with [`execute`](Target::execute), the scope methods
///    or [`prepare`](Target::prepare).
/// 2. [`run`](Target::run) starts the tree and the fault listener.
/// 3. [`wait_for_completion`](Target::wait_for_completion) waits up to the
///    time out. The first fault anywhere releases it early.
/// 4. [`execution_result`](Target::execution_result) reports the outcome.
pub struct Target {
    name: String,
    config: Config,
    configuration: Arc<Configuration>,
    builder: CommandBuilder,
    state: TargetState,
    faults: Arc<Mutex<Vec<Fault>>>,
    listener: Option<FaultListener>,
}

impl Target {
    /// Creates a target registered in `configuration`. Fails if the name is
    /// already taken.
    pub fn new(name: impl Into<String>, configuration: Arc<Configuration>) -> Result<Self, EtlError> {
        Self::with_config(name, configuration, Config::default())
    }

    /// Creates a target registered in the process-wide configuration.
    pub fn named(name: impl Into<String>) -> Result<Self, EtlError> {
        Self::new(name, globals::configuration())
    }

    pub fn with_config(
        name: impl Into<String>,
        configuration: Arc<Configuration>,
        config: Config,
    ) -> Result<Self, EtlError> {
        let name = name.into();
        configuration.register_target(&name)?;

        Ok(Target {
            builder: CommandBuilder::new(&name, Arc::clone(&configuration)),
            name,
            config,
            configuration,
            state: TargetState::Configuring,
            faults: Arc::new(Mutex::new(Vec::new())),
            listener: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Commands declared directly under the root.
    pub fn commands(&self) -> Vec<Arc<dyn Command>> {
        self.builder.root().commands()
    }

    pub fn is_faulted(&self) -> bool {
        !self.lock_faults().is_empty()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.lock_faults().clone()
    }

    pub fn prepare(&mut self, definition: &dyn TargetDefinition) -> Result<(), EtlError> {
        self.expect_state(TargetState::Configuring, "prepare")?;
        definition.prepare(&mut self.builder)
    }

    pub fn execute(&mut self, pipeline: &str) -> Result<Arc<ExecutePipeline>, EtlError> {
        self.expect_state(TargetState::Configuring, "declare commands")?;
        self.builder.execute(pipeline)
    }

    pub fn sequence<F>(&mut self, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        self.expect_state(TargetState::Configuring, "declare commands")?;
        self.builder.sequence(build)
    }

    pub fn parallel<F>(&mut self, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        self.expect_state(TargetState::Configuring, "declare commands")?;
        self.builder.parallel(build)
    }

    pub fn transaction<F>(&mut self, build: F) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        self.expect_state(TargetState::Configuring, "declare commands")?;
        self.builder.transaction(build)
    }

    pub fn transaction_with<F>(
        &mut self,
        isolation_level: IsolationLevel,
        build: F,
    ) -> Result<(), EtlError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), EtlError>,
    {
        self.expect_state(TargetState::Configuring, "declare commands")?;
        self.builder.transaction_with(isolation_level, build)
    }

    /// Subscribes to faults and starts the command tree without waiting for
    /// it.
    #[tracing::instrument(skip_all, fields(target_name = %self.name))]
    pub fn run(&mut self, factory: Arc<dyn ContextFactory>) -> Result<(), EtlError> {
        self.expect_state(TargetState::Configuring, "run")?;

        // Faults added before the run must still veto its transactions.
        let scope = FaultScope::seeded(self.lock_faults().len());
        let factory: Arc<dyn ContextFactory> = Arc::new(
            ScopedContextFactory::new(factory, scope).with_channel(FaultChannel::new()),
        );
        let root = Arc::clone(self.builder.root()).into_command();
        self.listener = Some(FaultListener::start(
            factory.create_and_start(),
            Arc::clone(&root),
            Arc::clone(&self.faults),
        ));
        self.state = TargetState::Running;

        tracing::info!(commands = root.commands().len(), "target started");
        root.execute(factory)
    }

    /// Waits for the tree up to the time out.
    ///
    /// A time out is recorded as a fault and returned as an error. Faults
    /// raised by the tree are not errors here; read them from
    /// [`execution_result`](Target::execution_result).
    #[tracing::instrument(skip_all, fields(target_name = %self.name))]
    pub async fn wait_for_completion(&mut self) -> Result<(), EtlError> {
        self.expect_state(TargetState::Running, "wait for completion")?;
        self.state = TargetState::Waiting;

        let timeout = self.timeout();
        let root = Arc::clone(self.builder.root());
        if !root.wait_for_completion(timeout).await {
            let error = EtlError::Timeout {
                target: self.name.clone(),
                timeout,
            };
            tracing::error!(%error, "target timed out");
            self.add_fault(Fault::timeout(&self.name, timeout));
            self.stop_listening().await;
            self.state = TargetState::TimedOut;
            return Err(error);
        }

        self.stop_listening().await;
        self.state = if self.is_faulted() {
            TargetState::Faulted
        } else {
            TargetState::Succeeded
        };
        tracing::info!(state = %self.state, "target finished");
        Ok(())
    }

    /// Records `fault` and forces the tree to stop waiting.
    pub fn add_fault(&self, fault: Fault) {
        match &self.listener {
            Some(listener) => listener.context().publish(fault),
            None => {
                let root = Arc::clone(self.builder.root()).into_command();
                listener::record(&root, &self.faults, fault);
            }
        }
    }

    pub fn force_end(&self) {
        self.builder
            .root()
            .force_end_of_completion_without_further_wait();
    }

    /// A handle for aborting the run from another task. `None` before
    /// [`run`](Target::run) and after the listener stopped.
    pub fn handle(&self) -> Option<RunHandle> {
        self.listener.as_ref().map(|listener| RunHandle {
            root: Arc::clone(self.builder.root()).into_command(),
            context: listener.context().clone(),
        })
    }

    pub fn execution_result(&self) -> ExecutionResult {
        ExecutionResult::new(self.faults(), self.configuration.errors())
    }

    async fn stop_listening(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }
    }

    fn expect_state(&self, expected: TargetState, operation: &'static str) -> Result<(), EtlError> {
        if self.state != expected {
            return Err(EtlError::InvalidState {
                target: self.name.clone(),
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Vec<Fault>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable entry point for aborting a running target.
#[derive(Clone)]
pub struct RunHandle {
    root: Arc<dyn Command>,
    context: ExecutionContext,
}

impl RunHandle {
    /// Publishes `fault` to the target's listener, which records it and
    /// forces the tree to stop waiting.
    pub fn add_fault(&self, fault: Fault) {
        self.context.publish(fault);
    }

    pub fn force_end(&self) {
        self.root.force_end_of_completion_without_further_wait();
    }
}
