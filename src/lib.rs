//! # etl-orchestra
//!
//! The execution core of an ETL framework, built on Tokio.
//!
//! A [`Target`] declares a tree of commands (pipelines run in parallel, in
//! sequence or inside one transaction), runs it, collects every fault raised
//! in the tree and waits for it up to a time out.
//!
//! ## Features
//!
//! - **Parallel, sequential and transactional** composition, nested freely
//! - **Fail fast**: the first fault anywhere releases the caller
//! - **Bounded waiting** with a per-target time out
//! - **Ambient transactions** committed only when the run saw no fault
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use etl_orchestra::{pipeline_fn, Configuration, ProcessContextFactory, Target};
//! use std::sync::Arc;
//!
//! let configuration = Arc::new(Configuration::new());
//! configuration.register_pipeline(Arc::new(pipeline_fn("Customers", |_ctx| async { Ok(()) })))?;
//! configuration.register_pipeline(Arc::new(pipeline_fn("Orders", |_ctx| async { Ok(()) })))?;
//!
//! let mut target = Target::new("Load", configuration)?;
//! target.sequence(|commands| {
//!     commands.execute("Customers")?;
//!     commands.execute("Orders")?;
//!     Ok(())
//! })?;
//!
//! target.run(Arc::new(ProcessContextFactory::current()?))?;
//! target.wait_for_completion().await?;
//! assert!(target.execution_result().is_success());
//! ```
//!
//! ## Modules
//!
//! - [`target`] - The root orchestrator and its command builder
//! - [`command`] - Leaf and container commands
//! - [`fault`] - Fault events, the fault channel and fault scopes
//! - [`context`] - Execution contexts and their factories
//! - [`transaction`] - Ambient transactions and enlistments
//! - [`pipeline`] - The pipeline engine interface

pub mod command;
pub mod configuration;
pub mod context;
pub mod fault;
pub mod globals;
pub mod pipeline;
pub mod result;
pub mod target;
pub mod transaction;
pub mod types;

pub use command::{Command, CommandContainer, CommandKind, ExecutePipeline};
pub use configuration::Configuration;
pub use context::{ContextFactory, ExecutionContext, ProcessContextFactory};
pub use fault::Fault;
pub use pipeline::{pipeline_fn, Pipeline};
pub use result::{ExecutionResult, ExecutionStatus};
pub use target::{CommandBuilder, Target, TargetDefinition, TargetState};
pub use transaction::{Enlistment, IsolationLevel, Transaction, TransactionOutcome};
pub use types::{EtlError, PipelineError};
