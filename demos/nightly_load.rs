//! Example: a nightly load target mixing sequential, parallel and
//! transactional steps.
//!
//! Run with `RUST_LOG=debug` to follow the tree, and pass `--fail` to make
//! the orders pipeline fault and watch the transaction roll back.

use etl_orchestra::{
    pipeline_fn, CommandBuilder, Configuration, Enlistment, EtlError, IsolationLevel,
    PipelineError, ProcessContextFactory, Target, TargetDefinition,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Staging table that only becomes visible when the transaction commits
struct StagingTable {
    name: &'static str,
}

impl Enlistment for StagingTable {
    fn commit(&self) -> Result<(), PipelineError> {
        tracing::info!(table = self.name, "staging table published");
        Ok(())
    }

    fn rollback(&self) {
        tracing::warn!(table = self.name, "staging table discarded");
    }
}

fn register(configuration: &Configuration, fail_orders: bool) -> Result<(), EtlError> {
    configuration.register_pipeline(Arc::new(pipeline_fn("Extract", |_context| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<(), PipelineError>(())
    })))?;

    for table in ["Customers", "Products"] {
        configuration.register_pipeline(Arc::new(pipeline_fn(table, move |context| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if let Some(transaction) = context.transaction() {
                transaction.enlist(Box::new(StagingTable { name: table }))?;
            }
            Ok::<(), PipelineError>(())
        })))?;
    }

    configuration.register_pipeline(Arc::new(pipeline_fn("Orders", move |_context| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if fail_orders {
            return Err::<(), PipelineError>("orders feed is truncated".into());
        }
        Ok(())
    })))?;
    Ok(())
}

struct NightlyLoad;

impl TargetDefinition for NightlyLoad {
    fn prepare(&self, commands: &mut CommandBuilder) -> Result<(), EtlError> {
        commands.sequence(|commands| {
            commands.execute("Extract")?;
            commands.transaction_with(IsolationLevel::ReadCommitted, |commands| {
                commands.execute("Customers")?;
                commands.execute("Products")?;
                commands.execute("Orders")?;
                Ok(())
            })
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fail_orders = std::env::args().any(|arg| arg == "--fail");
    let configuration = Arc::new(Configuration::new());
    register(&configuration, fail_orders)?;

    let mut target = Target::new("Nightly", configuration)?;
    target.set_timeout(Duration::from_secs(10));
    target.prepare(&NightlyLoad)?;

    target.run(Arc::new(ProcessContextFactory::current()?))?;
    target.wait_for_completion().await?;

    let result = target.execution_result();
    println!("Nightly finished: {:?}", result.status());
    for fault in result.faults() {
        println!("  - {}", fault);
    }

    // Give the rolled back transaction time to report after a fail-fast exit
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
