use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use super::parallel::{finish_all, start_all};
use super::{Children, Command, CommandContainer, CommandKind, Completion};
use crate::context::{ContextFactory, ExecutionContext, ScopedContextFactory};
use crate::fault::{Fault, FaultScope};
use crate::transaction::{IsolationLevel, Transaction};
use crate::types::EtlError;

/// Runs children in parallel inside one ambient transaction.
///
/// Once every child has really ended the transaction commits if the run has
/// seen no fault, and rolls back otherwise. The container reports done only
/// after that decision.
pub struct TransactionCommand {
    target: String,
    isolation_level: IsolationLevel,
    children: Children,
    completion: Completion,
    transaction: OnceLock<Arc<Transaction>>,
}

impl TransactionCommand {
    pub fn new(target: impl Into<String>, isolation_level: Option<IsolationLevel>) -> Self {
        TransactionCommand {
            target: target.into(),
            isolation_level: isolation_level.unwrap_or_default(),
            children: Children::default(),
            completion: Completion::new(),
            transaction: OnceLock::new(),
        }
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// The transaction begun by `execute`.
    pub fn transaction(&self) -> Option<&Arc<Transaction>> {
        self.transaction.get()
    }

    fn resolve(&self, transaction: &Transaction, scope: &FaultScope, context: &ExecutionContext) {
        let result = if scope.is_clear() {
            transaction.commit()
        } else {
            transaction.rollback()
        };

        match result {
            Ok(outcome) => tracing::info!(
                target_name = %self.target,
                id = %transaction.id(),
                ?outcome,
                "transaction resolved"
            ),
            Err(error) => {
                tracing::error!(target_name = %self.target, id = %transaction.id(), %error, "transaction failed");
                context.publish(Fault::new(&self.target, self.name(), error));
            }
        }
    }
}

impl CommandContainer for TransactionCommand {
    fn add(&self, command: Arc<dyn Command>) -> Result<(), EtlError> {
        self.children.add(self.name(), command)
    }

    fn into_command(self: Arc<Self>) -> Arc<dyn Command> {
        self
    }
}

#[async_trait]
impl Command for TransactionCommand {
    fn name(&self) -> &str {
        "transaction"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Transaction
    }

    fn completion(&self) -> &Completion {
        &self.completion
    }

    fn execute(self: Arc<Self>, factory: Arc<dyn ContextFactory>) -> Result<(), EtlError> {
        let children = self.children.start(self.name(), &self.completion)?;
        let context = factory.create_and_start();

        let transaction = Arc::new(Transaction::begin(self.isolation_level));
        let _ = self.transaction.set(Arc::clone(&transaction));
        tracing::info!(
            target_name = %self.target,
            id = %transaction.id(),
            isolation_level = ?self.isolation_level,
            "transaction started"
        );

        let scope = FaultScope::child(context.scope());
        let scoped: Arc<dyn ContextFactory> = Arc::new(
            ScopedContextFactory::new(factory, Arc::clone(&scope))
                .with_transaction(Arc::clone(&transaction)),
        );
        let started = start_all(&self.target, &children, &scoped);

        let this = Arc::clone(&self);
        context.clone().spawn(async move {
            finish_all(&started).await;
            this.resolve(&transaction, &scope, &context);
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
