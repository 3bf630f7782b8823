use std::sync::Arc;

use async_trait::async_trait;

use super::{Command, CommandKind, Completion};
use crate::context::ContextFactory;
use crate::fault::Fault;
use crate::pipeline::Pipeline;
use crate::types::EtlError;

/// Leaf command running one pipeline definition.
///
/// Failures are never returned to the caller; they are published as faults
/// tagged with the owning target and the pipeline name.
pub struct ExecutePipeline {
    target: String,
    pipeline: Arc<dyn Pipeline>,
    completion: Completion,
}

impl ExecutePipeline {
    pub fn new(target: impl Into<String>, pipeline: Arc<dyn Pipeline>) -> Self {
        ExecutePipeline {
            target: target.into(),
            pipeline,
            completion: Completion::new(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }
}

#[async_trait]
impl Command for ExecutePipeline {
    fn name(&self) -> &str {
        self.pipeline.name()
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Pipeline
    }

    fn completion(&self) -> &Completion {
        &self.completion
    }

    fn execute(self: Arc<Self>, factory: Arc<dyn ContextFactory>) -> Result<(), EtlError> {
        if !self.completion.start() {
            return Err(EtlError::AlreadyExecuted(self.name().to_string()));
        }
        let context = factory.create_and_start();

        let this = Arc::clone(&self);
        context.clone().spawn(async move {
            let pipeline = Arc::clone(&this.pipeline);
            let run_context = context.clone();
            // Run in its own task so a panic surfaces as a JoinError.
            let run = context.spawn(async move { pipeline.run(run_context).await });

            let error = match run.await {
                Ok(Ok(())) => None,
                Ok(Err(source)) => Some(EtlError::Pipeline {
                    pipeline: this.name().to_string(),
                    source,
                }),
                Err(join_error) => Some(EtlError::PipelineAborted {
                    pipeline: this.name().to_string(),
                    reason: join_error.to_string(),
                }),
            };

            match error {
                Some(error) => {
                    tracing::warn!(target_name = %this.target, pipeline = this.name(), %error, "pipeline faulted");
                    context.publish(Fault::new(&this.target, this.name(), error));
                }
                None => tracing::debug!(target_name = %this.target, pipeline = this.name(), "pipeline finished"),
            }
            this.completion.finish();
            context.stop();
        });
        Ok(())
    }
}
