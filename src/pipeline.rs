//! The interface of the pipeline engine as seen by the execution tree.

use std::future::Future;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::types::PipelineError;

/// A named pipeline definition that can be asked to run.
///
/// A run may publish any number of faults through `context` while it works;
/// an `Err` return is published on its behalf.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, context: ExecutionContext) -> Result<(), PipelineError>;
}

/// Adapts an async closure into a [`Pipeline`].
pub struct FnPipeline<F> {
    name: String,
    run: F,
}

pub fn pipeline_fn<F, Fut>(name: impl Into<String>, run: F) -> FnPipeline<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PipelineError>> + Send,
{
    FnPipeline {
        name: name.into(),
        run,
    }
}

#[async_trait]
impl<F, Fut> Pipeline for FnPipeline<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PipelineError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: ExecutionContext) -> Result<(), PipelineError> {
        (self.run)(context).await
    }
}
