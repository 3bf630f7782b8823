use std::time::Duration;

use thiserror::Error;

use crate::target::TargetState;

/// Error returned by a pipeline run.
pub type PipelineError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while configuring or executing targets.
#[derive(Debug, Error)]
pub enum EtlError {
    /// No pipeline with this name was registered.
    #[error("could not find pipeline '{0}'")]
    UnknownPipeline(String),

    /// A target with this name is already registered.
    #[error("target '{0}' is already registered")]
    DuplicateTarget(String),

    /// A pipeline with this name is already registered.
    #[error("pipeline '{0}' is already registered")]
    DuplicatePipeline(String),

    /// The target did not finish within its time out.
    #[error(
        "the time out period for {target} has passed! {timeout:?} has passed and the process is still running"
    )]
    Timeout { target: String, timeout: Duration },

    /// Children can only be added before the container starts executing.
    #[error("cannot add '{child}' to '{container}' after execution has started")]
    ContainerStarted { container: String, child: String },

    /// A command may only be executed once.
    #[error("command '{0}' was already executed")]
    AlreadyExecuted(String),

    #[error("target '{target}' cannot {operation} while {state}")]
    InvalidState {
        target: String,
        operation: &'static str,
        state: TargetState,
    },

    /// A pipeline run returned an error.
    ///
    /// Preserves the source error for debugging.
    #[error("pipeline '{pipeline}' failed")]
    Pipeline {
        pipeline: String,
        #[source]
        source: PipelineError,
    },

    /// The task running a pipeline panicked or was aborted.
    #[error("pipeline '{pipeline}' did not run to completion: {reason}")]
    PipelineAborted { pipeline: String, reason: String },

    #[error("transaction {0} was already resolved")]
    TransactionResolved(uuid::Uuid),

    /// An enlisted resource refused to commit.
    #[error("transaction {id} failed to commit")]
    Commit {
        id: uuid::Uuid,
        #[source]
        source: PipelineError,
    },

    #[error("no tokio runtime is available")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl EtlError {
    /// Returns true for the error synthesized when a target times out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EtlError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_pipeline_error_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = EtlError::Pipeline {
            pipeline: "Orders".to_string(),
            source: Box::new(source),
        };

        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "pipeline 'Orders' failed");
    }

    #[test]
    fn test_error_display() {
        let err = EtlError::UnknownPipeline("Customers".to_string());
        assert_eq!(err.to_string(), "could not find pipeline 'Customers'");

        let err = EtlError::InvalidState {
            target: "Load".to_string(),
            operation: "run",
            state: TargetState::Running,
        };
        assert_eq!(err.to_string(), "target 'Load' cannot run while running");
    }

    #[test]
    fn test_timeout_display() {
        let err = EtlError::Timeout {
            target: "Load".to_string(),
            timeout: Duration::from_secs(3),
        };

        assert!(err.is_timeout());
        assert!(err.to_string().starts_with("the time out period for Load has passed!"));
        assert!(!EtlError::DuplicateTarget("Load".to_string()).is_timeout());
    }
}
