use std::sync::Arc;

use crate::fault::Fault;
use crate::types::EtlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failure,
}

/// Outcome of one target run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    status: ExecutionStatus,
    faults: Vec<Fault>,
    errors: Vec<Arc<EtlError>>,
}

impl ExecutionResult {
    /// Failure if any fault was captured, Success otherwise.
    pub fn new(faults: Vec<Fault>, errors: Vec<Arc<EtlError>>) -> Self {
        let status = if faults.is_empty() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failure
        };
        ExecutionResult {
            status,
            faults,
            errors,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Configuration errors of the configuration the target belongs to.
    pub fn errors(&self) -> &[Arc<EtlError>] {
        &self.errors
    }
}
