//! Fault events and the channel that carries them from the execution tree
//! to the target listening for them.

pub mod channel;
pub mod scope;

pub use channel::{FaultChannel, FaultSubscription, EXCEPTION_TOPIC};
pub use scope::FaultScope;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::EtlError;

/// An error raised somewhere in an execution tree, tagged with the target
/// and command that raised it.
///
/// Faults are cheap to clone; every subscriber receives its own copy.
#[derive(Debug, Clone)]
pub struct Fault {
    target: String,
    command: String,
    error: Arc<EtlError>,
}

impl Fault {
    pub fn new(target: impl Into<String>, command: impl Into<String>, error: EtlError) -> Self {
        Fault {
            target: target.into(),
            command: command.into(),
            error: Arc::new(error),
        }
    }

    /// The fault recorded when a target exceeds its time out.
    pub fn timeout(target: &str, timeout: Duration) -> Self {
        Fault::new(
            target,
            target,
            EtlError::Timeout {
                target: target.to_string(),
                timeout,
            },
        )
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Name of the command or pipeline that raised the fault.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn error(&self) -> &EtlError {
        &self.error
    }

    pub fn is_timeout(&self) -> bool {
        self.error.is_timeout()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.target, self.command, self.error)
    }
}
