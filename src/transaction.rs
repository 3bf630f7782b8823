//! Ambient transaction shared by the children of a transactional container.
//!
//! Leaf work enlists the resources it touches; the container that began the
//! transaction is the only party that commits or rolls it back.

use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use uuid::Uuid;

use crate::types::{EtlError, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    Unspecified,
    Chaos,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

/// A resource taking part in a transaction, e.g. a database connection with
/// uncommitted writes.
pub trait Enlistment: Send + Sync {
    fn commit(&self) -> Result<(), PipelineError>;
    fn rollback(&self);
}

pub struct Transaction {
    id: Uuid,
    isolation_level: IsolationLevel,
    enlistments: Mutex<Vec<Box<dyn Enlistment>>>,
    outcome: OnceLock<TransactionOutcome>,
}

impl Transaction {
    pub(crate) fn begin(isolation_level: IsolationLevel) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            isolation_level,
            enlistments: Mutex::new(Vec::new()),
            outcome: OnceLock::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// `None` while the transaction is still active.
    pub fn outcome(&self) -> Option<TransactionOutcome> {
        self.outcome.get().copied()
    }

    pub fn enlist(&self, enlistment: Box<dyn Enlistment>) -> Result<(), EtlError> {
        let mut enlistments = self.enlistments.lock().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock so an enlistment cannot slip past resolution.
        if self.outcome.get().is_some() {
            return Err(EtlError::TransactionResolved(self.id));
        }
        enlistments.push(enlistment);
        Ok(())
    }

    /// Commits every enlistment in order. If one refuses, the rest are rolled
    /// back and the transaction ends rolled back.
    pub(crate) fn commit(&self) -> Result<TransactionOutcome, EtlError> {
        let mut enlistments = self.enlistments.lock().unwrap_or_else(PoisonError::into_inner);
        if self.outcome.get().is_some() {
            return Err(EtlError::TransactionResolved(self.id));
        }

        let mut pending = enlistments.drain(..);
        while let Some(enlistment) = pending.next() {
            if let Err(source) = enlistment.commit() {
                for rest in pending {
                    rest.rollback();
                }
                let _ = self.outcome.set(TransactionOutcome::RolledBack);
                return Err(EtlError::Commit {
                    id: self.id,
                    source,
                });
            }
        }

        let _ = self.outcome.set(TransactionOutcome::Committed);
        Ok(TransactionOutcome::Committed)
    }

    pub(crate) fn rollback(&self) -> Result<TransactionOutcome, EtlError> {
        let mut enlistments = self.enlistments.lock().unwrap_or_else(PoisonError::into_inner);
        if self.outcome.get().is_some() {
            return Err(EtlError::TransactionResolved(self.id));
        }

        for enlistment in enlistments.drain(..) {
            enlistment.rollback();
        }
        let _ = self.outcome.set(TransactionOutcome::RolledBack);
        Ok(TransactionOutcome::RolledBack)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("isolation_level", &self.isolation_level)
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
    }

    struct Resource {
        name: &'static str,
        refuse: bool,
        journal: Arc<Journal>,
    }

    impl Enlistment for Resource {
        fn commit(&self) -> Result<(), PipelineError> {
            if self.refuse {
                return Err("constraint violation".into());
            }
            self.journal.entries.lock().unwrap().push(format!("commit {}", self.name));
            Ok(())
        }

        fn rollback(&self) {
            self.journal.entries.lock().unwrap().push(format!("rollback {}", self.name));
        }
    }

    fn resource(name: &'static str, refuse: bool, journal: &Arc<Journal>) -> Box<dyn Enlistment> {
        Box::new(Resource {
            name,
            refuse,
            journal: Arc::clone(journal),
        })
    }

    #[test]
    fn test_commit_all() {
        let journal = Arc::new(Journal::default());
        let tx = Transaction::begin(IsolationLevel::ReadCommitted);
        tx.enlist(resource("a", false, &journal)).unwrap();
        tx.enlist(resource("b", false, &journal)).unwrap();

        assert_eq!(tx.commit().unwrap(), TransactionOutcome::Committed);
        assert_eq!(*journal.entries.lock().unwrap(), vec!["commit a", "commit b"]);
        assert_eq!(tx.isolation_level(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_refused_commit_rolls_back_the_rest() {
        let journal = Arc::new(Journal::default());
        let tx = Transaction::begin(IsolationLevel::default());
        tx.enlist(resource("a", false, &journal)).unwrap();
        tx.enlist(resource("b", true, &journal)).unwrap();
        tx.enlist(resource("c", false, &journal)).unwrap();

        let err = tx.commit().unwrap_err();

        assert!(matches!(err, EtlError::Commit { .. }));
        assert_eq!(tx.outcome(), Some(TransactionOutcome::RolledBack));
        assert_eq!(*journal.entries.lock().unwrap(), vec!["commit a", "rollback c"]);
    }

    #[test]
    fn test_resolves_once() {
        let journal = Arc::new(Journal::default());
        let tx = Transaction::begin(IsolationLevel::Snapshot);

        assert_eq!(tx.rollback().unwrap(), TransactionOutcome::RolledBack);
        assert!(tx.commit().is_err());
        assert!(tx.enlist(resource("late", false, &journal)).is_err());
        assert!(journal.entries.lock().unwrap().is_empty());
    }
}
