use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts faults raised beneath a point of the execution tree.
///
/// Scopes form a chain: recording a fault bumps the scope and every
/// ancestor, so the run scope at the top sees every fault of the run.
#[derive(Debug, Default)]
pub struct FaultScope {
    faults: AtomicUsize,
    parent: Option<Arc<FaultScope>>,
}

impl FaultScope {
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A root scope that already holds `faults` faults.
    pub fn seeded(faults: usize) -> Arc<Self> {
        Arc::new(FaultScope {
            faults: AtomicUsize::new(faults),
            parent: None,
        })
    }

    pub fn child(parent: &Arc<FaultScope>) -> Arc<Self> {
        Arc::new(FaultScope {
            faults: AtomicUsize::new(0),
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn record(&self) {
        self.faults.fetch_add(1, Ordering::SeqCst);
        if let Some(parent) = &self.parent {
            parent.record();
        }
    }

    /// Faults recorded in this scope or beneath it.
    pub fn fault_count(&self) -> usize {
        self.faults.load(Ordering::SeqCst)
    }

    /// True when neither this scope nor any enclosing scope has seen a fault.
    pub fn is_clear(&self) -> bool {
        self.fault_count() == 0 && self.parent.as_ref().map_or(true, |p| p.is_clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reaches_ancestors() {
        let run = FaultScope::root();
        let tx = FaultScope::child(&run);

        tx.record();

        assert_eq!(tx.fault_count(), 1);
        assert_eq!(run.fault_count(), 1);
        assert!(!run.is_clear());
    }

    #[test]
    fn test_sibling_fault_taints_child() {
        let run = FaultScope::root();
        let tx = FaultScope::child(&run);
        let sibling = FaultScope::child(&run);

        assert!(tx.is_clear());
        sibling.record();

        assert_eq!(tx.fault_count(), 0);
        assert!(!tx.is_clear());
    }

    #[test]
    fn test_seeded_scope_taints_children() {
        let run = FaultScope::seeded(2);
        let tx = FaultScope::child(&run);

        assert_eq!(run.fault_count(), 2);
        assert!(!tx.is_clear());
        assert!(FaultScope::seeded(0).is_clear());
    }
}
