use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Completion state shared by every command.
///
/// `done` fires when the command's work has really ended; `forced` fires when
/// waiters were told to stop waiting. Either one releases a waiter.
#[derive(Debug, Default)]
pub struct Completion {
    started: AtomicBool,
    forced_once: AtomicBool,
    done: CancellationToken,
    forced: CancellationToken,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the command started. Returns false if it already was.
    pub fn start(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    pub fn finish(&self) {
        self.done.cancel();
    }

    /// Releases every waiter. Returns true only for the call that actually
    /// forced the end.
    pub fn force_end(&self) -> bool {
        if self.forced_once.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.forced.cancel();
        true
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    pub fn is_forced(&self) -> bool {
        self.forced.is_cancelled()
    }

    /// Resolves once the work has ended, regardless of any forced end.
    pub async fn finished(&self) {
        self.done.cancelled().await
    }

    /// Resolves once the work has ended or the end was forced.
    pub async fn completed(&self) {
        tokio::select! {
            _ = self.done.cancelled() => {}
            _ = self.forced.cancelled() => {}
        }
    }

    /// Returns false if neither happened within `timeout`.
    pub async fn wait(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.completed()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_start_once() {
        let completion = Completion::new();
        assert!(completion.start());
        assert!(!completion.start());
        assert!(completion.is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let completion = Completion::new();
        assert!(!completion.wait(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_finish_releases_waiters() {
        let completion = Completion::new();
        completion.finish();

        assert!(completion.wait(Duration::from_millis(50)).await);
        assert!(completion.is_done());
        assert!(!completion.is_forced());
    }

    #[tokio::test]
    async fn test_force_end_is_idempotent() {
        let completion = Arc::new(Completion::new());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let completion = Arc::clone(&completion);
                tokio::spawn(async move { completion.force_end() })
            })
            .collect();
        let mut first = 0;
        for handle in handles {
            if handle.await.unwrap() {
                first += 1;
            }
        }

        assert_eq!(first, 1);
        assert!(completion.wait(Duration::from_millis(50)).await);
        assert!(!completion.is_done());
    }
}
