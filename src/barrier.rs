use tokio::sync::watch;

/// One-shot readiness gate. Starts pending, resolves once, never reverts.
pub struct StartBarrier {
    ready: watch::Sender<bool>,
}

impl Default for StartBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl StartBarrier {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self { ready }
    }

    pub fn is_resolved(&self) -> bool {
        *self.ready.borrow()
    }

    /// Suspend until resolved; returns immediately afterwards
    pub async fn wait(&self) {
        if self.is_resolved() {
            return;
        }
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn resolve(&self) {
        if !self.ready.send_replace(true) {
            log::debug!("Start barrier resolved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn waiters_block_until_resolved() {
        let barrier = Arc::new(StartBarrier::new());
        let waiter = {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move { barrier.wait().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        barrier.resolve();
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(barrier.is_resolved());
    }

    #[tokio::test]
    async fn resolved_barrier_is_a_no_op() {
        let barrier = StartBarrier::new();
        barrier.resolve();
        barrier.resolve();
        timeout(Duration::from_millis(10), barrier.wait()).await.unwrap();
        assert!(barrier.is_resolved());
    }
}
