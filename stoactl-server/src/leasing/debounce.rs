//! Trailing-edge debounce for dashboard rebuilds.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Handle to a background task that runs an action once triggers go quiet.
///
/// Every [`trigger`](Debouncer::trigger) restarts the delay, so a burst of
/// triggers yields one run. When the action returns `false` (e.g. a rebuild
/// was already running) the timer is re-armed and the action retried.
#[derive(Debug, Clone)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    /// Spawn the debounce task on the current runtime.
    pub fn spawn<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let mut open = true;
                loop {
                    let sleep = tokio::time::sleep(delay);
                    tokio::pin!(sleep);
                    loop {
                        tokio::select! {
                            _ = &mut sleep => break,
                            msg = rx.recv(), if open => match msg {
                                Some(()) => sleep.as_mut().reset(Instant::now() + delay),
                                None => open = false,
                            },
                        }
                    }

                    if action().await {
                        break;
                    }
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "debounced action deferred, re-arming");
                }
            }
            tracing::debug!("debouncer stopped");
        });

        Self { tx }
    }

    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::warn!("debouncer task is gone; trigger dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(delay: Duration, succeed_after: usize) -> (Debouncer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let debouncer = Debouncer::spawn(delay, move || {
            let counter = counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst) + 1 >= succeed_after }
        });
        (debouncer, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_once() {
        let (debouncer, calls) = counting(Duration::from_secs(5), 1);

        for _ in 0..10 {
            debouncer.trigger();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_run_separately() {
        let (debouncer, calls) = counting(Duration::from_secs(1), 1);

        debouncer.trigger();
        tokio::time::sleep(Duration::from_secs(2)).await;
        debouncer.trigger();
        debouncer.trigger();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_action_is_retried() {
        let (debouncer, calls) = counting(Duration::from_secs(1), 3);

        debouncer.trigger();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
