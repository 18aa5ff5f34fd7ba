//
// debounce.rs
//
// Re-armable one-shot timer
//

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One-shot timer that can be re-armed, cancelling the previous deadline.
///
/// At most one callback is armed at any time. Dropping the debouncer cancels
/// the armed callback. Must be used from within a tokio runtime.
#[derive(Debug, Default)]
pub struct Debouncer {
    armed: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once `delay` has elapsed without another `arm` or `cancel`.
    pub fn arm<F>(&mut self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => callback(),
            }
        });
        self.armed = Some((token, handle));
    }

    /// Cancel the armed callback, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some((token, handle)) => {
                let pending = !handle.is_finished();
                token.cancel();
                pending
            }
            None => false,
        }
    }

    /// Whether a callback is armed and has not fired yet
    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .map(|(token, handle)| !token.is_cancelled() && !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let make = move || -> Box<dyn FnOnce() + Send> {
            let c = c.clone();
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.arm(Duration::from_millis(800), make());
        assert!(debouncer.is_armed());

        tokio::time::sleep(Duration::from_millis(799)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_coalesces() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        for _ in 0..5 {
            debouncer.arm(Duration::from_millis(800), make());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.arm(Duration::from_millis(100), make());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (count, make) = counter();
        {
            let mut debouncer = Debouncer::new();
            debouncer.arm(Duration::from_millis(100), make());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
