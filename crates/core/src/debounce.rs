use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Default quiet period before a debounced action runs.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// Debounce execution of a closure after a period of inactivity.
///
/// At most one action is pending at a time. Dropping the debouncer cancels
/// it.
pub struct Debouncer {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create a new `Debouncer` with the specified delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            handle: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Trigger the debouncer with the given action.
    ///
    /// If called again before the delay elapses, the pending action is
    /// cancelled and rescheduled. Must be called within a Tokio runtime.
    pub fn call<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            action();
        }));
    }

    /// Cancel the pending action, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Returns true while an action is scheduled and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
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
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn debouncer_runs_once_after_delay() {
        let count = Arc::new(Mutex::new(0));
        let mut d = Debouncer::new(Duration::from_millis(50));
        let c = count.clone();
        d.call(move || {
            *c.lock().unwrap() += 1;
        });
        // call again before delay
        tokio::time::sleep(Duration::from_millis(20)).await;
        let c = count.clone();
        d.call(move || {
            *c.lock().unwrap() += 1;
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(*count.lock().unwrap(), 0, "delay restarts on every call");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(*count.lock().unwrap(), 1);
        assert!(!d.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn default_delay_works() {
        let called = Arc::new(Mutex::new(false));
        let c = called.clone();
        let mut d = Debouncer::default();
        assert_eq!(d.delay(), DEFAULT_DELAY);
        d.call(move || {
            *c.lock().unwrap() = true;
        });
        assert!(d.is_pending());
        tokio::time::sleep(DEFAULT_DELAY + Duration::from_millis(10)).await;
        assert!(*called.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let called = Arc::new(Mutex::new(false));
        let c = called.clone();
        let mut d = Debouncer::new(Duration::from_millis(50));
        d.call(move || {
            *c.lock().unwrap() = true;
        });
        d.cancel();
        d.cancel();
        assert!(!d.is_pending());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_action() {
        let called = Arc::new(Mutex::new(false));
        let c = called.clone();
        let mut d = Debouncer::new(Duration::from_millis(50));
        d.call(move || {
            *c.lock().unwrap() = true;
        });
        drop(d);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!*called.lock().unwrap());
    }
}
