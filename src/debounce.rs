use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// A single cancellable timer: scheduling replaces (and aborts) whatever was pending.
///
/// Dropping the debouncer aborts the pending task, so nothing fires after its owner is gone.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Runs `task` once the delay elapses without another `schedule` or `cancel`.
    ///
    /// The timer is a tokio task. Outside a runtime nothing is scheduled and `task` is dropped.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime; debounced task dropped");
            return;
        };
        let delay = self.delay;
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Detaches the pending task so the caller can await it.
    pub fn take(&mut self) -> Option<JoinHandle<()>> {
        self.pending.take()
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
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(
        counter: &Arc<AtomicUsize>,
        value: usize,
    ) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_latest_schedule_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        for value in 1..=3 {
            let runs = Arc::clone(&runs);
            let fired_task = counter_task(&fired, value);
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                fired_task.await;
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_restarts_on_each_schedule() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(counter_task(&fired, 1));
        tokio::time::sleep(Duration::from_millis(250)).await;
        debouncer.schedule(counter_task(&fired, 2));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(counter_task(&fired, 7));
        drop(debouncer);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn schedule_without_runtime_is_a_no_op() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(counter_task(&fired, 1));
        assert!(!debouncer.is_pending());
        assert!(debouncer.take().is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn take_lets_caller_await_the_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(counter_task(&fired, 5));
        let handle = debouncer.take().unwrap();
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 5);
    }
}
