use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// One-shot delay before the banner is surfaced.
///
/// Cancelled by `cancel` or by dropping it; either way `on_fire` never runs.
pub(crate) struct PromptTimer {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PromptTimer {
    pub(crate) fn spawn<F>(runtime: &Handle, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(async move {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = sleep(delay) => {
                    if !*shutdown_rx.borrow() {
                        on_fire();
                    }
                }
            }
        });
        Self { shutdown, handle }
    }

    pub(crate) fn cancel(self) {
        let _ = self.shutdown.send(true);
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let _timer = PromptTimer::spawn(&Handle::current(), Duration::from_millis(500), move || {
            flag.store(true, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(499)).await;
        assert!(!fired.load(Ordering::SeqCst));
        sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let timer = PromptTimer::spawn(&Handle::current(), Duration::from_millis(500), move || {
            flag.store(true, Ordering::SeqCst);
        });
        timer.cancel();

        sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_timer_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        drop(PromptTimer::spawn(
            &Handle::current(),
            Duration::from_millis(500),
            move || {
                flag.store(true, Ordering::SeqCst);
            },
        ));

        sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
