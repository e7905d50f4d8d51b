use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// A one-shot deadline polled from a `select!` loop.
///
/// Cancelling is idempotent: cancelling a timer that was never armed or has
/// already fired does nothing. An unarmed timer never completes.
#[derive(Debug, Default)]
pub(crate) struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Completes once the deadline passes. The future does not borrow the
    /// timer, so re-arming inside the `select!` handler is allowed.
    pub fn elapsed(&self) -> impl Future<Output = ()> + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_deadline() {
        let mut timer = Timer::default();
        timer.arm(Duration::from_secs(5));
        let start = Instant::now();
        timer.elapsed().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = Timer::default();
        timer.arm(Duration::from_secs(1));
        timer.cancel();
        timer.cancel();
        assert!(!timer.is_armed());
        let result = tokio::time::timeout(Duration::from_secs(10), timer.elapsed()).await;
        assert!(result.is_err());
    }
}
