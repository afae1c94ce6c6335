//! Single-flight guard for exports.
//!
//! While a permit is alive, further acquisitions fail. Dropping the permit
//! reopens the guard after the configured release delay, which swallows
//! rapid duplicate triggers.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct ExportGuard {
    busy: Arc<watch::Sender<bool>>,
    release_delay: Duration,
}

impl ExportGuard {
    pub fn new(release_delay: Duration) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            busy: Arc::new(busy),
            release_delay,
        }
    }

    /// Close the guard, or `None` if an export is already in flight.
    pub fn try_acquire(&self) -> Option<ExportPermit> {
        let acquired = self.busy.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        acquired.then(|| ExportPermit {
            busy: Arc::clone(&self.busy),
            release_delay: self.release_delay,
        })
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Resolve once the guard is open again.
    pub async fn wait_idle(&self) {
        let mut rx = self.busy.subscribe();
        let _ = rx.wait_for(|busy| !*busy).await;
    }
}

/// Held for the duration of one export.
#[derive(Debug)]
pub struct ExportPermit {
    busy: Arc<watch::Sender<bool>>,
    release_delay: Duration,
}

impl Drop for ExportPermit {
    fn drop(&mut self) {
        let busy = Arc::clone(&self.busy);
        let delay = self.release_delay;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !delay.is_zero() => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    busy.send_replace(false);
                });
            }
            _ => {
                busy.send_replace(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_is_refused() {
        let guard = ExportGuard::new(Duration::ZERO);
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_is_delayed() {
        let guard = ExportGuard::new(Duration::from_millis(1000));
        drop(guard.try_acquire());

        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(guard.is_busy());

        guard.wait_idle().await;
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_wait_idle_when_open() {
        let guard = ExportGuard::new(Duration::from_millis(5));
        guard.wait_idle().await;
        assert!(!guard.is_busy());
    }
}
