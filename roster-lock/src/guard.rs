//! Scoped lock hold.

use std::sync::Arc;

use tracing::{debug, warn};

use roster_core::error::Result;
use roster_core::traits::LockService;
use roster_core::types::LockHandle;

/// A held lock that is given back on every exit path.
///
/// Call [`LockGuard::release`] once the protected work is done. If the guard is
/// dropped while still holding (a panic, or the owning future was cancelled),
/// the release is spawned onto the current Tokio runtime; without a runtime the
/// lock is left to lapse with its lease.
pub struct LockGuard {
    service: Arc<dyn LockService>,
    handle: Option<LockHandle>,
    key: String,
}

impl LockGuard {
    /// Tries to take `key` without waiting. `Ok(None)` means somebody holds it.
    pub async fn try_acquire(service: Arc<dyn LockService>, key: &str) -> Result<Option<Self>> {
        let handle = service.acquire(key).await?;
        Ok(handle.map(|handle| Self {
            service,
            handle: Some(handle),
            key: key.to_string(),
        }))
    }

    /// Key this guard protects.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying handle, until released.
    pub fn handle(&self) -> Option<&LockHandle> {
        self.handle.as_ref()
    }

    /// Releases the lock now.
    pub async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            self.service.release(&handle).await;
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(key = %self.key, "Lock guard dropped while held, releasing in background");
                let service = Arc::clone(&self.service);
                runtime.spawn(async move {
                    service.release(&handle).await;
                });
            }
            Err(_) => {
                warn!(key = %self.key, "Lock guard dropped outside a runtime; lock will lapse with its lease");
            }
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("held", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::MemoryLockService;

    async fn wait_until_free(locks: &MemoryLockService, key: &str) -> bool {
        for _ in 0..50 {
            if !locks.is_held(key) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_guard_release() {
        let locks = Arc::new(MemoryLockService::new());

        let guard = LockGuard::try_acquire(locks.clone(), "U1").await.unwrap().unwrap();
        assert_eq!(guard.key(), "U1");
        assert!(guard.handle().is_some());
        assert!(locks.is_held("U1"));

        guard.release().await;
        assert!(!locks.is_held("U1"));
    }

    #[tokio::test]
    async fn test_guard_busy() {
        let locks = Arc::new(MemoryLockService::new());

        let _held = LockGuard::try_acquire(locks.clone(), "U1").await.unwrap().unwrap();
        let second = LockGuard::try_acquire(locks.clone(), "U1").await.unwrap();

        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_in_background() {
        let locks = Arc::new(MemoryLockService::new());

        {
            let _guard = LockGuard::try_acquire(locks.clone(), "U1").await.unwrap().unwrap();
        }

        assert!(wait_until_free(&locks, "U1").await);
    }

    #[tokio::test]
    async fn test_cancelled_holder_releases() {
        let locks = Arc::new(MemoryLockService::new());
        let inner = locks.clone();

        let task = tokio::spawn(async move {
            let _guard = LockGuard::try_acquire(inner, "U1").await.unwrap().unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        while !locks.is_held("U1") {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        assert!(wait_until_free(&locks, "U1").await);
    }

    #[test]
    fn test_drop_outside_runtime_leaves_lease() {
        let locks = Arc::new(MemoryLockService::new());

        let guard = tokio_test::block_on(LockGuard::try_acquire(locks.clone(), "U1"))
            .unwrap()
            .unwrap();
        drop(guard);

        assert!(locks.is_held("U1"));
    }
}
