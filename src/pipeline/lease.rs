// Run lease: keeps the store's run lock row fresh while a batch is running.
//
// The lock row is reclaimed by other processes once it is older than the
// stale window, so a long batch has to re-stamp it. Renewal is due after a
// quarter of the window. If the row no longer names us, another process has
// taken over and the run must stop.

use anyhow::Result;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::db::ArticleStore;
use crate::error::EngineError;

/// The lock row held by one batch run.
#[derive(Debug)]
pub struct RunLease {
    owner: String,
    /// Re-stamp the row once this much time has passed since the last stamp
    renew_after: Duration,
    last_renewed: Instant,
}

impl RunLease {
    /// A lease for a lock `owner` just acquired with a `stale_after_secs` window.
    pub fn new(owner: String, stale_after_secs: i64) -> Self {
        let window = Duration::from_secs(stale_after_secs.max(1) as u64);
        Self {
            owner,
            renew_after: window / 4,
            last_renewed: Instant::now(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Re-stamp the lock row now.
    ///
    /// Fails with `EngineError::LockLost` when another process reclaimed it.
    pub async fn renew(&mut self, store: &dyn ArticleStore) -> Result<()> {
        if !store.refresh_run_lock(&self.owner).await? {
            return Err(EngineError::LockLost.into());
        }
        self.last_renewed = Instant::now();
        debug!(owner = %self.owner, "Run lock renewed");
        Ok(())
    }

    /// Re-stamp the lock row if a quarter of the stale window has passed.
    pub async fn renew_if_due(&mut self, store: &dyn ArticleStore) -> Result<()> {
        if self.last_renewed.elapsed() >= self.renew_after {
            self.renew(store).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_renew_keeps_our_lock() {
        let store = crate::db::open_in_memory().unwrap();
        assert!(store.try_acquire_run_lock("a", 60).await.unwrap());

        let mut lease = RunLease::new("a".to_string(), 60);
        lease.renew(store.as_ref()).await.unwrap();
        assert!(!store.try_acquire_run_lock("b", 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_renew_detects_takeover() {
        let store = crate::db::open_in_memory().unwrap();
        assert!(store.try_acquire_run_lock("a", 60).await.unwrap());
        let mut lease = RunLease::new("a".to_string(), 60);

        store.release_run_lock("a").await.unwrap();
        assert!(store.try_acquire_run_lock("b", 60).await.unwrap());

        let err = lease.renew(store.as_ref()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::LockLost)
        ));
    }

    #[tokio::test]
    async fn test_renew_if_due_skips_fresh_lease() {
        let store = crate::db::open_in_memory().unwrap();
        let mut lease = RunLease::new("a".to_string(), 3600);
        // No lock row at all, but nothing is due yet
        lease.renew_if_due(store.as_ref()).await.unwrap();
    }
}
