//! Periodic pool snapshot refresh

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use range_core::{PoolPriceContext, PoolState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::{PositionError, PositionResult};
use crate::ports::{PoolStateProvider, PortError};

const SERVICE: &str = "pool state";

/// Publishes the latest `PoolState` for one pool. `None` means still loading.
pub struct PoolStateWatcher {
    provider: Arc<dyn PoolStateProvider>,
    pool_id: String,
    interval: Duration,
    timeout: Duration,
    sender: Arc<watch::Sender<Option<PoolState>>>,
    /// Time of the last successful fetch that returned a snapshot
    observed_at: Arc<Mutex<Option<Instant>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PoolStateWatcher {
    pub fn new(
        provider: Arc<dyn PoolStateProvider>,
        pool_id: impl Into<String>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            provider,
            pool_id: pool_id.into(),
            interval,
            timeout,
            sender: Arc::new(sender),
            observed_at: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PoolState>> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> Option<PoolState> {
        self.sender.borrow().clone()
    }

    pub fn observed_at(&self) -> Option<Instant> {
        *self.observed_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Price context from the latest snapshot
    pub fn price_context(&self) -> PositionResult<PoolPriceContext> {
        PoolPriceContext::from_optional(self.sender.borrow().as_ref()).map_err(PositionError::from)
    }

    /// Fetch once and publish the result
    pub async fn refresh_now(&self) -> PositionResult<Option<PoolState>> {
        fetch_and_publish(self.provider.as_ref(), &self.pool_id, self.timeout, &self.sender, &self.observed_at).await
    }

    /// Start polling. Calling it again restarts the loop.
    pub fn start(&self) {
        let provider = Arc::clone(&self.provider);
        let sender = Arc::clone(&self.sender);
        let observed_at = Arc::clone(&self.observed_at);
        let pool_id = self.pool_id.clone();
        let (interval, timeout) = (self.interval, self.timeout);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = fetch_and_publish(provider.as_ref(), &pool_id, timeout, &sender, &observed_at).await {
                    warn!(pool = %pool_id, "Pool state refresh failed: {}", err);
                }
            }
        });

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(pool = %self.pool_id, interval_ms = interval.as_millis() as u64, "Pool state watcher started");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&self) {
        let handle = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.abort();
            debug!(pool = %self.pool_id, "Pool state watcher stopped");
        }
    }
}

impl Drop for PoolStateWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A failed fetch keeps the last published snapshot
async fn fetch_and_publish(
    provider: &dyn PoolStateProvider,
    pool_id: &str,
    timeout: Duration,
    sender: &watch::Sender<Option<PoolState>>,
    observed_at: &Mutex<Option<Instant>>,
) -> PositionResult<Option<PoolState>> {
    let fetched = match tokio::time::timeout(timeout, provider.get_pool_state(pool_id)).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Timeout),
    }
    .map_err(|e| PositionError::from_query(SERVICE, e))?;

    if let Some(state) = &fetched {
        *observed_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        sender.send_if_modified(|current| {
            if current.as_ref() == Some(state) {
                return false;
            }
            *current = Some(state.clone());
            true
        });
    }
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pool_state, FakePools};

    fn watcher(pools: Arc<FakePools>) -> PoolStateWatcher {
        PoolStateWatcher::new(pools, "weth-usdc-3000", Duration::from_secs(12), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_refresh_now_publishes() {
        let pools = Arc::new(FakePools::default());
        let watcher = watcher(pools.clone());

        assert_eq!(watcher.refresh_now().await.unwrap(), None);
        assert!(watcher.latest().is_none());
        assert!(watcher.price_context().is_err());
        assert!(watcher.observed_at().is_none());

        pools.set(Some(pool_state(1200)));
        watcher.refresh_now().await.unwrap();
        assert!(watcher.observed_at().is_some());
        assert_eq!(watcher.latest().map(|s| s.tick), Some(1200));
        assert_eq!(watcher.price_context().unwrap().pool_tick, 1200);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_snapshot() {
        let pools = Arc::new(FakePools::with_state(pool_state(-50)));
        let watcher = watcher(pools.clone());
        watcher.refresh_now().await.unwrap();

        *pools.failure.lock().unwrap() = Some(PortError::Network("rpc down".into()));
        assert!(matches!(
            watcher.refresh_now().await,
            Err(PositionError::ServiceFailure { service: "pool state", .. })
        ));
        assert_eq!(watcher.latest().map(|s| s.tick), Some(-50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_loop() {
        let pools = Arc::new(FakePools::with_state(pool_state(10)));
        let watcher = watcher(pools.clone());
        let mut updates = watcher.subscribe();

        watcher.start();
        assert!(watcher.is_running());
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().as_ref().map(|s| s.tick), Some(10));

        pools.set(Some(pool_state(70)));
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().as_ref().map(|s| s.tick), Some(70));
        assert_eq!(pools.call_count(), 2);

        watcher.stop();
        tokio::task::yield_now().await;
        assert!(!watcher.is_running());
    }
}
