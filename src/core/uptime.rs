//! Background task that keeps the uptime metric moving.

use super::store::RecordStore;
use crate::storage::Storage;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

/// Largest uptime change applied per tick, in percentage points.
pub const MAX_JITTER: f64 = 0.05;

/// Spawns a task that perturbs the stored uptime every `period`.
///
/// The first tick fires after one full period. Failures are logged and the
/// loop keeps going; abort the returned handle to stop it.
pub fn spawn_uptime_monitor<S>(store: Arc<RecordStore<S>>, period: Duration) -> JoinHandle<()>
where
    S: Storage + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.perturb_uptime(random_jitter()).await {
                Ok(uptime) => debug!("Uptime refreshed: {:.2}%", uptime),
                Err(e) => warn!("Failed to refresh uptime metric: {}", e),
            }
        }
    })
}

/// Uniform-ish value in `[-MAX_JITTER, MAX_JITTER]` from a random byte.
fn random_jitter() -> f64 {
    let byte = f64::from(Uuid::new_v4().as_bytes()[0]);
    (byte / 255.0 * 2.0 - 1.0) * MAX_JITTER
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::events::METRICS_UPDATED, errors::Result, test_utils::setup_test_store};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_random_jitter_bounds() {
        for _ in 0..1_000 {
            let jitter = random_jitter();
            assert!((-MAX_JITTER..=MAX_JITTER).contains(&jitter));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_ticks_and_stops() -> Result<()> {
        let store = Arc::new(setup_test_store().await?);
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let ticks = Arc::clone(&ticks);
            store.on(METRICS_UPDATED, move |_| {
                ticks.fetch_add(1, Ordering::SeqCst);
            });
        }

        let handle = spawn_uptime_monitor(Arc::clone(&store), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.abort();
        let _ = handle.await;

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        let uptime = store.stored_uptime().await?;
        assert!((95.0..=100.0).contains(&uptime));
        Ok(())
    }
}
