// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dashboard::{Dashboard, Trigger};

/// Owns the refresh loop; dropping it stops the loop (dashboard unmount).
#[derive(Debug)]
pub struct SchedulerHandle(JoinHandle<()>);

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Refresh immediately, then every `interval`. Each tick runs as its own task so a slow
/// fetch never delays the next one; the store keeps whichever response is newest.
pub fn spawn_refresh_scheduler(dashboard: Arc<Dashboard>, interval: Duration) -> SchedulerHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut trigger = Trigger::Initial;
        loop {
            ticker.tick().await;
            counter!("refresh_ticks_total").increment(1);

            let d = dashboard.clone();
            tokio::spawn(async move {
                let out = d.refresh(trigger).await;
                tracing::debug!(
                    target: "ingest",
                    seq = out.seq,
                    ok = out.ok,
                    applied = out.applied,
                    records = out.records,
                    "refresh tick"
                );
            });
            trigger = Trigger::Timer;
        }
    });
    SchedulerHandle(handle)
}
