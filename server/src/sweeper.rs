//! Periodic eviction of players that stopped sending updates

use crate::registry::PlayerRegistry;
use log::info;
use shared::get_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Sweeper {
    registry: Arc<PlayerRegistry>,
    interval: Duration,
    timeout_ms: u64,
}

impl Sweeper {
    pub fn new(registry: Arc<PlayerRegistry>, interval: Duration, timeout_ms: u64) -> Self {
        Self {
            registry,
            interval,
            timeout_ms,
        }
    }

    /// Removes every player idle for longer than the timeout as of `now`
    pub async fn sweep_once(&self, now: u64) -> Vec<String> {
        let evicted = self.registry.evict_stale(now, self.timeout_ms).await;
        for id in &evicted {
            info!("Removing player {} after {}ms without updates", id, self.timeout_ms);
        }
        evicted
    }

    /// Spawns the sweep loop; it runs until the runtime shuts down
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.sweep_once(get_timestamp()).await;
            }
        })
    }
}
