//! Per-operation rate limiter.
//!
//! Spaces out successive invocations of the same named operation:
//! a longer cooldown for the configured moderation subset, a shorter
//! default otherwise. All acquisitions funnel through one async mutex
//! held across the cooldown sleep, so concurrent callers are totally
//! ordered and the per-name timestamps cannot be read and written
//! racily.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub struct RateLimiter {
    default_cooldown: Duration,
    moderation_cooldown: Duration,
    moderation_tools: HashSet<String>,
    last_acquired: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(
        default_cooldown: Duration,
        moderation_cooldown: Duration,
        moderation_tools: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            default_cooldown,
            moderation_cooldown,
            moderation_tools: moderation_tools.into_iter().collect(),
            last_acquired: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &steward_config::CooldownConfig) -> Self {
        Self::new(
            config.default_cooldown(),
            config.moderation_cooldown(),
            config.moderation_tools.iter().cloned(),
        )
    }

    fn cooldown_for(&self, name: &str) -> Duration {
        if self.moderation_tools.contains(name) {
            self.moderation_cooldown
        } else {
            self.default_cooldown
        }
    }

    /// Wait until `name` may be invoked again, then record the
    /// acquisition.
    ///
    /// The lock stays held across the sleep: a second caller for any
    /// name waits until the first caller's acquisition completes.
    pub async fn acquire(&self, name: &str) {
        let mut last_acquired = self.last_acquired.lock().await;

        if let Some(last) = last_acquired.get(name) {
            let cooldown = self.cooldown_for(name);
            let elapsed = last.elapsed();
            if elapsed < cooldown {
                let wait = cooldown - elapsed;
                debug!(tool = name, wait_ms = wait.as_millis() as u64, "Cooldown");
                tokio::time::sleep(wait).await;
            }
        }

        last_acquired.insert(name.to_string(), Instant::now());
    }

    /// Clear all recorded acquisitions.
    pub async fn reset(&self) {
        self.last_acquired.lock().await.clear();
    }
}
