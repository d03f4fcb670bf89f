// ── Heartbeat reporter ──
//
// Periodically tells the platform this hub is alive. Every failure is
// logged and swallowed; the next tick is the only retry.

use std::time::Duration;

use controll_api::{HeartbeatPayload, PlatformClient, SupervisorClient};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Device id reported when the hub token carries no `_` separator.
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

/// Device id derived from the hub token: the part before the first `_`.
pub fn device_id(hub_token: &str) -> String {
    hub_token
        .split_once('_')
        .map_or(UNKNOWN_DEVICE_ID, |(id, _)| id)
        .to_owned()
}

/// What a single heartbeat cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No hub token configured; nothing was sent.
    Skipped,
    /// The platform accepted the heartbeat.
    Sent,
    /// The POST failed or was rejected.
    Failed,
}

#[derive(Debug, Clone)]
pub struct HeartbeatReporter {
    supervisor: SupervisorClient,
    platform: PlatformClient,
    hub_token: Option<SecretString>,
    interval: Duration,
    started: Instant,
}

impl HeartbeatReporter {
    /// `interval` must be non-zero; config validation guarantees it.
    pub fn new(
        supervisor: SupervisorClient,
        platform: PlatformClient,
        hub_token: Option<SecretString>,
        interval: Duration,
    ) -> Self {
        Self {
            supervisor,
            platform,
            hub_token: hub_token.filter(|t| !t.expose_secret().is_empty()),
            interval,
            started: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Gather hub health. Each field is best-effort: an unreachable
    /// Supervisor yields `ha_version: None` and `entities_count: 0`.
    pub async fn collect(&self, hub_token: &str) -> HeartbeatPayload {
        let (version, count) =
            tokio::join!(self.supervisor.ha_version(), self.supervisor.entity_count());

        let ha_version = version.unwrap_or_else(|e| {
            debug!(error = %e, "could not read Home Assistant version");
            None
        });
        let entities_count = count.unwrap_or_else(|e| {
            debug!(error = %e, "could not count entities");
            0
        });

        HeartbeatPayload {
            device_id: device_id(hub_token),
            ha_version,
            entities_count,
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }

    /// Run one collect-and-send cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(token) = self.hub_token.as_ref() else {
            warn!("no hub token configured, skipping heartbeat");
            return CycleOutcome::Skipped;
        };

        let payload = self.collect(token.expose_secret()).await;
        match self.platform.send_heartbeat(&payload).await {
            Ok(()) => {
                debug!(
                    device_id = %payload.device_id,
                    entities = payload.entities_count,
                    "heartbeat sent"
                );
                CycleOutcome::Sent
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status(), "heartbeat failed");
                CycleOutcome::Failed
            }
        }
    }

    /// Spawn the periodic loop. The first cycle runs immediately; the
    /// loop exits once `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "heartbeat started");
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }
        info!("heartbeat stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_prefix_before_first_underscore() {
        assert_eq!(device_id("abc123_devkey"), "abc123");
        assert_eq!(device_id("abc_def_ghi"), "abc");
        assert_eq!(device_id("_leading"), "");
    }

    #[test]
    fn device_id_without_separator_is_unknown() {
        assert_eq!(device_id("nodash"), "unknown");
        assert_eq!(device_id(""), "unknown");
    }
}
