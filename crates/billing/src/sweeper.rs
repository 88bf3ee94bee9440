//! Expiration sweeper
//!
//! A cancellable periodic task that runs the bulk expiration pass: once
//! immediately at startup, then on a fixed interval. Failures are logged and
//! swallowed; the next tick retries. `SweeperHandle::stop` halts the task
//! deterministically before returning.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::subscription::SubscriptionService;

/// Periodic expiration sweeper.
pub struct SubscriptionSweeper {
    subscriptions: SubscriptionService,
    interval: Duration,
    tick_timeout: Duration,
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SubscriptionSweeper {
    pub fn new(
        subscriptions: SubscriptionService,
        interval: Duration,
        tick_timeout: Duration,
    ) -> Self {
        Self {
            subscriptions,
            interval,
            tick_timeout,
        }
    }

    /// Spawn the sweep loop. The first pass runs immediately.
    pub fn start(self) -> SweeperHandle {
        let (stop, mut stopped) = watch::channel(false);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // A slow pass delays the next tick instead of stacking ticks.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sweep_once().await,
                    _ = stopped.changed() => {
                        tracing::info!("Subscription sweeper stopped");
                        return;
                    }
                }
            }
        });

        tracing::info!(interval_secs = interval.as_secs(), "Subscription sweeper started");
        SweeperHandle { stop, task }
    }

    /// One sweep pass under a bounded timeout. Never fails the loop.
    async fn sweep_once(&self) {
        match tokio::time::timeout(
            self.tick_timeout,
            self.subscriptions.expire_subscriptions(),
        )
        .await
        {
            Ok(Ok(0)) => {}
            Ok(Ok(count)) => {
                tracing::info!(expired = count, "Expired overdue subscriptions");
            }
            Ok(Err(e)) => {
                // Non-fatal: the next tick retries.
                tracing::error!(error = %e, "Subscription sweep failed");
            }
            Err(_) => {
                tracing::error!(
                    timeout_secs = self.tick_timeout.as_secs(),
                    "Subscription sweep timed out"
                );
            }
        }
    }
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the task to finish. No further sweeps
    /// run after this returns.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
