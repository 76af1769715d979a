//! Background leak task.

use crate::api::Services;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodically leaks every score, independent of message traffic.
///
/// Holds the services weakly: once the owning service is dropped the next
/// tick ends the loop. Dropping the handle also stops the task.
#[derive(Debug)]
pub(crate) struct LeakTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LeakTask {
    pub(crate) fn spawn(runtime: &Handle, services: Weak<Services>, period: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // Leak is computed from elapsed time, so skipped ticks lose nothing.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(services) = services.upgrade() else {
                            break;
                        };
                        services.points().leak_all(&services);
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("leak task stopped");
        });
        tracing::debug!(?period, "leak task started");
        LeakTask { shutdown, handle }
    }

    pub(crate) fn stop(self) {
        let _ = self.shutdown.send(true);
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for LeakTask {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
