use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::gateway::{EventType, ObjectEvent, ObjectGateway};
use crate::mirror::{Mirror, ResourceKind};

/// Delay applied between resync attempts after a gateway failure or a closed
/// watch stream.
///
/// The default performs an immediate restart, matching the loop's original
/// behavior; embedders that want backoff set an initial delay and let it grow
/// by `multiplier` up to `max_delay`. The delay resets after every
/// successful full list.
#[derive(Debug, Clone, Copy)]
pub struct ResyncPolicy {
    /// Wait before the first retry after a failure.
    pub initial_delay: Duration,
    /// Upper bound for the growing delay.
    pub max_delay: Duration,
    /// Multiplication factor applied to the delay after each failure.
    pub multiplier: f64,
}

impl ResyncPolicy {
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }
}

impl Default for ResyncPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }
}

fn next_delay(current: Duration, policy: &ResyncPolicy) -> Duration {
    current
        .mul_f64(policy.multiplier.max(1.0))
        .max(policy.initial_delay)
        .min(policy.max_delay)
}

/// Keep the mirror table for `kind` consistent with the gateway until the
/// shutdown signal fires.
///
/// Each cycle seeds the table with a full list, then applies watch events in
/// delivery order. Any failure — list error, watch error, error event, or a
/// gracefully closed stream — restarts the cycle with a full resync; nothing
/// is ever resumed from a previous resourceVersion. Gateway errors are logged
/// and absorbed here; they never reach query callers, who simply keep reading
/// the last complete snapshot.
pub async fn run_sync(
    gateway: Arc<dyn ObjectGateway>,
    mirror: Arc<Mirror>,
    kind: ResourceKind,
    policy: ResyncPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut delay = policy.initial_delay.min(policy.max_delay);

    loop {
        if *shutdown.borrow() {
            return;
        }

        match gateway.list(kind).await {
            Ok(records) => {
                debug!(kind = %kind, count = records.len(), "seeding mirror from full list");
                mirror.replace_all(kind, records);
                delay = policy.initial_delay.min(policy.max_delay);
            }
            Err(error) => {
                warn!(kind = %kind, %error, "list failed, resyncing");
                if wait_or_shutdown(delay, &mut shutdown).await {
                    return;
                }
                delay = next_delay(delay, &policy);
                continue;
            }
        }

        match gateway.watch(kind).await {
            Ok(mut events) => loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!(kind = %kind, "sync loop stopped");
                        return;
                    }
                    item = events.next() => match item {
                        Some(Ok(event)) => apply(&mirror, kind, event),
                        Some(Err(error)) => {
                            warn!(kind = %kind, %error, "watch stream failed, resyncing");
                            break;
                        }
                        None => {
                            info!(kind = %kind, "watch stream ended, resyncing");
                            break;
                        }
                    }
                }
            },
            Err(error) => {
                warn!(kind = %kind, %error, "watch failed, resyncing");
            }
        }

        if wait_or_shutdown(delay, &mut shutdown).await {
            return;
        }
        delay = next_delay(delay, &policy);
    }
}

/// One sync worker per kind, all sharing the gateway, mirror, and shutdown
/// signal.
pub fn spawn_sync(
    gateway: Arc<dyn ObjectGateway>,
    mirror: Arc<Mirror>,
    kinds: &[ResourceKind],
    policy: ResyncPolicy,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    kinds
        .iter()
        .map(|&kind| {
            tokio::spawn(run_sync(
                Arc::clone(&gateway),
                Arc::clone(&mirror),
                kind,
                policy,
                shutdown.clone(),
            ))
        })
        .collect()
}

fn apply(mirror: &Mirror, kind: ResourceKind, event: ObjectEvent) {
    match event.event_type {
        EventType::Added | EventType::Modified => mirror.upsert(kind, event.record),
        EventType::Deleted => mirror.remove(kind, &event.record.name),
    }
}

/// Sleep for `delay` unless the shutdown signal fires first. Returns true on
/// shutdown.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if delay.is_zero() {
        return *shutdown.borrow();
    }
    tokio::select! {
        _ = shutdown.changed() => true,
        _ = sleep(delay) => false,
    }
}
