// src/heartbeat/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Heartbeat, HeartbeatOutcome, NotificationSource};

/// Spawn a task that beats every `interval` (first beat immediately) and forwards each
/// delivery batch to `tx`. Idle beats send nothing. The task ends when the receiver is
/// dropped.
pub fn spawn_heartbeat_scheduler<S>(
    heartbeat: Arc<Heartbeat<S>>,
    interval: Duration,
    tx: mpsc::Sender<Vec<String>>,
) -> JoinHandle<()>
where
    S: NotificationSource + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow beat must not trigger a burst of catch-up polls.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }
            match heartbeat.beat().await {
                HeartbeatOutcome::Idle => {
                    tracing::trace!(target: "heartbeat", "tick: nothing new");
                }
                HeartbeatOutcome::Deliver(msgs) => {
                    if tx.send(msgs).await.is_err() {
                        tracing::debug!(target: "heartbeat", "receiver gone; stopping scheduler");
                        break;
                    }
                }
            }
        }
    })
}
