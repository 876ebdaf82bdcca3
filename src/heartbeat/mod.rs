// src/heartbeat/mod.rs
//! Heartbeat: poll → prioritize → truncate → format, returning either chat-ready messages
//! or the `HEARTBEAT_OK` sentinel. Nothing in here propagates an error to the caller.

pub mod notification;
pub mod poller;
pub mod priority;
pub mod scheduler;
pub mod watermark;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::config::HeartbeatConfig;
use crate::render::format_notification;

pub use notification::{decode_batch, Notification, NotificationKind, Priority, Rank};
pub use poller::{NotificationSource, PollOutcome, Poller};
pub use priority::{order_and_truncate, DEFAULT_MAX_NOTIFICATIONS};
pub use watermark::Watermark;

/// Reserved reply meaning "nothing to send".
pub const HEARTBEAT_OK: &str = "HEARTBEAT_OK";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("heartbeat_runs_total", "Heartbeat invocations.");
        describe_counter!(
            "heartbeat_poll_failures_total",
            "Polls that failed and were treated as empty."
        );
        describe_counter!(
            "heartbeat_skipped_records_total",
            "Poll records that were not objects and were dropped."
        );
        describe_counter!(
            "heartbeat_delivered_total",
            "Messages handed to the host for delivery."
        );
        describe_counter!(
            "heartbeat_dropped_total",
            "Notifications cut by the per-beat cap."
        );
        describe_gauge!(
            "heartbeat_last_success_ts",
            "Unix ts of the last successful poll."
        );
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Nothing to deliver.
    Idle,
    /// Ordered messages, one per notification.
    Deliver(Vec<String>),
}

impl HeartbeatOutcome {
    /// Host-facing form: `["HEARTBEAT_OK"]` or the messages.
    pub fn into_messages(self) -> Vec<String> {
        match self {
            HeartbeatOutcome::Idle => vec![HEARTBEAT_OK.to_string()],
            HeartbeatOutcome::Deliver(msgs) => msgs,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, HeartbeatOutcome::Idle)
    }
}

/// Order, cap and render one batch. A panic while rendering degrades to `Idle`.
pub fn prepare_batch(notifications: Vec<Notification>, max_count: usize) -> HeartbeatOutcome {
    if notifications.is_empty() {
        return HeartbeatOutcome::Idle;
    }
    let total = notifications.len();

    let rendered = catch_unwind(AssertUnwindSafe(|| {
        order_and_truncate(notifications, max_count)
            .iter()
            .map(format_notification)
            .filter(|m| !m.trim().is_empty())
            .collect::<Vec<_>>()
    }));

    match rendered {
        Ok(msgs) if msgs.is_empty() => HeartbeatOutcome::Idle,
        Ok(msgs) => {
            let dropped = total.saturating_sub(max_count);
            if dropped > 0 {
                tracing::debug!(dropped, max_count, "heartbeat batch capped");
                counter!("heartbeat_dropped_total").increment(dropped as u64);
            }
            HeartbeatOutcome::Deliver(msgs)
        }
        Err(_) => {
            tracing::error!(total, "heartbeat rendering panicked; sending nothing");
            HeartbeatOutcome::Idle
        }
    }
}

/// Owns the poll cursor. Beats are serialized through the watermark lock, so overlapping
/// timers cannot read the same cursor and then race on the update.
pub struct Heartbeat<S> {
    poller: Poller<S>,
    watermark: Mutex<Watermark>,
    max_notifications: usize,
}

impl<S: NotificationSource> Heartbeat<S> {
    pub fn new(source: S, poll_timeout: Duration) -> Self {
        Self {
            poller: Poller::new(source, poll_timeout),
            watermark: Mutex::new(Watermark::new()),
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
        }
    }

    pub fn from_config(source: S, cfg: &HeartbeatConfig, poll_timeout: Duration) -> Self {
        Self::new(source, poll_timeout).with_max_notifications(cfg.max_notifications)
    }

    pub fn with_max_notifications(mut self, max: usize) -> Self {
        self.max_notifications = max;
        self
    }

    pub fn with_watermark(mut self, wm: Watermark) -> Self {
        self.watermark = Mutex::new(wm);
        self
    }

    pub async fn watermark(&self) -> Watermark {
        *self.watermark.lock().await
    }

    pub fn poller(&self) -> &Poller<S> {
        &self.poller
    }

    /// One heartbeat. The cursor moves to this poll's start time only when the poll
    /// succeeded; a failed poll leaves it so the same window is asked for again.
    pub async fn beat(&self) -> HeartbeatOutcome {
        ensure_metrics_described();
        counter!("heartbeat_runs_total").increment(1);

        let notifications = {
            let mut wm = self.watermark.lock().await;
            let started = Utc::now();
            let since = wm.since_param();
            match self.poller.poll_outcome(since.as_deref()).await {
                PollOutcome::Fetched(v) => {
                    wm.advance(started);
                    gauge!("heartbeat_last_success_ts").set(started.timestamp() as f64);
                    v
                }
                PollOutcome::Failed(_) => {
                    counter!("heartbeat_poll_failures_total").increment(1);
                    Vec::new()
                }
            }
        };

        let outcome = prepare_batch(notifications, self.max_notifications);
        match &outcome {
            HeartbeatOutcome::Idle => tracing::debug!("heartbeat idle"),
            HeartbeatOutcome::Deliver(msgs) => {
                counter!("heartbeat_delivered_total").increment(msgs.len() as u64);
                tracing::info!(count = msgs.len(), "heartbeat delivering notifications");
            }
        }
        outcome
    }

    /// Host entry point: `["HEARTBEAT_OK"]` or the rendered messages.
    pub async fn run(&self) -> Vec<String> {
        self.beat().await.into_messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> Notification {
        Notification::from_json(v).unwrap()
    }

    #[test]
    fn empty_batch_is_idle() {
        assert_eq!(prepare_batch(Vec::new(), 5), HeartbeatOutcome::Idle);
        assert_eq!(
            HeartbeatOutcome::Idle.into_messages(),
            vec![HEARTBEAT_OK.to_string()]
        );
    }

    #[test]
    fn zero_cap_is_idle() {
        let batch = vec![raw(json!({"type": "challenge"}))];
        assert!(prepare_batch(batch, 0).is_idle());
    }

    #[test]
    fn batch_is_rendered_in_priority_order() {
        let batch = vec![
            raw(json!({"type": "top_100", "priority": "low", "data": {"rank": 99}})),
            raw(json!({"type": "challenge", "priority": "high", "data": {"challenger": "Vex"}})),
        ];
        match prepare_batch(batch, 5) {
            HeartbeatOutcome::Deliver(msgs) => {
                assert_eq!(msgs.len(), 2);
                assert!(msgs[0].contains("Vex"));
                assert!(msgs[1].contains("#99"));
            }
            other => panic!("expected delivery, got {other:?}"),
        }
    }
}
