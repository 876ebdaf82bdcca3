// src/heartbeat/poller.rs
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use super::notification::Notification;
use crate::error::{ArenaError, Result};

/// Anything that can answer "notifications since this cursor".
#[async_trait::async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch_since(&self, since: Option<&str>) -> Result<Vec<Notification>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl<T: NotificationSource + ?Sized> NotificationSource for std::sync::Arc<T> {
    async fn fetch_since(&self, since: Option<&str>) -> Result<Vec<Notification>> {
        (**self).fetch_since(since).await
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Result of one poll attempt. The heartbeat advances its watermark only on `Fetched`.
#[derive(Debug)]
pub enum PollOutcome {
    Fetched(Vec<Notification>),
    Failed(ArenaError),
}

impl PollOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, PollOutcome::Fetched(_))
    }

    /// Flatten to the best-effort view: failures read as "nothing new".
    pub fn into_notifications(self) -> Vec<Notification> {
        match self {
            PollOutcome::Fetched(v) => v,
            PollOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// Single bounded-time fetch, no retries. The next scheduled heartbeat is the retry.
pub struct Poller<S> {
    source: S,
    timeout: Duration,
}

impl<S: NotificationSource> Poller<S> {
    pub fn new(source: S, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// A panic inside the source is caught here and reported as a failed poll.
    pub async fn poll_outcome(&self, since: Option<&str>) -> PollOutcome {
        let fetch = AssertUnwindSafe(self.source.fetch_since(since)).catch_unwind();
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(Ok(v))) => PollOutcome::Fetched(v),
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, source = self.source.name(), "notification poll failed");
                PollOutcome::Failed(e)
            }
            Ok(Err(_)) => {
                tracing::error!(source = self.source.name(), "notification source panicked");
                PollOutcome::Failed(ArenaError::SourcePanicked)
            }
            Err(_) => {
                tracing::warn!(
                    source = self.source.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "notification poll timed out"
                );
                PollOutcome::Failed(ArenaError::Timeout)
            }
        }
    }

    /// Notifications newer than `since`; any failure yields an empty list.
    pub async fn poll(&self, since: Option<&str>) -> Vec<Notification> {
        self.poll_outcome(since).await.into_notifications()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::notification::{NotificationKind, Priority};

    struct Failing;

    #[async_trait::async_trait]
    impl NotificationSource for Failing {
        async fn fetch_since(&self, _since: Option<&str>) -> Result<Vec<Notification>> {
            Err(ArenaError::Api {
                status: 503,
                message: "maintenance".into(),
            })
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct Hanging;

    #[async_trait::async_trait]
    impl NotificationSource for Hanging {
        async fn fetch_since(&self, _since: Option<&str>) -> Result<Vec<Notification>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    struct One;

    #[async_trait::async_trait]
    impl NotificationSource for One {
        async fn fetch_since(&self, since: Option<&str>) -> Result<Vec<Notification>> {
            Ok(vec![Notification::new(
                NotificationKind::Challenge {
                    challenger: since.unwrap_or("none").to_string(),
                },
                Priority::High,
                "2025-01-01T00:00:00Z",
            )])
        }
        fn name(&self) -> &'static str {
            "one"
        }
    }

    struct Panicky;

    #[async_trait::async_trait]
    impl NotificationSource for Panicky {
        async fn fetch_since(&self, _since: Option<&str>) -> Result<Vec<Notification>> {
            panic!("source blew up")
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn panic_in_source_is_a_failed_poll() {
        let p = Poller::new(Panicky, Duration::from_secs(1));
        match p.poll_outcome(None).await {
            PollOutcome::Failed(ArenaError::SourcePanicked) => {}
            other => panic!("expected panic to be caught, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_becomes_empty() {
        let p = Poller::new(Failing, Duration::from_secs(1));
        assert!(p.poll(None).await.is_empty());
        assert!(!p.poll_outcome(None).await.is_fetched());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_empty() {
        let p = Poller::new(Hanging, Duration::from_secs(30));
        match p.poll_outcome(Some("2025-01-01T00:00:00.000Z")).await {
            PollOutcome::Failed(ArenaError::Timeout) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cursor_is_passed_through() {
        let p = Poller::new(One, Duration::from_secs(1));
        let out = p.poll(Some("cursor-1")).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(
            &out[0].kind,
            NotificationKind::Challenge { challenger } if challenger == "cursor-1"
        ));
    }
}
