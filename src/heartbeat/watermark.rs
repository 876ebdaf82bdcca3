// src/heartbeat/watermark.rs
use chrono::{DateTime, SecondsFormat, Utc};

/// Cursor for the notification poll: the start time of the last successful poll.
///
/// - Starts absent, meaning "whatever the service returns by default".
/// - Only moves forward; an older timestamp is ignored.
/// - Failed polls leave it untouched so the next poll covers the same window again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark {
    last_success: Option<DateTime<Utc>>,
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(ts: DateTime<Utc>) -> Self {
        Self {
            last_success: Some(ts),
        }
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// Wire form of the `since` cursor (RFC 3339, millisecond precision, `Z` suffix).
    pub fn since_param(&self) -> Option<String> {
        self.last_success
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Record a successful poll that started at `ts`. Returns whether the cursor moved.
    pub fn advance(&mut self, ts: DateTime<Utc>) -> bool {
        match self.last_success {
            Some(cur) if cur >= ts => false,
            _ => {
                self.last_success = Some(ts);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    #[test]
    fn starts_absent() {
        let w = Watermark::new();
        assert_eq!(w.get(), None);
        assert_eq!(w.since_param(), None);
    }

    #[test]
    fn advances_forward_only() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let mut w = Watermark::new();
        assert!(w.advance(t0));
        assert!(!w.advance(t0 - ChronoDuration::seconds(30)));
        assert_eq!(w.get(), Some(t0));
        assert!(!w.advance(t0));
        assert!(w.advance(t0 + ChronoDuration::seconds(300)));
    }

    #[test]
    fn since_param_is_rfc3339_utc() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 5, 7).unwrap();
        assert_eq!(
            Watermark::at(t0).since_param().as_deref(),
            Some("2025-09-06T09:05:07.000Z")
        );
    }
}
