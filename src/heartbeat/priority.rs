// src/heartbeat/priority.rs
use super::notification::Notification;

pub const DEFAULT_MAX_NOTIFICATIONS: usize = 5;

/// Order by (priority rank, created_at) ascending and keep the first `max_count`.
///
/// The sort is stable, so records with equal keys keep their arrival order. Records past
/// `max_count` are dropped for good; the next poll starts after them.
pub fn order_and_truncate(mut notifications: Vec<Notification>, max_count: usize) -> Vec<Notification> {
    notifications.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    notifications.truncate(max_count);
    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::notification::{NotificationKind, Priority};
    use rand::seq::SliceRandom;

    fn n(priority: Priority, created_at: &str, label: &str) -> Notification {
        Notification::new(
            NotificationKind::Challenge {
                challenger: label.to_string(),
            },
            priority,
            created_at,
        )
    }

    fn label(n: &Notification) -> &str {
        match &n.kind {
            NotificationKind::Challenge { challenger } => challenger,
            _ => unreachable!(),
        }
    }

    #[test]
    fn sorts_by_priority_then_time() {
        let input = vec![
            n(Priority::Low, "2025-01-01T00:00:00Z", "low"),
            n(Priority::Normal, "2025-01-01T00:00:02Z", "normal-late"),
            n(Priority::High, "2025-01-01T00:00:05Z", "high"),
            n(Priority::Normal, "2025-01-01T00:00:01Z", "normal-early"),
        ];
        let out = order_and_truncate(input, 10);
        let labels: Vec<_> = out.iter().map(label).collect();
        assert_eq!(labels, ["high", "normal-early", "normal-late", "low"]);
    }

    #[test]
    fn equal_keys_keep_arrival_order() {
        let ts = "2025-01-01T00:00:00Z";
        let input = (0..6)
            .map(|i| n(Priority::Normal, ts, &format!("n{i}")))
            .collect::<Vec<_>>();
        let out = order_and_truncate(input, 6);
        let labels: Vec<_> = out.iter().map(label).collect();
        assert_eq!(labels, ["n0", "n1", "n2", "n3", "n4", "n5"]);
    }

    #[test]
    fn truncates_to_max_count() {
        let input = (0..9)
            .map(|i| n(Priority::Normal, &format!("2025-01-01T00:00:0{i}Z"), "x"))
            .collect::<Vec<_>>();
        assert_eq!(order_and_truncate(input.clone(), 5).len(), 5);
        assert!(order_and_truncate(input, 0).is_empty());
    }

    #[test]
    fn missing_timestamp_sorts_first_within_class() {
        let input = vec![
            n(Priority::High, "2025-01-01T00:00:00Z", "stamped"),
            n(Priority::High, "", "unstamped"),
        ];
        let out = order_and_truncate(input, 5);
        assert_eq!(label(&out[0]), "unstamped");
    }

    #[test]
    fn shuffled_input_always_comes_out_sorted() {
        let priorities = [Priority::High, Priority::Normal, Priority::Low];
        let mut input = Vec::new();
        for (i, p) in priorities.iter().cycle().take(30).enumerate() {
            input.push(n(*p, &format!("2025-03-01T10:{:02}:00Z", i % 60), "x"));
        }
        let mut rng = rand::rng();
        for _ in 0..20 {
            input.shuffle(&mut rng);
            let out = order_and_truncate(input.clone(), 7);
            assert_eq!(out.len(), 7);
            for w in out.windows(2) {
                let ka = (w[0].priority.rank(), &w[0].created_at);
                let kb = (w[1].priority.rank(), &w[1].created_at);
                assert!(ka <= kb, "{ka:?} > {kb:?}");
            }
        }
    }
}
