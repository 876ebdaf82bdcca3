// src/heartbeat/notification.rs
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::payload::{as_text, field, int_or, number_or, opt_number, text_or};
use crate::render::BattleReport;

/// Delivery priority. Anything unrecognised (or missing) counts as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Normal,
        }
    }
}

/// A leaderboard position as sent by the service: usually an integer, occasionally a
/// placeholder such as `"?"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rank {
    Position(i64),
    Label(String),
}

impl Rank {
    fn read(data: &Value, key: &str) -> Self {
        match field(data, key) {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(p) => Rank::Position(p),
                None => Rank::Label(n.to_string()),
            },
            Some(v) => Rank::Label(as_text(v).unwrap_or_else(|| "?".to_string())),
            None => Rank::Label("?".to_string()),
        }
    }

    pub fn position(&self) -> Option<i64> {
        match self {
            Rank::Position(p) => Some(*p),
            Rank::Label(_) => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Position(p) => write!(f, "{p}"),
            Rank::Label(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
    Unknown,
}

impl MatchResult {
    fn parse(s: &str) -> Self {
        match s {
            "win" => MatchResult::Win,
            "loss" => MatchResult::Loss,
            "draw" => MatchResult::Draw,
            _ => MatchResult::Unknown,
        }
    }
}

/// Closed set of notification types the service emits, each with its payload already
/// defaulted. Anything else lands in `Unknown` together with the raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    BattleCompleted(BattleReport),
    RankChange {
        old_rank: Rank,
        new_rank: Rank,
    },
    Challenge {
        challenger: String,
    },
    Top100 {
        rank: Rank,
    },
    TournamentStarted {
        tournament: String,
    },
    TournamentBattleCompleted {
        tournament: String,
        opponent: String,
        result: MatchResult,
    },
    TournamentRankChange {
        tournament: String,
        old_rank: Rank,
        new_rank: Rank,
    },
    TournamentEnded {
        tournament: String,
        final_rank: Rank,
        prize: f64,
    },
    TournamentRegistrationReminder {
        tournament: String,
        ends_in_minutes: i64,
    },
    TournamentRegistrationOpen {
        tournament: String,
        entry_fee_bp: f64,
    },
    BpEarned {
        amount: f64,
        reason: String,
        new_balance: Option<f64>,
    },
    BpDailyBonus {
        amount: f64,
        streak_days: i64,
    },
    ReferralConversion {
        conversion: String,
        points: f64,
    },
    ReferralPointsClaimable {
        points: f64,
    },
    Unknown {
        tag: Option<String>,
        message: Option<String>,
        data: Value,
    },
}

impl NotificationKind {
    pub fn from_parts(tag: Option<&str>, data: &Value, message: Option<String>) -> Self {
        let tournament = || text_or(data, "tournament_name", "Tournament");
        match tag.unwrap_or_default() {
            "battle_completed" => Self::BattleCompleted(BattleReport::from_value(data)),
            "rank_change" => Self::RankChange {
                old_rank: Rank::read(data, "old_rank"),
                new_rank: Rank::read(data, "new_rank"),
            },
            "challenge" => Self::Challenge {
                challenger: text_or(data, "challenger", "Unknown"),
            },
            "top_100" => Self::Top100 {
                rank: Rank::read(data, "rank"),
            },
            "tournament_started" => Self::TournamentStarted {
                tournament: tournament(),
            },
            "tournament_battle_completed" => Self::TournamentBattleCompleted {
                // No "Tournament" placeholder here: an unnamed event shows a bare trophy line.
                tournament: text_or(data, "tournament_name", ""),
                opponent: text_or(data, "opponent_name", "Unknown"),
                result: MatchResult::parse(&text_or(data, "result", "unknown")),
            },
            "tournament_rank_change" => Self::TournamentRankChange {
                tournament: tournament(),
                old_rank: Rank::read(data, "old_rank"),
                new_rank: Rank::read(data, "new_rank"),
            },
            "tournament_ended" => Self::TournamentEnded {
                tournament: tournament(),
                final_rank: Rank::read(data, "final_rank"),
                prize: number_or(data, "prize_amount", 0.0),
            },
            "tournament_registration_reminder" => Self::TournamentRegistrationReminder {
                tournament: tournament(),
                ends_in_minutes: int_or(data, "ends_in_minutes", 30),
            },
            "tournament_registration_open" => Self::TournamentRegistrationOpen {
                tournament: tournament(),
                entry_fee_bp: number_or(data, "entry_fee_bp", 0.0),
            },
            "bp_earned" => Self::BpEarned {
                amount: number_or(data, "amount", 0.0),
                reason: text_or(data, "reason", "reward"),
                new_balance: opt_number(data, "new_balance").filter(|b| *b != 0.0),
            },
            "bp_daily_bonus" => Self::BpDailyBonus {
                amount: number_or(data, "amount", 0.0),
                streak_days: int_or(data, "streak_days", 1),
            },
            "referral_conversion" => Self::ReferralConversion {
                conversion: text_or(data, "type", "unknown"),
                points: number_or(data, "points", 0.0),
            },
            "referral_points_claimable" => Self::ReferralPointsClaimable {
                points: number_or(data, "claimable_points", 0.0),
            },
            _ => Self::Unknown {
                tag: tag.map(str::to_string),
                message,
                data: data.clone(),
            },
        }
    }
}

/// One event from the notification poll. Built leniently from the wire record: no field is
/// required, and the payload is decoded into [`NotificationKind`] up front.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNotification")]
pub struct Notification {
    pub kind: NotificationKind,
    pub priority: Priority,
    /// ISO-8601 creation time as sent; empty when absent.
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNotification {
    #[serde(rename = "type")]
    tag: Value,
    data: Value,
    priority: Value,
    created_at: Value,
    message: Value,
}

impl From<RawNotification> for Notification {
    fn from(raw: RawNotification) -> Self {
        let tag = as_text(&raw.tag);
        let message = as_text(&raw.message).filter(|m| !m.is_empty());
        let data = if raw.data.is_null() {
            Value::Object(Default::default())
        } else {
            raw.data
        };
        Self {
            kind: NotificationKind::from_parts(tag.as_deref(), &data, message),
            priority: raw
                .priority
                .as_str()
                .map(Priority::parse)
                .unwrap_or_default(),
            created_at: as_text(&raw.created_at).unwrap_or_default(),
        }
    }
}

impl Notification {
    pub fn new(kind: NotificationKind, priority: Priority, created_at: impl Into<String>) -> Self {
        Self {
            kind,
            priority,
            created_at: created_at.into(),
        }
    }

    /// Decode a single wire record. Only JSON objects are records; anything else is `None`.
    pub fn from_json(v: Value) -> Option<Self> {
        if !v.is_object() {
            return None;
        }
        serde_json::from_value(v).ok()
    }

    /// Short label for logs.
    pub fn type_tag(&self) -> &str {
        match &self.kind {
            NotificationKind::BattleCompleted(_) => "battle_completed",
            NotificationKind::RankChange { .. } => "rank_change",
            NotificationKind::Challenge { .. } => "challenge",
            NotificationKind::Top100 { .. } => "top_100",
            NotificationKind::TournamentStarted { .. } => "tournament_started",
            NotificationKind::TournamentBattleCompleted { .. } => "tournament_battle_completed",
            NotificationKind::TournamentRankChange { .. } => "tournament_rank_change",
            NotificationKind::TournamentEnded { .. } => "tournament_ended",
            NotificationKind::TournamentRegistrationReminder { .. } => {
                "tournament_registration_reminder"
            }
            NotificationKind::TournamentRegistrationOpen { .. } => "tournament_registration_open",
            NotificationKind::BpEarned { .. } => "bp_earned",
            NotificationKind::BpDailyBonus { .. } => "bp_daily_bonus",
            NotificationKind::ReferralConversion { .. } => "referral_conversion",
            NotificationKind::ReferralPointsClaimable { .. } => "referral_points_claimable",
            NotificationKind::Unknown { tag, .. } => tag.as_deref().unwrap_or("unknown"),
        }
    }
}

/// Decode a poll batch record by record. Entries that are not objects are skipped, so one
/// bad record cannot hold back the rest of the window.
pub fn decode_batch(records: Vec<Value>) -> Vec<Notification> {
    let total = records.len();
    let batch: Vec<Notification> = records
        .into_iter()
        .filter_map(Notification::from_json)
        .collect();
    let skipped = total - batch.len();
    if skipped > 0 {
        tracing::warn!(skipped, total, "skipping malformed notification records");
        metrics::counter!("heartbeat_skipped_records_total").increment(skipped as u64);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_skips_non_object_records() {
        let batch = decode_batch(vec![
            Value::Null,
            json!("oops"),
            json!([1, 2]),
            json!({"type": "challenge", "data": {"challenger": "Vex"}}),
            json!(7),
        ]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].type_tag(), "challenge");
        assert!(decode_batch(Vec::new()).is_empty());
    }

    #[test]
    fn empty_record_decodes_to_unknown_normal() {
        let n = Notification::from_json(json!({})).unwrap();
        assert_eq!(n.priority, Priority::Normal);
        assert_eq!(n.created_at, "");
        assert!(matches!(n.kind, NotificationKind::Unknown { tag: None, .. }));
    }

    #[test]
    fn priority_parsing_is_lenient() {
        assert_eq!(Priority::parse("HIGH"), Priority::High);
        assert_eq!(Priority::parse("low"), Priority::Low);
        assert_eq!(Priority::parse("urgent"), Priority::Normal);
        let n = Notification::from_json(json!({"type": "challenge", "priority": 3})).unwrap();
        assert_eq!(n.priority, Priority::Normal);
    }

    #[test]
    fn ranks_keep_placeholders() {
        let n = Notification::from_json(json!({
            "type": "rank_change",
            "data": {"old_rank": "?", "new_rank": 10}
        }))
        .unwrap();
        match n.kind {
            NotificationKind::RankChange { old_rank, new_rank } => {
                assert_eq!(old_rank, Rank::Label("?".into()));
                assert_eq!(new_rank.position(), Some(10));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn unknown_type_keeps_message_and_raw_data() {
        let n = Notification::from_json(json!({
            "type": "season_reset",
            "message": "Season 2 begins",
            "data": {"season": 2}
        }))
        .unwrap();
        assert_eq!(n.type_tag(), "season_reset");
        match n.kind {
            NotificationKind::Unknown { message, data, .. } => {
                assert_eq!(message.as_deref(), Some("Season 2 begins"));
                assert_eq!(data, json!({"season": 2}));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn non_object_record_is_rejected() {
        assert!(Notification::from_json(json!(42)).is_none());
    }

    #[test]
    fn bp_earned_zero_balance_is_hidden() {
        let n = Notification::from_json(json!({
            "type": "bp_earned",
            "data": {"amount": 50, "new_balance": 0}
        }))
        .unwrap();
        assert!(matches!(
            n.kind,
            NotificationKind::BpEarned { new_balance: None, .. }
        ));
    }
}
