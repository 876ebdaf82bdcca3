// src/render/notification.rs
use super::{grouped, quantity, RULE, WEB_HOST};
use crate::heartbeat::notification::{MatchResult, Notification, NotificationKind, Rank};

/// Arrow and distance between two ranks. Non-numeric ranks give a zero distance and the
/// downward arrow.
pub fn rank_movement(old: &Rank, new: &Rank) -> (&'static str, i64) {
    match (old.position(), new.position()) {
        (Some(o), Some(n)) => {
            let arrow = if n < o { "⬆️" } else { "⬇️" };
            (arrow, (o - n).abs())
        }
        _ => ("⬇️", 0),
    }
}

fn medal(rank: &Rank) -> &'static str {
    match rank.position() {
        Some(1) => "🥇",
        Some(2) => "🥈",
        Some(3) => "🥉",
        _ => "🏅",
    }
}

fn conversion_label(kind: &str) -> &str {
    match kind {
        "signup" => "Friend signup",
        "agent_create" => "Agent created",
        "moltbook_skill" => "Skill linked",
        other => other,
    }
}

/// Render one notification for chat delivery. Total: every input yields non-empty text.
pub fn format_notification(n: &Notification) -> String {
    match &n.kind {
        NotificationKind::BattleCompleted(report) => report.render(),

        NotificationKind::RankChange { old_rank, new_rank } => {
            let (arrow, diff) = rank_movement(old_rank, new_rank);
            format!("🎉 Rank changed!\n#{old_rank} → #{new_rank} {arrow}{diff}")
        }

        NotificationKind::Challenge { challenger } => format!(
            "⚔️ Challenge received!\n{challenger} has challenged you to a battle.\nWill you accept?"
        ),

        NotificationKind::Top100 { rank } => {
            format!("🎉 Congratulations!\nYou made the Top 100! (#{rank})")
        }

        NotificationKind::TournamentStarted { tournament } => format!(
            "🏆 Tournament started!\n{RULE}\n{tournament} battles have begun.\nGood luck! 🍀"
        ),

        NotificationKind::TournamentBattleCompleted {
            tournament,
            opponent,
            result,
        } => {
            let result = match result {
                MatchResult::Win => "🏆 Win!",
                MatchResult::Loss => "😢 Loss...",
                MatchResult::Draw => "🤝 Draw",
                MatchResult::Unknown => "⚔️",
            };
            format!(
                "⚔️ Tournament battle finished!\n{RULE}\n🏆 {tournament}\nvs {opponent}\nResult: {result}"
            )
        }

        NotificationKind::TournamentRankChange {
            tournament,
            old_rank,
            new_rank,
        } => {
            let (arrow, diff) = rank_movement(old_rank, new_rank);
            format!(
                "📊 Tournament rank changed!\n{RULE}\n🏆 {tournament}\n#{old_rank} → #{new_rank} {arrow}{diff}"
            )
        }

        NotificationKind::TournamentEnded {
            tournament,
            final_rank,
            prize,
        } => {
            let prize_line = if *prize > 0.0 {
                format!("\n🎁 Prize: {} CROSS", grouped(*prize, 0))
            } else {
                String::new()
            };
            format!(
                "🎉 Tournament finished!\n{RULE}\n🏆 {tournament}\n{} Final rank: #{final_rank}{prize_line}",
                medal(final_rank)
            )
        }

        NotificationKind::TournamentRegistrationReminder {
            tournament,
            ends_in_minutes,
        } => format!(
            "⏰ Registration closing soon!\n{RULE}\n🏆 {tournament}\nRegistration closes in {ends_in_minutes} minutes!\nJoin now."
        ),

        NotificationKind::TournamentRegistrationOpen {
            tournament,
            entry_fee_bp,
        } => format!(
            "🆕 Tournament registration open!\n{RULE}\n🏆 {tournament}\n💰 Entry fee: {} BP\nJoin now!",
            quantity(*entry_fee_bp)
        ),

        NotificationKind::BpEarned {
            amount,
            reason,
            new_balance,
        } => {
            let balance_line = new_balance
                .map(|b| format!("\nBalance: {} BP", quantity(b)))
                .unwrap_or_default();
            format!(
                "💰 BP earned!\n{RULE}\n+{} BP ({reason}){balance_line}",
                quantity(*amount)
            )
        }

        NotificationKind::BpDailyBonus {
            amount,
            streak_days,
        } => format!(
            "🎁 Daily bonus!\n{RULE}\n+{} BP\n🔥 {streak_days}-day streak!",
            quantity(*amount)
        ),

        NotificationKind::ReferralConversion { conversion, points } => format!(
            "🎯 Referral converted!\n{RULE}\n{}: +{} points earned!\nKeep sharing to collect more.",
            conversion_label(conversion),
            quantity(*points)
        ),

        NotificationKind::ReferralPointsClaimable { points } => format!(
            "💎 Points claimable!\n{RULE}\n{} points are ready to claim.\n{WEB_HOST}/settings/referral",
            quantity(*points)
        ),

        NotificationKind::Unknown { message, data, .. } => {
            let body = match message {
                Some(m) => m.clone(),
                None => serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string()),
            };
            format!("📢 Notice: {body}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(v: serde_json::Value) -> String {
        format_notification(&Notification::from_json(v).expect("object record"))
    }

    #[test]
    fn rank_up_shows_distance() {
        let out = render(json!({"type": "rank_change", "data": {"old_rank": 50, "new_rank": 30}}));
        assert_eq!(out, "🎉 Rank changed!\n#50 → #30 ⬆️20");
    }

    #[test]
    fn rank_with_placeholder_defaults_to_down_zero() {
        let out = render(json!({"type": "rank_change", "data": {"old_rank": "?", "new_rank": 10}}));
        assert!(out.ends_with("#? → #10 ⬇️0"), "{out}");
    }

    #[test]
    fn tournament_ended_with_prize_and_medal() {
        let out = render(json!({
            "type": "tournament_ended",
            "data": {"tournament_name": "Winter Cup", "final_rank": 2, "prize_amount": 12500}
        }));
        assert!(out.contains("🏆 Winter Cup"));
        assert!(out.contains("🥈 Final rank: #2"));
        assert!(out.ends_with("🎁 Prize: 12,500 CROSS"));
    }

    #[test]
    fn tournament_ended_without_prize_has_no_prize_line() {
        let out = render(json!({"type": "tournament_ended", "data": {}}));
        assert!(out.contains("🏆 Tournament"));
        assert!(out.contains("🏅 Final rank: #?"));
        assert!(!out.contains("Prize"));
    }

    #[test]
    fn bp_amounts_are_grouped() {
        let out = render(json!({
            "type": "bp_earned",
            "data": {"amount": 1500, "reason": "battle win", "new_balance": 1234567}
        }));
        assert!(out.contains("+1,500 BP (battle win)"));
        assert!(out.ends_with("Balance: 1,234,567 BP"));
    }

    #[test]
    fn referral_conversion_maps_known_types() {
        let out = render(json!({
            "type": "referral_conversion",
            "data": {"type": "agent_create", "points": 2000}
        }));
        assert!(out.contains("Agent created: +2,000 points"));
        let other = render(json!({"type": "referral_conversion", "data": {"type": "custom"}}));
        assert!(other.contains("custom: +0 points"));
    }

    #[test]
    fn unknown_prefers_message_then_payload() {
        let out = render(json!({"type": "x", "message": "hello"}));
        assert_eq!(out, "📢 Notice: hello");
        let out = render(json!({"type": "x", "data": {"k": 1}}));
        assert_eq!(out, "📢 Notice: {\"k\":1}");
    }

    #[test]
    fn tournament_battle_result_labels() {
        let out = render(json!({
            "type": "tournament_battle_completed",
            "data": {"result": "win", "opponent_name": "Sassbot", "tournament_name": "Open"}
        }));
        assert!(out.contains("vs Sassbot"));
        assert!(out.ends_with("Result: 🏆 Win!"));
    }
}
