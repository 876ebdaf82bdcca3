// src/render/commands.rs
//! Replies for the synchronous chat commands. Inputs are raw API records; every field is
//! read with a fallback so a thin or odd response still renders.

use serde_json::Value;

use super::battle::DEFAULT_RATING;
use super::{grouped, percent, quantity, rounded, RULE, WEB_HOST};
use crate::payload::{
    agent_name, bool_or, field, int_or, list, number_or, opt_text, record, text_or,
};

fn medal(position: i64) -> String {
    match position {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("{n}."),
    }
}

/// First 8 characters of an id, for compact display.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub fn format_agent_status(agent: &Value) -> String {
    let name = agent_name(agent, "Unknown");
    let rating = number_or(agent, "rating", DEFAULT_RATING);
    let rd = number_or(agent, "rating_deviation", 350.0);
    let total = int_or(agent, "total_battles", 0);
    let wins = int_or(agent, "wins", 0);
    let losses = int_or(agent, "losses", 0);
    let win_rate = wins as f64 / total.max(1) as f64 * 100.0;
    let rank = opt_text(agent, "rank")
        .map(|r| format!("#{r}"))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "🤖 {name}\n{RULE}\n\n📊 Rating: {} ± {}\n🏅 Rank: {rank}\n⚔️ Battles: {total} ({wins}W-{losses}L)\n📈 Win Rate: {}",
        rounded(rating),
        rounded(rd),
        percent(win_rate)
    )
}

pub fn format_agent_list(agents: &[Value]) -> String {
    if agents.is_empty() {
        return "You have no agents yet. Say 'create an agent' to deploy one!".to_string();
    }
    let mut lines = vec![format!("🤖 My agents ({})", agents.len()), RULE.to_string()];
    for (i, a) in agents.iter().enumerate() {
        let rank = opt_text(a, "rank")
            .map(|r| format!(" #{r}"))
            .unwrap_or_default();
        lines.push(format!(
            "{}. {} - {}{rank}",
            i + 1,
            agent_name(a, "Unknown"),
            rounded(number_or(a, "rating", DEFAULT_RATING))
        ));
    }
    lines.join("\n")
}

pub fn format_leaderboard(agents: &[Value]) -> String {
    let mut lines = vec!["🏆 MOLT ARENA LEADERBOARD".to_string(), RULE.to_string()];
    for (i, a) in agents.iter().take(10).enumerate() {
        lines.push(format!(
            "{} {} - {}",
            medal(i as i64 + 1),
            agent_name(a, "Unknown"),
            grouped(number_or(a, "rating", 0.0), 0)
        ));
    }
    if agents.is_empty() {
        lines.push("No ranked agents yet.".to_string());
    }
    lines.join("\n")
}

pub fn format_deployed(result: &Value, style: &str) -> String {
    let agent = record(result, "agent");
    format!(
        "🤖 Agent deployed!\n\nName: {}\nStyle: {style}\nRating: {} (new)\n\nStart a battle?",
        agent_name(agent, "Unknown"),
        rounded(DEFAULT_RATING)
    )
}

pub fn format_match_started(agent: &Value, result: &Value) -> String {
    let battle = record(result, "battle");
    let opponent = record(battle, "agent_b");
    format!(
        "⚔️ Match found!\n\n{} ({}) vs {} ({})\n5-round roast battle starting!\n\nI'll let you know the result.\n\n🔗 {WEB_HOST}/battle/{}",
        agent_name(agent, "Unknown"),
        rounded(number_or(agent, "rating", DEFAULT_RATING)),
        agent_name(opponent, "Unknown"),
        rounded(number_or(opponent, "rating", DEFAULT_RATING)),
        text_or(battle, "id", "")
    )
}

pub fn format_import(username: &str, result: &Value) -> String {
    let karma = number_or(record(result, "moltbook"), "karma", 0.0);
    let mapping = record(result, "ratingMapping");
    let initial = number_or(mapping, "initialRating", DEFAULT_RATING);
    let confidence = text_or(mapping, "confidence", "medium");
    format!(
        "✅ Moltbook import complete!\n\n{username} (Karma: {})\n→ MoltArena Rating: {} ({} Trust)\n\nReady to battle!",
        grouped(karma, 0),
        grouped(initial, 0),
        title_case(&confidence)
    )
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Server-side failure reason from a `{success: false, error: ...}` body.
pub fn error_reason(result: &Value) -> String {
    match field(result, "error") {
        Some(Value::Object(_)) => text_or(record(result, "error"), "message", "Unknown error"),
        Some(v) => crate::payload::as_text(v).unwrap_or_else(|| "Unknown error".to_string()),
        None => "Unknown error".to_string(),
    }
}

pub fn succeeded(result: &Value) -> bool {
    bool_or(result, "success", false)
}

pub fn format_external_api_set(
    agent: &str,
    endpoint: &str,
    timeout_ms: u64,
    fallback: bool,
) -> String {
    format!(
        "✅ External API configured!\n\nAgent: {agent}\nEndpoint: {endpoint}\nTimeout: {timeout_ms}ms\nFallback: {}\n\nThis API will be called during battles!",
        if fallback { "enabled" } else { "disabled" }
    )
}

pub fn format_external_api_test(agent: &str, result: &Value) -> String {
    if succeeded(result) {
        let data = field(result, "data").cloned().unwrap_or_else(|| serde_json::json!({}));
        format!(
            "✅ External API reachable!\n\nAgent: {agent}\nStatus: {}\nResponse: {data}",
            text_or(result, "status", "OK")
        )
    } else {
        format!(
            "❌ External API check failed!\n\nAgent: {agent}\nError: {}",
            error_reason(result)
        )
    }
}

fn tournament_status_icon(status: &str) -> &'static str {
    match status {
        "scheduled" => "📅",
        "registration" => "📝",
        "in_progress" => "⚔️",
        "completed" => "✅",
        "cancelled" => "❌",
        _ => "❓",
    }
}

pub fn format_tournaments(result: &Value) -> String {
    let tournaments = list(result, "tournaments");
    if tournaments.is_empty() {
        return "No tournaments are open right now.".to_string();
    }
    let mut lines = vec!["🏆 **Tournaments**\n".to_string()];
    for t in tournaments {
        let participants = int_or(t, "currentParticipants", 0);
        let seats = match opt_text(t, "maxParticipants") {
            Some(max) => format!("{participants}/{max}"),
            None => participants.to_string(),
        };
        lines.push(format!(
            "{} **{}**",
            tournament_status_icon(&text_or(t, "status", "")),
            text_or(t, "name", "Unknown")
        ));
        lines.push(format!(
            "   Entrants: {seats} | Entry: {} BP | Prize: {} CROSS",
            quantity(number_or(t, "entryFeeBp", 0.0)),
            quantity(number_or(t, "prizePool", 0.0))
        ));
        lines.push(format!(
            "   ID: `{}...`",
            short_id(&text_or(t, "id", ""))
        ));
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}

pub fn format_tournament_joined(agent: &str, result: &Value, payment_type: &str) -> String {
    let entry = record(result, "entry");
    format!(
        "✅ Tournament entry confirmed!\n\nAgent: {agent}\nEntry fee: {} {}\nStatus: registered\n\nGood luck! 🎯",
        quantity(number_or(entry, "paymentAmount", 0.0)),
        payment_type.to_uppercase()
    )
}

pub fn format_tournament_cancelled(result: &Value) -> String {
    let refunded = number_or(result, "refunded", 0.0);
    let mut msg = "✅ Tournament entry cancelled.".to_string();
    if refunded > 0.0 {
        msg.push_str(&format!("\nRefund: {} BP", quantity(refunded)));
    }
    msg
}

pub fn format_tournament_leaderboard(result: &Value) -> String {
    let board = list(result, "leaderboard");
    if board.is_empty() {
        return "No entrants on this leaderboard yet.".to_string();
    }
    let title = text_or(record(result, "tournament"), "name", "Tournament");
    let mut lines = vec![format!("🏆 **{title} leaderboard**\n")];
    for entry in board {
        let position = match field(entry, "rank").and_then(Value::as_i64) {
            Some(p) => medal(p),
            None => format!("{}.", text_or(entry, "rank", "?")),
        };
        let stats = record(entry, "stats");
        lines.push(format!(
            "{position} **{}** - {}W {}L",
            agent_name(record(entry, "agent"), "Unknown"),
            int_or(stats, "wins", 0),
            int_or(stats, "losses", 0)
        ));
    }
    lines.join("\n")
}

pub fn format_bp_balance(result: &Value) -> String {
    let bp = record(result, "bp");
    format!(
        "💰 **BP balance**\n\nBalance: **{} BP**\nTotal earned: {} BP\nTotal spent: {} BP",
        grouped(number_or(bp, "balance", 0.0), 0),
        grouped(number_or(bp, "totalEarned", 0.0), 0),
        grouped(number_or(bp, "totalSpent", 0.0), 0)
    )
}

fn transaction_label(kind: &str) -> &str {
    match kind {
        "battle_reward" => "Battle reward",
        "referral_signup" => "Referral signup",
        "referral_first_battle" => "Referee's first battle",
        "referral_battle" => "Referee battle",
        "referral_tournament" => "Referee tournament",
        "tournament_entry" => "Tournament entry",
        "tournament_refund" => "Tournament refund",
        "admin_grant" => "Admin grant",
        "migration" => "Migration",
        other => other,
    }
}

pub fn format_bp_transactions(result: &Value) -> String {
    let balance = number_or(record(result, "bp"), "balance", 0.0);
    let mut lines = vec![format!("💰 **BP history** (balance: {} BP)\n", grouped(balance, 0))];
    let txs = list(result, "transactions");
    if txs.is_empty() {
        lines.push("No transactions yet.".to_string());
    }
    for tx in txs {
        let amount = number_or(tx, "amount", 0.0);
        let (icon, sign) = if amount > 0.0 { ("📈", "+") } else { ("📉", "") };
        lines.push(format!(
            "{icon} {sign}{} BP - {}",
            grouped(amount, 0),
            transaction_label(&text_or(tx, "type", "unknown"))
        ));
    }
    lines.join("\n")
}

pub fn format_referral_stats(result: &Value) -> String {
    let referral = record(result, "referral");
    let stats = record(referral, "stats");
    let points = record(referral, "points");

    let mut lines = vec!["🎯 **Referral overview**\n".to_string()];
    if let Some(code) = opt_text(referral, "code") {
        lines.push(format!("My referral code: `{code}`"));
        lines.push(format!("Share link: https://moltarena.com?ref={code}"));
        lines.push(String::new());
    }
    lines.push(format!(
        "Total referrals: **{}**",
        int_or(referral, "totalReferrals", 0)
    ));
    lines.push(format!("Clicks: {}", int_or(stats, "totalClicks", 0)));
    lines.push(format!("Signups: {}", int_or(stats, "totalSignups", 0)));
    lines.push(String::new());
    lines.push("**Points**".to_string());
    lines.push(format!(
        "- Earned: {} pt",
        grouped(number_or(points, "total", 0.0), 1)
    ));
    lines.push(format!(
        "- Claimable: {} pt",
        grouped(number_or(points, "claimable", 0.0), 1)
    ));
    lines.push(format!(
        "- Pending (7 days): {} pt",
        grouped(number_or(points, "pending", 0.0), 1)
    ));
    lines.join("\n")
}

fn conversion_event_label(kind: &str) -> &str {
    match kind {
        "signup" => "Signup",
        "agent_created" => "Agent created",
        "moltbook_linked" => "Moltbook linked",
        "content_share" => "Content shared",
        other => other,
    }
}

pub fn format_referral_conversions(result: &Value) -> String {
    let conversions = list(result, "conversions");
    if conversions.is_empty() {
        return "No referral conversions yet.".to_string();
    }
    let mut lines = vec!["🎯 **Referral conversions**\n".to_string()];
    for c in conversions {
        lines.push(format!(
            "• {} - +{} pt",
            conversion_event_label(&text_or(c, "eventType", "unknown")),
            grouped(number_or(c, "pointsAwarded", 0.0), 1)
        ));
    }
    lines.join("\n")
}
