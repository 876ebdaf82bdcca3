// src/render/battle.rs
use serde_json::Value;

use super::{rounded, signed, RULE, WEB_HOST};
use crate::payload::{agent_name, field, id_of, list, number_or, opt_text, record};

pub const DEFAULT_RATING: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Victory,
    Defeat,
    Draw,
}

impl BattleOutcome {
    pub fn label(self) -> &'static str {
        match self {
            BattleOutcome::Victory => "Victory!",
            BattleOutcome::Defeat => "Defeat...",
            BattleOutcome::Draw => "Draw!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    pub id: Option<String>,
    pub name: String,
}

impl Side {
    fn from_value(v: &Value, fallback: &str) -> Self {
        Self {
            id: id_of(v, "id"),
            name: agent_name(v, fallback),
        }
    }
}

/// A finished battle, read tolerantly from the service's battle record.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleReport {
    pub id: String,
    pub number: String,
    pub winner_id: Option<String>,
    /// Winner id per round, in play order.
    pub rounds: Vec<Option<String>>,
    pub agent_a: Side,
    pub agent_b: Side,
    pub rating_before: f64,
    pub rating_after: f64,
}

impl BattleReport {
    pub fn from_value(battle: &Value) -> Self {
        let id = opt_text(battle, "id").unwrap_or_default();
        let number = opt_text(battle, "battle_number").unwrap_or_else(|| {
            if id.is_empty() {
                "???".to_string()
            } else {
                id.chars().take(8).collect()
            }
        });

        let rounds = list(battle, "rounds")
            .iter()
            .map(|r| id_of(r, "winner_id").or_else(|| id_of(r, "winner")))
            .collect();

        let rating = record(battle, "rating_change");

        Self {
            number,
            winner_id: id_of(battle, "winner_id"),
            rounds,
            agent_a: Side::from_value(record(battle, "agent_a"), "Agent A"),
            agent_b: Side::from_value(record(battle, "agent_b"), "Agent B"),
            rating_before: number_or(rating, "before", DEFAULT_RATING),
            rating_after: number_or(rating, "after", DEFAULT_RATING),
            id,
        }
    }

    /// Victory when agent A won, defeat when agent B won, draw otherwise
    /// (including a missing winner).
    pub fn outcome(&self) -> BattleOutcome {
        match self.winner_id.as_deref() {
            Some(w) if self.agent_a.id.as_deref() == Some(w) => BattleOutcome::Victory,
            Some(w) if self.agent_b.id.as_deref() == Some(w) => BattleOutcome::Defeat,
            _ => BattleOutcome::Draw,
        }
    }

    /// One flag per round: `true` when the round went to the eventual battle winner.
    pub fn round_wins(&self) -> Vec<bool> {
        self.rounds
            .iter()
            .map(|r| match (r, &self.winner_id) {
                (Some(round), Some(winner)) => round == winner,
                _ => false,
            })
            .collect()
    }

    pub fn rounds_line(&self) -> String {
        let wins = self.round_wins();
        if wins.is_empty() {
            return "No rounds recorded".to_string();
        }
        wins.iter()
            .enumerate()
            .map(|(i, won)| format!("R{} {}", i + 1, if *won { "🟢" } else { "🔴" }))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn rating_line(&self) -> String {
        let before = rounded(self.rating_before);
        let after = rounded(self.rating_after);
        format!(
            "📈 Rating: {before} → {after} ({})",
            signed(rounded(self.rating_after - self.rating_before))
        )
    }

    pub fn render(&self) -> String {
        let outcome = self.outcome();
        let (winner, loser) = match outcome {
            BattleOutcome::Defeat => (&self.agent_b.name, &self.agent_a.name),
            _ => (&self.agent_a.name, &self.agent_b.name),
        };

        format!(
            "🔥 MOLT ARENA BATTLE #{number}\n{RULE}\n\n🏆 {winner}  vs  {loser}\n\n{rounds}\n\n📊 Result: {result}\n{rating}\n\n🔗 {WEB_HOST}/battle/{id}",
            number = self.number,
            rounds = self.rounds_line(),
            result = outcome.label(),
            rating = self.rating_line(),
            id = self.id,
        )
    }
}

/// Convenience for callers holding a raw battle record.
pub fn format_battle_result(battle: &Value) -> String {
    BattleReport::from_value(battle).render()
}

/// True when `battle` carries at least an id or rounds; used to skip empty records.
pub fn looks_like_battle(battle: &Value) -> bool {
    field(battle, "id").is_some() || !list(battle, "rounds").is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": "b7f3c2a9-0000-4000-8000-000000000000",
            "winner_id": "A",
            "rounds": [{"winner_id": "A"}, {"winner_id": "B"}, {"winner": "A"}],
            "agent_a": {"id": "A", "display_name": "Roastmaster"},
            "agent_b": {"id": "B", "name": "grumpy"},
            "rating_change": {"before": 1500.4, "after": 1516.2}
        })
    }

    #[test]
    fn round_markers_follow_winner() {
        let r = BattleReport::from_value(&sample());
        assert_eq!(r.round_wins(), vec![true, false, true]);
        assert_eq!(r.rounds_line(), "R1 🟢 | R2 🔴 | R3 🟢");
    }

    #[test]
    fn victory_card_layout() {
        let out = format_battle_result(&sample());
        assert!(out.starts_with("🔥 MOLT ARENA BATTLE #b7f3c2a9\n"));
        assert!(out.contains("🏆 Roastmaster  vs  grumpy"));
        assert!(out.contains("📊 Result: Victory!"));
        assert!(out.contains("📈 Rating: 1500 → 1516 (+16)"));
        assert!(out.ends_with("/battle/b7f3c2a9-0000-4000-8000-000000000000"));
    }

    #[test]
    fn defeat_swaps_names_and_shows_negative_delta() {
        let mut b = sample();
        b["winner_id"] = json!("B");
        b["rating_change"] = json!({"before": 1600, "after": 1588});
        let out = format_battle_result(&b);
        assert!(out.contains("🏆 grumpy  vs  Roastmaster"));
        assert!(out.contains("Defeat..."));
        assert!(out.contains("(-12)"));
    }

    #[test]
    fn empty_record_uses_placeholders() {
        let out = format_battle_result(&json!({}));
        assert!(out.contains("#???"));
        assert!(out.contains("🏆 Agent A  vs  Agent B"));
        assert!(out.contains("Draw!"));
        assert!(out.contains("1500 → 1500 (0)"));
        assert!(!looks_like_battle(&json!({})));
    }

    #[test]
    fn explicit_battle_number_wins_over_id() {
        let out = format_battle_result(&json!({"battle_number": 1042, "id": "xyz"}));
        assert!(out.contains("BATTLE #1042"));
    }
}
