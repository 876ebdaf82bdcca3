// src/commands.rs
//! Chat commands. Each returns the reply text; API failures become a `❌ ...` line instead
//! of an error so the host can forward the string as-is.

use serde_json::Value;

use crate::client::{ArenaClient, DeployRequest};
use crate::error::{ArenaError, Result};
use crate::payload::{agent_name, id_of, opt_text};
use crate::render::battle::{looks_like_battle, BattleReport};
use crate::render::commands as fmt;

/// Matchmaking strategies accepted by the battle endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Matchmaking {
    #[default]
    SimilarRating,
    ChallengeUp,
    Random,
}

impl Matchmaking {
    pub fn as_str(self) -> &'static str {
        match self {
            Matchmaking::SimilarRating => "similar_rating",
            Matchmaking::ChallengeUp => "challenge_up",
            Matchmaking::Random => "random",
        }
    }
}

/// Personality styles offered at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Style {
    #[default]
    Witty,
    Sarcastic,
    Absurd,
    Dark,
    Wholesome,
}

impl Style {
    pub fn as_str(self) -> &'static str {
        match self {
            Style::Witty => "witty",
            Style::Sarcastic => "sarcastic",
            Style::Absurd => "absurd",
            Style::Dark => "dark",
            Style::Wholesome => "wholesome",
        }
    }
}

/// Case-insensitive substring match over `name` + `display_name`.
pub fn find_agent<'a>(agents: &'a [Value], query: &str) -> Option<&'a Value> {
    let q = query.to_lowercase();
    agents.iter().find(|a| {
        let hay = format!(
            "{}{}",
            opt_text(a, "name").unwrap_or_default(),
            opt_text(a, "display_name").unwrap_or_default()
        );
        hay.to_lowercase().contains(&q)
    })
}

fn failure(action: &str, e: &ArenaError) -> String {
    match e {
        ArenaError::NotFound(msg) => msg.clone(),
        other => format!("❌ {action} failed: {}", other.user_message()),
    }
}

fn reply(action: &str, r: Result<String>) -> String {
    r.unwrap_or_else(|e| failure(action, &e))
}

pub struct Commands {
    client: ArenaClient,
}

impl Commands {
    pub fn new(client: ArenaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ArenaClient {
        &self.client
    }

    /// The named agent, or the first one when no name is given.
    async fn pick_agent(&self, name: Option<&str>) -> Result<(String, Value)> {
        let agents = self.client.list_agents(true).await?;
        if agents.is_empty() {
            return Err(ArenaError::NotFound(
                "You have no agents yet. Create one first.".to_string(),
            ));
        }
        let agent = match name {
            Some(n) => find_agent(&agents, n)
                .ok_or_else(|| ArenaError::NotFound(format!("No agent matching '{n}'.")))?,
            None => &agents[0],
        };
        let id = id_of(agent, "id")
            .ok_or_else(|| ArenaError::Decode("agent record without id".to_string()))?;
        Ok((id, agent.clone()))
    }

    pub async fn deploy_agent(
        &self,
        name: &str,
        style: Style,
        traits: Option<&str>,
        backstory: Option<String>,
    ) -> String {
        let req = DeployRequest::new(name, style.as_str())
            .with_traits_csv(traits)
            .with_backstory(backstory);
        reply(
            "Deploy",
            self.client
                .deploy_agent(&req)
                .await
                .map(|r| fmt::format_deployed(&r, style.as_str())),
        )
    }

    pub async fn list_agents(&self) -> String {
        reply(
            "Lookup",
            self.client
                .list_agents(true)
                .await
                .map(|a| fmt::format_agent_list(&a)),
        )
    }

    pub async fn status(&self, agent: Option<&str>) -> String {
        let run = async {
            let (id, _) = self.pick_agent(agent).await?;
            let status = self.client.agent_status(&id).await?;
            let record = match status.get("agent") {
                Some(a) if a.is_object() => a,
                _ => &status,
            };
            Ok::<_, ArenaError>(fmt::format_agent_status(record))
        };
        reply("Lookup", run.await)
    }

    pub async fn start_battle(&self, agent: Option<&str>, matchmaking: Matchmaking) -> String {
        let run = async {
            let (id, record) = self.pick_agent(agent).await?;
            let result = self
                .client
                .start_battle(&id, matchmaking.as_str(), None, None)
                .await?;
            Ok::<_, ArenaError>(fmt::format_match_started(&record, &result))
        };
        reply("Battle start", run.await)
    }

    pub async fn leaderboard(&self, limit: u32) -> String {
        reply(
            "Lookup",
            self.client
                .leaderboard(limit)
                .await
                .map(|a| fmt::format_leaderboard(&a)),
        )
    }

    pub async fn import_moltbook(&self, username: &str) -> String {
        reply(
            "Import",
            self.client
                .import_moltbook(username, true)
                .await
                .map(|r| fmt::format_import(username, &r)),
        )
    }

    pub async fn last_battle(&self) -> String {
        let run = async {
            let battles = self.client.recent_battles(1).await?;
            Ok::<_, ArenaError>(match battles.first() {
                Some(b) if looks_like_battle(b) => BattleReport::from_value(b).render(),
                _ => "No battles yet.".to_string(),
            })
        };
        reply("Lookup", run.await)
    }

    pub async fn set_external_api(
        &self,
        agent: Option<&str>,
        endpoint: &str,
        timeout_ms: u64,
        fallback: bool,
    ) -> String {
        if endpoint.trim().is_empty() {
            return "❌ An endpoint URL is required.".to_string();
        }
        let run = async {
            let (id, record) = self.pick_agent(agent).await?;
            let result = self
                .client
                .set_external_api(&id, endpoint, timeout_ms, fallback)
                .await?;
            Ok::<_, ArenaError>(if fmt::succeeded(&result) {
                fmt::format_external_api_set(
                    &agent_name(&record, "Unknown"),
                    endpoint,
                    timeout_ms,
                    fallback,
                )
            } else {
                format!("❌ Setup failed: {}", fmt::error_reason(&result))
            })
        };
        reply("External API setup", run.await)
    }

    pub async fn remove_external_api(&self, agent: Option<&str>) -> String {
        let run = async {
            let (id, record) = self.pick_agent(agent).await?;
            let result = self.client.remove_external_api(&id).await?;
            Ok::<_, ArenaError>(if fmt::succeeded(&result) {
                format!(
                    "✅ External API removed from {}.",
                    agent_name(&record, "Unknown")
                )
            } else {
                format!("❌ Removal failed: {}", fmt::error_reason(&result))
            })
        };
        reply("Removal", run.await)
    }

    pub async fn test_external_api(&self, agent: Option<&str>) -> String {
        let run = async {
            let (id, record) = self.pick_agent(agent).await?;
            let result = self.client.test_external_api(&id).await?;
            Ok::<_, ArenaError>(fmt::format_external_api_test(
                &agent_name(&record, "Unknown"),
                &result,
            ))
        };
        reply("Test", run.await)
    }

    pub async fn tournaments(&self, status: Option<&str>) -> String {
        reply(
            "Tournament lookup",
            self.client
                .tournaments(status, 10)
                .await
                .map(|r| fmt::format_tournaments(&r)),
        )
    }

    pub async fn join_tournament(
        &self,
        tournament_id: &str,
        agent: Option<&str>,
        payment_type: &str,
    ) -> String {
        let run = async {
            let (id, record) = self.pick_agent(agent).await?;
            let result = self
                .client
                .join_tournament(tournament_id, &id, payment_type)
                .await?;
            Ok::<_, ArenaError>(if fmt::succeeded(&result) {
                fmt::format_tournament_joined(
                    &agent_name(&record, "Unknown"),
                    &result,
                    payment_type,
                )
            } else {
                format!("❌ Entry failed: {}", fmt::error_reason(&result))
            })
        };
        reply("Entry", run.await)
    }

    pub async fn cancel_tournament(&self, tournament_id: &str, entry_id: &str) -> String {
        let run = async {
            let result = self
                .client
                .cancel_tournament(tournament_id, entry_id)
                .await?;
            Ok::<_, ArenaError>(if fmt::succeeded(&result) {
                fmt::format_tournament_cancelled(&result)
            } else {
                format!("❌ Cancel failed: {}", fmt::error_reason(&result))
            })
        };
        reply("Cancel", run.await)
    }

    pub async fn tournament_leaderboard(&self, tournament_id: &str, limit: u32) -> String {
        reply(
            "Leaderboard lookup",
            self.client
                .tournament_leaderboard(tournament_id, limit)
                .await
                .map(|r| fmt::format_tournament_leaderboard(&r)),
        )
    }

    pub async fn bp_balance(&self) -> String {
        reply(
            "BP lookup",
            self.client.bp().await.map(|r| fmt::format_bp_balance(&r)),
        )
    }

    pub async fn bp_history(&self, limit: u32) -> String {
        reply(
            "BP history lookup",
            self.client
                .bp_transactions(limit)
                .await
                .map(|r| fmt::format_bp_transactions(&r)),
        )
    }

    pub async fn referral_stats(&self) -> String {
        reply(
            "Referral lookup",
            self.client
                .referral()
                .await
                .map(|r| fmt::format_referral_stats(&r)),
        )
    }

    pub async fn referral_history(&self, limit: u32) -> String {
        reply(
            "Conversion lookup",
            self.client
                .referral_conversions(limit)
                .await
                .map(|r| fmt::format_referral_conversions(&r)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_agent_matches_either_name_case_insensitively() {
        let agents = vec![
            json!({"id": "1", "name": "roastbot"}),
            json!({"id": "2", "name": "x", "display_name": "Captain Snark"}),
        ];
        assert_eq!(find_agent(&agents, "SNARK").unwrap()["id"], "2");
        assert_eq!(find_agent(&agents, "roast").unwrap()["id"], "1");
        assert!(find_agent(&agents, "nobody").is_none());
    }

    #[test]
    fn not_found_is_shown_verbatim() {
        let e = ArenaError::NotFound("No agent matching 'z'.".into());
        assert_eq!(failure("Lookup", &e), "No agent matching 'z'.");
        assert_eq!(
            failure("Lookup", &ArenaError::Connection),
            "❌ Lookup failed: cannot reach the API server, check the network"
        );
    }

    #[test]
    fn enum_wire_names() {
        assert_eq!(Matchmaking::default().as_str(), "similar_rating");
        assert_eq!(Style::Wholesome.as_str(), "wholesome");
    }
}
