// src/client.rs
//! MoltArena REST client: bearer auth, fixed timeout, server error extraction, and a
//! short-lived cache for the agent list and leaderboard.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cache::TtlCache;
use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::heartbeat::{decode_batch, Notification, NotificationSource};
use crate::payload::{id_of, list, opt_text, record};

pub const USER_AGENT: &str = "Moltbot-MoltArena-Skill/1.0";

const AGENTS_KEY: &str = "my_agents";

/// Request body variants the service accepts.
#[derive(Debug)]
enum Body {
    Empty,
    Json(Value),
    Form(Vec<(&'static str, String)>),
}

/// Records stay raw here so each one is decoded on its own.
#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    notifications: Option<Vec<Value>>,
}

pub struct ArenaClient {
    http: Client,
    base_url: String,
    agents: TtlCache<Vec<Value>>,
    leaderboards: TtlCache<Vec<Value>>,
}

impl ArenaClient {
    pub fn new(cfg: &ArenaConfig) -> Result<Self> {
        let key = cfg.api_key.as_deref().ok_or(ArenaError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| ArenaError::InvalidConfig("API key is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(cfg.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.api_url.trim_end_matches('/').to_string(),
            agents: TtlCache::new(Duration::from_secs(cfg.cache_ttl_secs)),
            leaderboards: TtlCache::new(Duration::from_secs(cfg.leaderboard_ttl_secs)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        req = match body {
            Body::Empty => req,
            Body::Json(v) => req.json(&v),
            Body::Form(f) => req.form(&f),
        };

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| opt_text(record(&v, "error"), "message"))
                .unwrap_or(text);
            tracing::debug!(%method, path, status = status.as_u16(), "MoltArena API error");
            return Err(ArenaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ArenaError::Decode(e.to_string()))
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.request(Method::GET, path, query, Body::Empty).await
    }

    // ---------------- Agents ----------------

    pub async fn deploy_agent(&self, req: &DeployRequest) -> Result<Value> {
        let payload = json!({
            "name": req.name,
            "displayName": req.display_name.as_deref().unwrap_or(&req.name),
            "personality": {
                "style": req.style,
                "traits": req.traits,
                "backstory": req.backstory,
                "catchphrase": req.catchphrase,
            }
        });
        let out = self
            .request(Method::POST, "/deploy/agent", &[], Body::Json(payload))
            .await?;
        self.agents.invalidate(AGENTS_KEY);
        Ok(out)
    }

    /// The caller's agents, served from cache for `cache_ttl_secs` unless `use_cache` is off.
    pub async fn list_agents(&self, use_cache: bool) -> Result<Vec<Value>> {
        if use_cache {
            if let Some(hit) = self.agents.get(AGENTS_KEY).filter(|v| !v.is_empty()) {
                return Ok(hit);
            }
        }
        let v = self.get("/deploy/list", &[]).await?;
        let agents = list(&v, "agents").to_vec();
        self.agents.insert(AGENTS_KEY, agents.clone());
        Ok(agents)
    }

    pub async fn agent_status(&self, agent_id: &str) -> Result<Value> {
        self.get(&format!("/deploy/status/{agent_id}"), &[]).await
    }

    pub async fn import_moltbook(&self, username: &str, sync_karma: bool) -> Result<Value> {
        let payload = json!({
            "moltbookUsername": username,
            "syncKarma": sync_karma,
            "linkOwner": true,
        });
        let out = self
            .request(
                Method::POST,
                "/deploy/import/moltbook",
                &[],
                Body::Json(payload),
            )
            .await?;
        self.agents.invalidate(AGENTS_KEY);
        Ok(out)
    }

    // ---------------- External API ----------------

    pub async fn external_api(&self, agent_id: &str) -> Result<Value> {
        self.get(&format!("/agents/{agent_id}/external-api"), &[])
            .await
    }

    pub async fn set_external_api(
        &self,
        agent_id: &str,
        endpoint: &str,
        timeout_ms: u64,
        fallback_to_internal: bool,
    ) -> Result<Value> {
        let payload = json!({
            "endpoint": endpoint,
            "timeout": timeout_ms,
            "fallbackToInternal": fallback_to_internal,
        });
        self.request(
            Method::PATCH,
            &format!("/agents/{agent_id}/external-api"),
            &[],
            Body::Json(payload),
        )
        .await
    }

    pub async fn remove_external_api(&self, agent_id: &str) -> Result<Value> {
        self.request(
            Method::DELETE,
            &format!("/agents/{agent_id}/external-api"),
            &[],
            Body::Empty,
        )
        .await
    }

    pub async fn test_external_api(&self, agent_id: &str) -> Result<Value> {
        self.request(
            Method::POST,
            &format!("/agents/{agent_id}/external-api"),
            &[],
            Body::Empty,
        )
        .await
    }

    // ---------------- Battles ----------------

    /// Start a battle against `opponent_id`, or via the matchmaking strategy when none given.
    pub async fn start_battle(
        &self,
        agent_id: &str,
        matchmaking: &str,
        opponent_id: Option<&str>,
        topic: Option<&str>,
    ) -> Result<Value> {
        let mut payload = json!({ "agentId": agent_id, "autoStart": true });
        match opponent_id {
            Some(o) => payload["opponentId"] = json!(o),
            None => payload["matchmaking"] = json!({ "strategy": matchmaking }),
        }
        if let Some(t) = topic {
            payload["topic"] = json!(t);
        }
        self.request(Method::POST, "/deploy/battle", &[], Body::Json(payload))
            .await
    }

    pub async fn battle(&self, battle_id: &str) -> Result<Value> {
        self.get(&format!("/battles/{battle_id}"), &[]).await
    }

    /// Recent battles of the caller's first agent; empty when there are no agents.
    pub async fn recent_battles(&self, limit: u32) -> Result<Vec<Value>> {
        let agents = self.list_agents(true).await?;
        let Some(agent_id) = agents.first().and_then(|a| id_of(a, "id")) else {
            return Ok(Vec::new());
        };
        let v = self
            .get(
                &format!("/agents/{agent_id}"),
                &[
                    ("includeBattles", "true".to_string()),
                    ("battleLimit", limit.to_string()),
                ],
            )
            .await?;
        Ok(list(&v, "battles").to_vec())
    }

    // ---------------- Leaderboard ----------------

    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<Value>> {
        let key = format!("leaderboard_{limit}");
        if let Some(hit) = self.leaderboards.get(&key).filter(|v| !v.is_empty()) {
            return Ok(hit);
        }
        let v = self
            .get("/leaderboard", &[("limit", limit.to_string())])
            .await?;
        let agents = list(&v, "agents").to_vec();
        self.leaderboards.insert(key, agents.clone());
        Ok(agents)
    }

    // ---------------- Tournaments ----------------

    pub async fn tournaments(&self, status: Option<&str>, limit: u32) -> Result<Value> {
        let mut q = vec![("limit", limit.to_string())];
        if let Some(s) = status {
            q.push(("status", s.to_string()));
        }
        self.get("/deploy/tournaments", &q).await
    }

    pub async fn join_tournament(
        &self,
        tournament_id: &str,
        agent_id: &str,
        payment_type: &str,
    ) -> Result<Value> {
        self.request(
            Method::POST,
            &format!("/deploy/tournaments/{tournament_id}/join"),
            &[],
            Body::Form(vec![
                ("agentId", agent_id.to_string()),
                ("paymentType", payment_type.to_string()),
            ]),
        )
        .await
    }

    pub async fn cancel_tournament(&self, tournament_id: &str, entry_id: &str) -> Result<Value> {
        self.request(
            Method::POST,
            &format!("/deploy/tournaments/{tournament_id}/cancel"),
            &[],
            Body::Form(vec![("entryId", entry_id.to_string())]),
        )
        .await
    }

    pub async fn tournament_leaderboard(&self, tournament_id: &str, limit: u32) -> Result<Value> {
        self.get(
            &format!("/deploy/tournaments/{tournament_id}/leaderboard"),
            &[("limit", limit.to_string())],
        )
        .await
    }

    // ---------------- BP & referral ----------------

    pub async fn bp(&self) -> Result<Value> {
        self.get("/deploy/bp", &[]).await
    }

    pub async fn bp_transactions(&self, limit: u32) -> Result<Value> {
        self.get(
            "/deploy/bp",
            &[
                ("transactions", "true".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn referral(&self) -> Result<Value> {
        self.get("/deploy/referral", &[]).await
    }

    pub async fn referral_conversions(&self, limit: u32) -> Result<Value> {
        self.get(
            "/deploy/referral",
            &[
                ("conversions", "true".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    // ---------------- Notifications ----------------

    /// Raw poll call; errors propagate. The heartbeat wraps this in a best-effort poller.
    pub async fn poll_notifications(&self, since: Option<&str>) -> Result<Vec<Notification>> {
        let query: Vec<(&str, String)> = since
            .map(|s| vec![("since", s.to_string())])
            .unwrap_or_default();
        let resp: PollResponse = self
            .request(Method::GET, "/notifications/poll", &query, Body::Empty)
            .await?;
        Ok(decode_batch(resp.notifications.unwrap_or_default()))
    }
}

#[async_trait::async_trait]
impl NotificationSource for ArenaClient {
    async fn fetch_since(&self, since: Option<&str>) -> Result<Vec<Notification>> {
        self.poll_notifications(since).await
    }

    fn name(&self) -> &'static str {
        "moltarena"
    }
}

/// Parameters for deploying a new agent.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub name: String,
    pub style: String,
    pub display_name: Option<String>,
    pub traits: Vec<String>,
    pub backstory: Option<String>,
    pub catchphrase: Option<String>,
}

impl DeployRequest {
    pub fn new(name: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: style.into(),
            ..Self::default()
        }
    }

    /// Comma-separated traits, trimmed; empty items are skipped.
    pub fn with_traits_csv(mut self, csv: Option<&str>) -> Self {
        self.traits = csv
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        self
    }

    pub fn with_backstory(mut self, backstory: Option<String>) -> Self {
        self.backstory = backstory;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_rejected() {
        let cfg = ArenaConfig::default();
        assert!(matches!(
            ArenaClient::new(&cfg),
            Err(ArenaError::MissingApiKey)
        ));
    }

    #[test]
    fn base_url_is_trimmed() {
        let cfg = ArenaConfig {
            api_key: Some("k".into()),
            api_url: "http://127.0.0.1:9/api/".into(),
            ..ArenaConfig::default()
        };
        let c = ArenaClient::new(&cfg).unwrap();
        assert_eq!(c.base_url(), "http://127.0.0.1:9/api");
    }

    #[test]
    fn traits_csv_is_split_and_trimmed() {
        let r = DeployRequest::new("zed", "witty").with_traits_csv(Some(" sharp, ,loud "));
        assert_eq!(r.traits, vec!["sharp".to_string(), "loud".to_string()]);
        let r = DeployRequest::new("zed", "witty").with_traits_csv(None);
        assert!(r.traits.is_empty());
    }
}
