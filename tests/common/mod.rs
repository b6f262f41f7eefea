#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;

use propdesk::config::{
    AppConfig, CacheTtls, EvidenceThresholds, ModelConfig, ProviderConfig, SpeechConfig,
    default_player_teams,
};
use propdesk::http_client::{RawResponse, Transport};
use propdesk::llm::{CompletionModel, CompletionRequest, ResponseFormat};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn fixture_json(name: &str) -> Value {
    serde_json::from_str(&read_fixture(name)).expect("fixture should be valid json")
}

/// Routes GETs to fixtures by url substring and records every url seen.
#[derive(Default)]
pub struct FakeTransport {
    routes: Vec<(String, String)>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, needle: &str, fixture: &str) -> Self {
        self.routes.push((needle.to_string(), read_fixture(fixture)));
        self
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<RawResponse, String> {
        self.calls.lock().expect("calls lock").push(url.to_string());
        match self.routes.iter().find(|(needle, _)| url.contains(needle.as_str())) {
            Some((_, body)) => Ok(RawResponse::ok(body.clone().into_bytes())),
            None => Ok(RawResponse {
                status: 404,
                status_text: "Not Found".to_string(),
                body: b"{\"message\":\"no route\"}".to_vec(),
            }),
        }
    }

    fn post_json(&self, url: &str, _headers: &[(&str, &str)], _body: &Value) -> Result<RawResponse, String> {
        Err(format!("unexpected POST {url}"))
    }
}

/// Answers by response format: JSON-object requests get the scout reply,
/// schema requests get the reply registered under the schema name.
pub struct CannedModel {
    pub scout: Option<String>,
    pub by_schema: HashMap<&'static str, String>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl CannedModel {
    pub fn new() -> Self {
        Self {
            scout: None,
            by_schema: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn scout(mut self, reply: &str) -> Self {
        self.scout = Some(reply.to_string());
        self
    }

    pub fn schema(mut self, name: &'static str, reply: &str) -> Self {
        self.by_schema.insert(name, reply.to_string());
        self
    }

    pub fn seen(&self, schema: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|r| match &r.format {
                ResponseFormat::Schema { name, .. } => *name == schema,
                ResponseFormat::JsonObject => schema == "json_object",
            })
            .count()
    }
}

impl CompletionModel for CannedModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().expect("requests lock").push(request.clone());
        let reply = match &request.format {
            ResponseFormat::JsonObject => self.scout.clone(),
            ResponseFormat::Schema { name, .. } => self.by_schema.get(name).cloned(),
        };
        reply.ok_or_else(|| anyhow!("model unavailable"))
    }
}

pub fn provider(base: &str, key: Option<&str>) -> ProviderConfig {
    ProviderConfig {
        base_url: base.to_string(),
        api_key: key.map(str::to_string),
        min_delay: Duration::ZERO,
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
}

pub fn test_config(data_dir: &Path, tank01_key: Option<&str>, sportradar_key: Option<&str>) -> AppConfig {
    AppConfig {
        sportradar: provider("https://sportradar.test/nfl/v7/en", sportradar_key),
        tank01: provider("https://tank01.test", tank01_key),
        tank01_host: "tank01.test".to_string(),
        weather: provider("https://nws.test", None),
        weather_user_agent: "(propdesk-tests)".to_string(),
        model: ModelConfig {
            base_url: "https://model.test/v1".to_string(),
            api_key: None,
            agent_model: "agent-model".to_string(),
            master_model: "master-model".to_string(),
            script_model: "script-model".to_string(),
        },
        speech: SpeechConfig {
            base_url: "https://speech.test/v1".to_string(),
            api_key: None,
            bookie_voice: "bookie".to_string(),
            skeptic_voice: "skeptic".to_string(),
            model_id: "eleven_turbo_v2".to_string(),
        },
        ttls: CacheTtls::default(),
        thresholds: EvidenceThresholds::default(),
        data_dir: data_dir.to_path_buf(),
        bind_addr: "127.0.0.1:0".to_string(),
        request_timeout: Duration::from_secs(30),
        season_start: date("2025-09-04"),
        default_team: "BAL".to_string(),
        player_teams: default_player_teams(),
    }
}

/// Fixture routes for a Ravens home game against Cincinnati.
pub fn ravens_transport() -> FakeTransport {
    FakeTransport::new()
        .route("getNFLPlayerInfo", "tank01_player_info.json")
        .route("getNFLGamesForPlayer", "tank01_games_for_player.json")
        .route("getNFLTeamSchedule?teamAbv=BAL", "tank01_team_schedule_bal.json")
        .route("/points/39.2780,-76.6227", "nws_points_baltimore.json")
        .route("/gridpoints/LWX/109,86/forecast", "nws_forecast_lwx.json")
        .route("/schedule.json", "sportradar_weekly_schedule.json")
        .route("/injuries.json", "sportradar_injuries.json")
        .route("/teams/bal-id/depth_chart.json", "sportradar_depth_chart_bal.json")
        .route("/teams/bal-id/statistics.json", "sportradar_team_stats_bal.json")
        .route("/teams/cin-id/statistics.json", "sportradar_team_stats_cin.json")
        .route("/teams/bal-id/full_roster.json", "sportradar_roster_bal.json")
        .route("/players/sr-henry/profile.json", "sportradar_profile_henry.json")
}
