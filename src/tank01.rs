use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::context::{ContextSource, GameContext, HomeAway};
use crate::error::FetchError;
use crate::gateway::{RateLimitedClient, TtlCache};
use crate::normalize::{normalize_alias, stat, str_at};

pub const PROVIDER: &str = "tank01";

// Kickoff used when the schedule carries a date but no epoch.
const DEFAULT_KICKOFF_UTC_HOUR: u32 = 18;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tank01Player {
    pub player_id: String,
    pub long_name: String,
    pub team: String,
    pub position: Option<String>,
}

/// One game of box-score stats. Absent sections count as zero volume.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GameLog {
    pub game_id: String,
    pub game_date: Option<NaiveDate>,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub pass_attempts: f64,
    pub completions: f64,
    pub pass_yards: f64,
    pub pass_tds: f64,
    pub interceptions: f64,
    pub carries: f64,
    pub rush_yards: f64,
    pub rush_tds: f64,
    pub targets: f64,
    pub receptions: f64,
    pub rec_yards: f64,
    pub rec_tds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledGame {
    pub game_id: String,
    pub game_date: NaiveDate,
    pub home: String,
    pub away: String,
    pub kickoff: DateTime<Utc>,
}

pub struct Tank01 {
    client: Arc<RateLimitedClient>,
    cache: Arc<TtlCache>,
    base_url: String,
    host: String,
    api_key: Option<String>,
    ttl: u64,
}

impl Tank01 {
    pub fn new(
        client: Arc<RateLimitedClient>,
        cache: Arc<TtlCache>,
        config: &ProviderConfig,
        host: &str,
        ttl: u64,
    ) -> Self {
        Self {
            client,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            host: host.to_string(),
            api_key: config.api_key.clone(),
            ttl,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, key: &str, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured { provider: PROVIDER })?;
        let url = endpoint_url(&self.base_url, path, params)?;
        let headers = [("x-rapidapi-key", api_key), ("x-rapidapi-host", self.host.as_str())];
        self.cache
            .cached(key, self.ttl, || self.client.fetch_json(&url, &headers))
    }

    pub fn player_info(&self, player_name: &str) -> Result<Option<Tank01Player>, FetchError> {
        let name = player_name.trim().to_lowercase();
        let body = self.fetch(
            &format!("tank01_player_{name}"),
            "getNFLPlayerInfo",
            &[("playerName", player_name.trim())],
        )?;
        Ok(parse_player_info(&body))
    }

    /// Game logs for `season`, falling back to the prior season when the
    /// current one has nothing yet. Newest first.
    pub fn game_logs(&self, player_id: &str, season: i32) -> Result<Vec<GameLog>, FetchError> {
        let logs = self.game_logs_for(player_id, season)?;
        if !logs.is_empty() {
            return Ok(logs);
        }
        debug!(player_id, season, "no game logs, trying prior season");
        self.game_logs_for(player_id, season - 1)
    }

    fn game_logs_for(&self, player_id: &str, season: i32) -> Result<Vec<GameLog>, FetchError> {
        let season = season.to_string();
        let body = self.fetch(
            &format!("tank01_games_{player_id}_{season}"),
            "getNFLGamesForPlayer",
            &[("playerID", player_id), ("season", season.as_str())],
        )?;
        Ok(parse_game_logs(&body))
    }

    pub fn team_schedule(&self, team: &str, season: i32) -> Result<Vec<ScheduledGame>, FetchError> {
        let team = normalize_alias(team);
        let season = season.to_string();
        let body = self.fetch(
            &format!("tank01_schedule_{team}_{season}"),
            "getNFLTeamSchedule",
            &[("teamAbv", team.as_str()), ("season", season.as_str())],
        )?;
        Ok(parse_team_schedule(&body))
    }

    /// Shared context from the next scheduled game on or after `today`.
    pub fn game_context(
        &self,
        team: &str,
        season: i32,
        week: u32,
        today: NaiveDate,
    ) -> Result<Option<GameContext>, FetchError> {
        let schedule = self.team_schedule(team, season)?;
        let context = context_from_schedule(&schedule, team, season, week, today);
        if context.is_none() {
            warn!(team, season, "no upcoming game in team schedule");
        }
        Ok(context)
    }
}

fn body_of(payload: &Value) -> &Value {
    payload.get("body").unwrap_or(payload)
}

pub fn parse_player_info(payload: &Value) -> Option<Tank01Player> {
    let body = body_of(payload);
    let first = match body {
        Value::Array(items) => items.first()?,
        Value::Object(_) => body,
        _ => return None,
    };
    let player_id = str_at(first, "playerID")?.to_string();
    Some(Tank01Player {
        player_id,
        long_name: str_at(first, "longName").unwrap_or_default().to_string(),
        team: str_at(first, "team").map(normalize_alias).unwrap_or_default(),
        position: str_at(first, "pos").map(str::to_string),
    })
}

pub fn parse_game_logs(payload: &Value) -> Vec<GameLog> {
    let body = body_of(payload);
    let entries: Vec<&Value> = match body {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => return Vec::new(),
    };
    let mut logs: Vec<GameLog> = entries.into_iter().filter_map(parse_game_log).collect();
    logs.sort_by(|a, b| b.game_date.cmp(&a.game_date).then_with(|| b.game_id.cmp(&a.game_id)));
    logs
}

fn parse_game_log(raw: &Value) -> Option<GameLog> {
    if !raw.is_object() {
        return None;
    }
    let game_id = str_at(raw, "gameID")?.to_string();
    let team = str_at(raw, "teamAbv")
        .or_else(|| str_at(raw, "team"))
        .map(normalize_alias);
    let game_date = str_at(raw, "gameDate")
        .and_then(parse_compact_date)
        .or_else(|| game_id.split('_').next().and_then(parse_compact_date));
    let opponent = team.as_deref().and_then(|t| opponent_from_game_id(&game_id, t));
    let n = |path: &str| stat(raw, path).unwrap_or(0.0);
    Some(GameLog {
        pass_attempts: n("Passing.passAttempts"),
        completions: n("Passing.passCompletions"),
        pass_yards: n("Passing.passYds"),
        pass_tds: n("Passing.passTD"),
        interceptions: n("Passing.int"),
        carries: n("Rushing.carries"),
        rush_yards: n("Rushing.rushYds"),
        rush_tds: n("Rushing.rushTD"),
        targets: n("Receiving.targets"),
        receptions: n("Receiving.receptions"),
        rec_yards: n("Receiving.recYds"),
        rec_tds: n("Receiving.recTD"),
        game_id,
        game_date,
        team,
        opponent,
    })
}

pub fn parse_team_schedule(payload: &Value) -> Vec<ScheduledGame> {
    let body = body_of(payload);
    let Some(items) = body.get("schedule").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut games: Vec<ScheduledGame> = items
        .iter()
        .filter_map(|g| {
            let game_date = str_at(g, "gameDate").and_then(parse_compact_date)?;
            let kickoff = stat(g, "gameTime_epoch")
                .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
                .unwrap_or_else(|| {
                    Utc.from_utc_datetime(&game_date.and_time(
                        NaiveTime::from_hms_opt(DEFAULT_KICKOFF_UTC_HOUR, 0, 0).unwrap_or_default(),
                    ))
                });
            Some(ScheduledGame {
                game_id: str_at(g, "gameID").unwrap_or_default().to_string(),
                game_date,
                home: normalize_alias(str_at(g, "home")?),
                away: normalize_alias(str_at(g, "away")?),
                kickoff,
            })
        })
        .collect();
    games.sort_by_key(|g| g.game_date);
    games
}

pub fn context_from_schedule(
    schedule: &[ScheduledGame],
    team: &str,
    season: i32,
    week: u32,
    today: NaiveDate,
) -> Option<GameContext> {
    let team = normalize_alias(team);
    let idx = schedule.iter().position(|g| g.game_date >= today)?;
    let next = &schedule[idx];
    let is_home = next.home == team;
    let opponent = if is_home { &next.away } else { &next.home };
    let previous_kickoff = idx.checked_sub(1).map(|i| schedule[i].kickoff);
    Some(GameContext {
        season,
        week,
        game_id: Some(next.game_id.clone()).filter(|id| !id.is_empty()),
        team,
        opponent: Some(opponent.clone()),
        home_away: Some(if is_home { HomeAway::Home } else { HomeAway::Away }),
        kickoff: Some(next.kickoff),
        previous_kickoff,
        data_freshness: Utc::now(),
        source: ContextSource::Tank01,
    })
}

fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()
}

// gameID looks like `20241215_LAR@SF`.
fn opponent_from_game_id(game_id: &str, team: &str) -> Option<String> {
    let matchup = game_id.split('_').nth(1)?;
    let (away, home) = matchup.split_once('@')?;
    let (away, home) = (normalize_alias(away), normalize_alias(home));
    if away == team {
        Some(home)
    } else if home == team {
        Some(away)
    } else {
        None
    }
}

fn endpoint_url(base: &str, path: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
    reqwest::Url::parse_with_params(&format!("{base}/{path}"), params)
        .map(String::from)
        .map_err(|err| FetchError::Transport {
            provider: PROVIDER,
            message: format!("bad url for {path}: {err}"),
        })
}
