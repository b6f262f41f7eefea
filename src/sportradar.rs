use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::{CacheTtls, ProviderConfig};
use crate::context::HomeAway;
use crate::error::FetchError;
use crate::gateway::{RateLimitedClient, TtlCache};
use crate::season::SEASON_TYPE;

pub const PROVIDER: &str = "sportradar";

#[derive(Debug, Deserialize, Default)]
struct ScheduleResponse {
    #[serde(default)]
    week: ScheduleWeek,
}

#[derive(Debug, Deserialize, Default)]
struct ScheduleWeek {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
struct ScheduleGame {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    scheduled: Option<String>,
    home: ScheduleTeam,
    away: ScheduleTeam,
}

#[derive(Debug, Deserialize)]
struct ScheduleTeam {
    id: String,
    #[serde(default)]
    alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGame {
    pub game_id: String,
    pub team_id: String,
    pub opponent_id: String,
    pub opponent_alias: String,
    pub home_away: HomeAway,
    pub scheduled: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterMatch {
    pub player_id: String,
    pub team_alias: String,
    pub position: String,
    pub full_name: String,
}

/// Play-by-play/season statistics provider. Every call goes through the
/// provider's own rate-limited slot and the shared response cache.
pub struct Sportradar {
    client: Arc<RateLimitedClient>,
    cache: Arc<TtlCache>,
    base_url: String,
    api_key: Option<String>,
    ttls: CacheTtls,
}

impl Sportradar {
    pub fn new(
        client: Arc<RateLimitedClient>,
        cache: Arc<TtlCache>,
        config: &ProviderConfig,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            client,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            ttls,
        }
    }

    fn fetch(&self, endpoint: &str) -> Result<Value, FetchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured { provider: PROVIDER })?;
        let url = format!("{}{}?api_key={}", self.base_url, endpoint, key);
        self.client.fetch_json(&url, &[])
    }

    fn cached(&self, key: &str, endpoint: &str, ttl: u64) -> Result<Value, FetchError> {
        self.cache.cached(key, ttl, || self.fetch(endpoint))
    }

    pub fn weekly_schedule(&self, season: i32, week: u32) -> Result<Value, FetchError> {
        self.cached(
            &format!("schedule_{season}_{SEASON_TYPE}_{week}"),
            &format!("/games/{season}/{SEASON_TYPE}/{week}/schedule.json"),
            self.ttls.schedule,
        )
    }

    pub fn resolve_game(
        &self,
        season: i32,
        week: u32,
        team_alias: &str,
    ) -> Result<Option<ResolvedGame>, FetchError> {
        let schedule = self.weekly_schedule(season, week)?;
        let game = find_game(&schedule, team_alias);
        if game.is_none() {
            warn!(team = team_alias, season, week, "no game in weekly schedule");
        }
        Ok(game)
    }

    pub fn team_season_stats(&self, season: i32, team_id: &str) -> Result<Value, FetchError> {
        self.cached(
            &format!("season_stats_{season}_{team_id}"),
            &format!("/seasons/{season}/{SEASON_TYPE}/teams/{team_id}/statistics.json"),
            self.ttls.season_stats,
        )
    }

    pub fn team_roster(&self, team_id: &str) -> Result<Value, FetchError> {
        self.cached(
            &format!("roster_{team_id}"),
            &format!("/teams/{team_id}/full_roster.json"),
            self.ttls.roster,
        )
    }

    pub fn player_profile(&self, player_id: &str) -> Result<Value, FetchError> {
        self.cached(
            &format!("player_profile_{player_id}"),
            &format!("/players/{player_id}/profile.json"),
            self.ttls.roster,
        )
    }

    pub fn injuries(&self, season: i32, week: u32) -> Result<Value, FetchError> {
        self.cached(
            &format!("injuries_{season}_{SEASON_TYPE}_{week}"),
            &format!("/seasons/{season}/{SEASON_TYPE}/{week}/injuries.json"),
            self.ttls.injuries,
        )
    }

    pub fn depth_chart(&self, team_id: &str) -> Result<Value, FetchError> {
        self.cached(
            &format!("depth_chart_{team_id}"),
            &format!("/teams/{team_id}/depth_chart.json"),
            self.ttls.depth_chart,
        )
    }
}

pub fn find_game(schedule: &Value, team_alias: &str) -> Option<ResolvedGame> {
    let parsed: ScheduleResponse = serde_json::from_value(schedule.clone()).ok()?;
    let alias = team_alias.to_ascii_uppercase();
    let game = parsed
        .week
        .games
        .into_iter()
        .find(|g| g.home.alias == alias || g.away.alias == alias)?;
    let is_home = game.home.alias == alias;
    let (us, them) = if is_home {
        (game.home, game.away)
    } else {
        (game.away, game.home)
    };
    Some(ResolvedGame {
        game_id: game.id,
        team_id: us.id,
        opponent_id: them.id,
        opponent_alias: them.alias,
        home_away: if is_home { HomeAway::Home } else { HomeAway::Away },
        scheduled: game
            .scheduled
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        status: game.status,
    })
}

/// Case-insensitive exact or contains match on roster names.
pub fn search_player_in_roster(player_name: &str, roster: &Value) -> Option<RosterMatch> {
    let needle = player_name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let players = roster.get("players")?.as_array()?;
    let hit = players.iter().find(|p| {
        let name = p.get("name").and_then(Value::as_str).unwrap_or("").to_lowercase();
        name == needle || name.contains(&needle)
    })?;
    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    Some(RosterMatch {
        player_id: text(hit, "id"),
        team_alias: text(roster, "alias"),
        position: text(hit, "position"),
        full_name: text(hit, "name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schedule() -> Value {
        json!({"week": {"sequence": 16, "games": [
            {"id": "g1", "status": "scheduled", "scheduled": "2025-12-21T21:25:00+00:00",
             "home": {"id": "dal-id", "alias": "DAL"}, "away": {"id": "lar-id", "alias": "LAR"}},
            {"id": "g2", "scheduled": "2025-12-21T18:00:00+00:00",
             "home": {"id": "bal-id", "alias": "BAL"}, "away": {"id": "ne-id", "alias": "NE"}}
        ]}})
    }

    #[test]
    fn resolves_away_team_against_home_opponent() {
        let game = find_game(&schedule(), "lar").expect("game for LAR");
        assert_eq!(game.game_id, "g1");
        assert_eq!(game.team_id, "lar-id");
        assert_eq!(game.opponent_alias, "DAL");
        assert_eq!(game.home_away, HomeAway::Away);
        assert!(game.scheduled.is_some());
    }

    #[test]
    fn missing_team_or_malformed_schedule_resolves_to_none() {
        assert!(find_game(&schedule(), "KC").is_none());
        assert!(find_game(&json!({"week": "bye"}), "KC").is_none());
    }

    #[test]
    fn roster_search_matches_partial_names() {
        let roster = json!({"alias": "BAL", "players": [
            {"id": "p1", "name": "Lamar Jackson", "position": "QB"},
            {"id": "p2", "name": "Derrick Henry", "position": "RB"}
        ]});
        let hit = search_player_in_roster("henry", &roster).expect("match");
        assert_eq!(hit.player_id, "p2");
        assert_eq!(hit.team_alias, "BAL");
        assert!(search_player_in_roster("", &roster).is_none());
    }
}
