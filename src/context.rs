use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Tank01,
    Sportradar,
    Unresolved,
}

/// The one game every packet in a request describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameContext {
    pub season: i32,
    pub week: u32,
    pub game_id: Option<String>,
    pub team: String,
    pub opponent: Option<String>,
    pub home_away: Option<HomeAway>,
    pub kickoff: Option<DateTime<Utc>>,
    pub previous_kickoff: Option<DateTime<Utc>>,
    pub data_freshness: DateTime<Utc>,
    pub source: ContextSource,
}

impl GameContext {
    pub fn unresolved(season: i32, week: u32, team: &str) -> Self {
        Self {
            season,
            week,
            game_id: None,
            team: team.to_string(),
            opponent: None,
            home_away: None,
            kickoff: None,
            previous_kickoff: None,
            data_freshness: Utc::now(),
            source: ContextSource::Unresolved,
        }
    }

    pub fn is_shared_fast_path(&self) -> bool {
        self.source == ContextSource::Tank01
    }

    /// Team whose stadium hosts the game; the player's own when unknown.
    pub fn host_team(&self) -> &str {
        match (self.home_away, self.opponent.as_deref()) {
            (Some(HomeAway::Away), Some(opponent)) => opponent,
            _ => &self.team,
        }
    }

    pub fn location_label(&self) -> String {
        match (self.home_away, self.opponent.as_deref()) {
            (Some(HomeAway::Home), Some(opp)) => format!("Home vs {opp}"),
            (Some(HomeAway::Away), Some(opp)) => format!("Away @ {opp}"),
            (_, Some(opp)) => format!("vs {opp}"),
            _ => "Unknown".to_string(),
        }
    }

    pub fn days_rest(&self) -> Option<i64> {
        let (kickoff, previous) = (self.kickoff?, self.previous_kickoff?);
        Some((kickoff.date_naive() - previous.date_naive()).num_days())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropType {
    PassYards,
    RushYards,
    RecYards,
    Touchdowns,
    Completions,
    Attempts,
    RushAttempts,
    Receptions,
}

impl PropType {
    pub fn from_label(label: &str) -> Option<Self> {
        let l = label.to_lowercase();
        let has = |needle: &str| l.contains(needle);
        if has("pass") && has("yard") {
            Some(PropType::PassYards)
        } else if has("rush") && has("yard") {
            Some(PropType::RushYards)
        } else if (has("rec") && has("yard")) || has("receiving") {
            Some(PropType::RecYards)
        } else if has("touchdown") || l.split_whitespace().any(|t| t == "td" || t == "tds") {
            Some(PropType::Touchdowns)
        } else if has("completion") {
            Some(PropType::Completions)
        } else if has("rush") && (has("attempt") || has("carr")) {
            Some(PropType::RushAttempts)
        } else if has("attempt") {
            Some(PropType::Attempts)
        } else if has("reception") || has("catches") {
            Some(PropType::Receptions)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PropType::PassYards => "Passing Yards",
            PropType::RushYards => "Rushing Yards",
            PropType::RecYards => "Receiving Yards",
            PropType::Touchdowns => "Touchdowns",
            PropType::Completions => "Completions",
            PropType::Attempts => "Pass Attempts",
            PropType::RushAttempts => "Rush Attempts",
            PropType::Receptions => "Receptions",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            PropType::PassYards => "pass_yards",
            PropType::RushYards => "rush_yards",
            PropType::RecYards => "rec_yards",
            PropType::Touchdowns => "touchdowns",
            PropType::Completions => "completions",
            PropType::Attempts => "attempts",
            PropType::RushAttempts => "rush_attempts",
            PropType::Receptions => "receptions",
        }
    }

    /// Yardage stat the trend is measured on.
    pub fn yardage_family(self) -> YardageFamily {
        match self {
            PropType::PassYards | PropType::Completions | PropType::Attempts => YardageFamily::Passing,
            PropType::RushYards | PropType::RushAttempts => YardageFamily::Rushing,
            PropType::RecYards | PropType::Receptions => YardageFamily::Receiving,
            PropType::Touchdowns => YardageFamily::Scrimmage,
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YardageFamily {
    Passing,
    Rushing,
    Receiving,
    Scrimmage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropLine {
    pub value: f64,
    #[serde(rename = "type")]
    pub prop_type: PropType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropSide {
    Over,
    Under,
}

/// What the user is asking about; logged verbatim to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetContext {
    pub player_name: String,
    pub prop_type: String,
    #[serde(default)]
    pub prop_line: Option<f64>,
    #[serde(default)]
    pub prop_side: Option<PropSide>,
}

impl BetContext {
    pub fn from_query(player: &str, prop: &str, line: Option<f64>) -> Self {
        let lower = prop.to_lowercase();
        let side = if lower.contains("under") {
            Some(PropSide::Under)
        } else if lower.contains("over") {
            Some(PropSide::Over)
        } else {
            None
        };
        let prop_type = PropType::from_label(prop)
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| prop.trim().to_string());
        Self {
            player_name: player.trim().to_string(),
            prop_type,
            prop_line: line.or_else(|| parse_line(prop)),
            prop_side: side,
        }
    }

    pub fn prop_line(&self) -> Option<PropLine> {
        let prop_type = PropType::from_label(&self.prop_type)?;
        Some(PropLine {
            value: self.prop_line?,
            prop_type,
        })
    }
}

/// First numeric token in a free-form prop ("Over 250.5 Pass Yards").
pub fn parse_line(prop: &str) -> Option<f64> {
    prop.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|tok| !tok.is_empty() && *tok != ".")
        .find_map(|tok| tok.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Player -> team lookup with an ordered fallback chain:
/// explicit override, static table, provider-reported team, default.
pub struct TeamResolver<'a> {
    player_teams: &'a HashMap<String, String>,
    default_team: &'a str,
}

impl<'a> TeamResolver<'a> {
    pub fn new(player_teams: &'a HashMap<String, String>, default_team: &'a str) -> Self {
        Self {
            player_teams,
            default_team,
        }
    }

    /// `provider_team` is only invoked when the earlier steps come up empty.
    pub fn resolve<F>(&self, team_override: Option<&str>, player: &str, provider_team: F) -> String
    where
        F: Fn() -> Option<String>,
    {
        let from_override = || team_override.map(str::to_string);
        let from_table = || self.player_teams.get(&player.trim().to_lowercase()).cloned();
        let from_default = || Some(self.default_team.to_string());
        let chain: [&dyn Fn() -> Option<String>; 4] =
            [&from_override, &from_table, &provider_team, &from_default];
        chain
            .iter()
            .find_map(|step| step().map(|t| t.trim().to_ascii_uppercase()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| self.default_team.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn prop_labels_map_to_types() {
        assert_eq!(PropType::from_label("Over 250.5 Pass Yards"), Some(PropType::PassYards));
        assert_eq!(PropType::from_label("Rushing Yards"), Some(PropType::RushYards));
        assert_eq!(PropType::from_label("receiving"), Some(PropType::RecYards));
        assert_eq!(PropType::from_label("Anytime TD"), Some(PropType::Touchdowns));
        assert_eq!(PropType::from_label("Receptions 5.5"), Some(PropType::Receptions));
        assert_eq!(PropType::from_label("longest punt"), None);
    }

    #[test]
    fn rush_attempts_are_not_pass_attempts() {
        assert_eq!(PropType::from_label("Rush Attempts"), Some(PropType::RushAttempts));
        assert_eq!(PropType::from_label("Over 17.5 rushing attempts"), Some(PropType::RushAttempts));
        assert_eq!(PropType::from_label("Pass Attempts"), Some(PropType::Attempts));
        assert_eq!(PropType::RushAttempts.yardage_family(), YardageFamily::Rushing);
    }

    #[test]
    fn bet_context_reads_side_and_line_from_prop_text() {
        let bet = BetContext::from_query("Kyren Williams", "Under 85.5 Rushing Yards", None);
        assert_eq!(bet.prop_side, Some(PropSide::Under));
        assert_eq!(bet.prop_line, Some(85.5));
        assert_eq!(bet.prop_line().map(|p| p.prop_type), Some(PropType::RushYards));
    }

    #[test]
    fn resolver_prefers_override_then_table_and_skips_provider() {
        let table = HashMap::from([("lamar jackson".to_string(), "BAL".to_string())]);
        let resolver = TeamResolver::new(&table, "BAL");
        let calls = Cell::new(0);
        let provider = || {
            calls.set(calls.get() + 1);
            Some("KC".to_string())
        };
        assert_eq!(resolver.resolve(Some("dal"), "Lamar Jackson", provider), "DAL");
        assert_eq!(resolver.resolve(None, " Lamar Jackson ", provider), "BAL");
        assert_eq!(calls.get(), 0);
        assert_eq!(resolver.resolve(None, "Puka Nacua", provider), "KC");
        assert_eq!(calls.get(), 1);
        assert_eq!(resolver.resolve(None, "Nobody", || None), "BAL");
    }

    #[test]
    fn away_games_are_hosted_by_the_opponent() {
        let mut ctx = GameContext::unresolved(2025, 16, "LAR");
        assert_eq!(ctx.host_team(), "LAR");
        ctx.opponent = Some("DAL".to_string());
        ctx.home_away = Some(HomeAway::Away);
        assert_eq!(ctx.host_team(), "DAL");
        assert_eq!(ctx.location_label(), "Away @ DAL");
    }
}
