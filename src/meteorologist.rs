use serde::Serialize;
use tracing::{info, warn};

use crate::agents::WeatherImpact;
use crate::context::GameContext;
use crate::stadiums::{FieldSurface, RoofType, stadium_for};
use crate::weather::WeatherService;

pub const DOME_SUMMARY: &str = "Indoors (Controlled)";
const DOME_DETAILS: &str = "Climate controlled dome/retractable roof closed.";
const UNAVAILABLE_SUMMARY: &str = "Forecast Unavailable";
const UNAVAILABLE_DETAILS: &str = "NWS API could not resolve forecast for this location/time.";
const UNKNOWN_STADIUM_SUMMARY: &str = "Data Unavailable";
const UNKNOWN_STADIUM_DETAILS: &str = "Stadium not found in database.";

#[derive(Debug, Clone, Serialize)]
pub struct ReportPlayer {
    pub name: String,
    pub team: String,
    pub position: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportGame {
    pub opponent: String,
    pub location: String,
    pub stadium: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    #[serde(rename = "type")]
    pub roof: RoofType,
    pub field: FieldSurface,
    pub weather_summary: String,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeteorologistReport {
    pub player: ReportPlayer,
    pub game: ReportGame,
    pub environment: Environment,
    pub analysis: Option<WeatherImpact>,
}

impl MeteorologistReport {
    /// One-line game description handed to the weather-impact agent.
    pub fn game_line(&self) -> String {
        format!(
            "Player: {} ({}, {}). Game: {} vs {}. Stadium: {} ({}).",
            self.player.name,
            self.player.position,
            self.player.team,
            self.game.location,
            self.game.opponent,
            self.game.stadium,
            self.game.city
        )
    }

    pub fn forecast_resolved(&self) -> bool {
        !matches!(
            self.environment.weather_summary.as_str(),
            UNAVAILABLE_SUMMARY | UNKNOWN_STADIUM_SUMMARY
        )
    }
}

/// Environment report for the game in `ctx`. Domes never touch the
/// forecast provider. `None` when the context has no opponent.
pub fn build_report(
    ctx: &GameContext,
    player: ReportPlayer,
    weather: &WeatherService,
) -> Option<MeteorologistReport> {
    let opponent = ctx.opponent.clone()?;
    let location = ctx.location_label();
    let host = ctx.host_team();

    let Some(stadium) = stadium_for(host).or_else(|| stadium_for(&ctx.team)) else {
        warn!(team = host, "no stadium on record");
        return Some(MeteorologistReport {
            player,
            game: ReportGame {
                opponent,
                location,
                stadium: "Unknown".to_string(),
                city: "Unknown".to_string(),
            },
            environment: Environment {
                roof: RoofType::Outdoor,
                field: FieldSurface::Grass,
                weather_summary: UNKNOWN_STADIUM_SUMMARY.to_string(),
                details: UNKNOWN_STADIUM_DETAILS.to_string(),
            },
            analysis: None,
        });
    };

    let (weather_summary, details) = if stadium.roof.is_dome() {
        (DOME_SUMMARY.to_string(), DOME_DETAILS.to_string())
    } else {
        let period = ctx.kickoff.and_then(|kickoff| {
            weather
                .forecast_at(stadium.lat, stadium.long, kickoff)
                .map_err(|err| warn!(error = %err, stadium = stadium.name, "forecast lookup failed"))
                .ok()
                .flatten()
        });
        match period {
            Some(p) => (p.summary(), p.details()),
            None => (UNAVAILABLE_SUMMARY.to_string(), UNAVAILABLE_DETAILS.to_string()),
        }
    };
    info!(stadium = stadium.name, roof = stadium.roof.label(), summary = %weather_summary, "meteorologist report");

    Some(MeteorologistReport {
        player,
        game: ReportGame {
            opponent,
            location,
            stadium: stadium.name.to_string(),
            city: stadium.city_label(),
        },
        environment: Environment {
            roof: stadium.roof,
            field: stadium.field,
            weather_summary,
            details,
        },
        analysis: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use crate::config::ProviderConfig;
    use crate::context::HomeAway;
    use crate::gateway::{RateLimitedClient, TtlCache};
    use crate::http_client::{RawResponse, Transport};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    impl Transport for CountingTransport {
        fn get(&self, _url: &str, _headers: &[(&str, &str)]) -> Result<RawResponse, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err("offline".to_string())
        }

        fn post_json(&self, _: &str, _: &[(&str, &str)], _: &Value) -> Result<RawResponse, String> {
            Err("offline".to_string())
        }
    }

    fn service(transport: Arc<CountingTransport>) -> WeatherService {
        let config = ProviderConfig {
            base_url: "https://weather.test".to_string(),
            api_key: None,
            min_delay: Duration::ZERO,
        };
        let client = Arc::new(RateLimitedClient::new("nws", transport, Duration::ZERO));
        WeatherService::new(client, Arc::new(TtlCache::new()), &config, "propdesk-test")
    }

    fn context(team: &str, opponent: &str, home_away: HomeAway) -> GameContext {
        let mut ctx = GameContext::unresolved(2025, 16, team);
        ctx.opponent = Some(opponent.to_string());
        ctx.home_away = Some(home_away);
        ctx.kickoff = Utc.with_ymd_and_hms(2025, 12, 21, 18, 0, 0).single();
        ctx
    }

    fn player(team: &str) -> ReportPlayer {
        ReportPlayer {
            name: "Test Player".to_string(),
            team: team.to_string(),
            position: "WR".to_string(),
        }
    }

    #[test]
    fn dome_games_never_call_the_forecast_provider() {
        let transport = Arc::new(CountingTransport::default());
        let weather = service(transport.clone());
        let report = build_report(&context("DET", "GB", HomeAway::Home), player("DET"), &weather)
            .expect("report");
        assert_eq!(report.environment.weather_summary, DOME_SUMMARY);
        assert_eq!(report.game.stadium, "Ford Field");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn away_game_uses_host_stadium_and_degrades_on_failure() {
        let transport = Arc::new(CountingTransport::default());
        let weather = service(transport.clone());
        let report = build_report(&context("DET", "GB", HomeAway::Away), player("DET"), &weather)
            .expect("report");
        assert_eq!(report.game.stadium, "Lambeau Field");
        assert_eq!(report.game.location, "Away @ GB");
        assert_eq!(report.environment.weather_summary, UNAVAILABLE_SUMMARY);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(!report.forecast_resolved());
    }

    #[test]
    fn no_opponent_means_no_report() {
        let weather = service(Arc::new(CountingTransport::default()));
        let ctx = GameContext::unresolved(2025, 16, "DET");
        assert!(build_report(&ctx, player("DET"), &weather).is_none());
    }
}
