mod common;

use chrono::{TimeZone, Utc};
use serde_json::json;

use propdesk::context::{ContextSource, HomeAway};
use propdesk::insider::{InjuryStatus, PracticeCode, depth_groups, team_injuries};
use propdesk::sportradar::{find_game, search_player_in_roster};
use propdesk::tank01::{
    context_from_schedule, parse_game_logs, parse_player_info, parse_team_schedule,
};
use propdesk::weather::{parse_forecast_periods, parse_grid_point, select_period};

use common::{date, fixture_json};

#[test]
fn parses_tank01_player_info_fixture() {
    let player = parse_player_info(&fixture_json("tank01_player_info.json")).expect("player");
    assert_eq!(player.player_id, "3043078");
    assert_eq!(player.long_name, "Derrick Henry");
    assert_eq!(player.team, "BAL");
    assert_eq!(player.position.as_deref(), Some("RB"));
}

#[test]
fn game_logs_are_newest_first_with_opponents() {
    let logs = parse_game_logs(&fixture_json("tank01_games_for_player.json"));
    assert_eq!(logs.len(), 7);
    assert_eq!(logs[0].game_id, "20251030_BAL@MIA");
    assert_eq!(logs[0].game_date, Some(date("2025-10-30")));
    assert_eq!(logs[0].opponent.as_deref(), Some("MIA"));
    assert_eq!(logs[0].rush_yards, 119.0);
    assert_eq!(logs[0].carries, 21.0);
    assert_eq!(logs[1].opponent.as_deref(), Some("LAR"));
    assert_eq!(logs[6].game_id, "20250907_BAL@BUF");
    assert!(logs.windows(2).all(|w| w[0].game_date >= w[1].game_date));
}

#[test]
fn team_schedule_fills_missing_epoch_with_default_kickoff() {
    let games = parse_team_schedule(&fixture_json("tank01_team_schedule_bal.json"));
    assert_eq!(games.len(), 3);
    assert_eq!(games[1].kickoff, Utc.with_ymd_and_hms(2025, 11, 9, 18, 0, 0).unwrap());
    assert_eq!(games[2].home, "CLE");
    assert_eq!(games[2].kickoff, Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap());
}

#[test]
fn schedule_context_picks_next_game_and_rest() {
    let games = parse_team_schedule(&fixture_json("tank01_team_schedule_bal.json"));
    let ctx = context_from_schedule(&games, "bal", 2025, 11, date("2025-11-06")).expect("context");
    assert_eq!(ctx.source, ContextSource::Tank01);
    assert_eq!(ctx.game_id.as_deref(), Some("20251109_CIN@BAL"));
    assert_eq!(ctx.opponent.as_deref(), Some("CIN"));
    assert_eq!(ctx.home_away, Some(HomeAway::Home));
    assert_eq!(ctx.days_rest(), Some(10));

    let road = context_from_schedule(&games, "BAL", 2025, 12, date("2025-11-10")).expect("context");
    assert_eq!(road.opponent.as_deref(), Some("CLE"));
    assert_eq!(road.home_away, Some(HomeAway::Away));
    assert_eq!(road.host_team(), "CLE");

    assert!(context_from_schedule(&games, "BAL", 2025, 13, date("2025-11-20")).is_none());
}

#[test]
fn forecast_period_covering_kickoff_is_selected() {
    let grid = parse_grid_point(&fixture_json("nws_points_baltimore.json")).expect("grid");
    assert_eq!((grid.office.as_str(), grid.x, grid.y), ("LWX", 109, 86));

    let periods = parse_forecast_periods(&fixture_json("nws_forecast_lwx.json"));
    assert_eq!(periods.len(), 2);

    let kickoff = Utc.with_ymd_and_hms(2025, 11, 9, 18, 0, 0).unwrap();
    let period = select_period(&periods, kickoff).expect("period");
    assert_eq!(period.name, "Sunday");
    assert_eq!(period.summary(), "Chance Rain Showers, 48°F");

    let night = Utc.with_ymd_and_hms(2025, 11, 10, 1, 15, 0).unwrap();
    assert_eq!(select_period(&periods, night).expect("period").name, "Sunday Night");

    // Outside every window: nearest boundary wins.
    let later = Utc.with_ymd_and_hms(2025, 11, 12, 0, 0, 0).unwrap();
    assert_eq!(select_period(&periods, later).expect("period").name, "Sunday Night");
    assert!(select_period(&[], kickoff).is_none());
}

#[test]
fn malformed_forecast_periods_are_skipped() {
    let body = json!({"properties": {"periods": [
        {"name": "Broken", "startTime": "not a time"},
        {"name": "Tonight", "startTime": "2025-11-09T18:00:00-05:00", "endTime": "2025-11-10T06:00:00-05:00"}
    ]}});
    let periods = parse_forecast_periods(&body);
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].summary(), "Unknown");
}

#[test]
fn weekly_schedule_resolves_home_game() {
    let game = find_game(&fixture_json("sportradar_weekly_schedule.json"), "BAL").expect("game");
    assert_eq!(game.game_id, "g-cin-bal");
    assert_eq!(game.team_id, "bal-id");
    assert_eq!(game.opponent_id, "cin-id");
    assert_eq!(game.opponent_alias, "CIN");
    assert_eq!(game.home_away, HomeAway::Home);
    assert_eq!(game.scheduled, Some(Utc.with_ymd_and_hms(2025, 11, 9, 18, 0, 0).unwrap()));
}

#[test]
fn roster_search_finds_target() {
    let roster = fixture_json("sportradar_roster_bal.json");
    let hit = search_player_in_roster("DERRICK HENRY", &roster).expect("match");
    assert_eq!(hit.player_id, "sr-henry");
    assert_eq!(hit.position, "RB");
    assert!(search_player_in_roster("Joe Burrow", &roster).is_none());
}

#[test]
fn weekly_injury_report_is_split_by_team() {
    let report = fixture_json("sportradar_injuries.json");
    let ravens = team_injuries(&report, "bal");
    assert_eq!(ravens.len(), 2);

    let henry = &ravens[0];
    assert_eq!(henry.status, InjuryStatus::Questionable);
    assert_eq!(henry.body_part.as_deref(), Some("Ankle"));
    let codes: Vec<PracticeCode> = henry.practice.iter().map(|(_, code)| *code).collect();
    assert_eq!(codes, [PracticeCode::Dnp, PracticeCode::Lp]);

    assert_eq!(ravens[1].status, InjuryStatus::Out);
    assert_eq!(ravens[1].position, "G");

    let bengals = team_injuries(&report, "CIN");
    assert_eq!(bengals.len(), 1);
    assert_eq!(bengals[0].name, "DJ Turner II");
    assert!(team_injuries(&report, "KC").is_empty());
}

#[test]
fn depth_chart_groups_are_ordered_by_depth() {
    let groups = depth_groups(&fixture_json("sportradar_depth_chart_bal.json"));
    let rb = groups.iter().find(|g| g.position == "RB").expect("rb group");
    let names: Vec<&str> = rb.players.iter().map(|(_, name)| name.as_str()).collect();
    assert_eq!(names, ["Derrick Henry", "Justice Hill", "Keaton Mitchell"]);

    let lg = groups.iter().find(|g| g.position == "LG").expect("lg group");
    assert_eq!(lg.players[1].1, "Ben Cleveland");
    assert_eq!(groups.len(), 6);
}
