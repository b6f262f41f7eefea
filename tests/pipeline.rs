mod common;

use std::sync::Arc;

use serde_json::json;

use propdesk::context::{BetContext, ContextSource, HomeAway, PropType};
use propdesk::insider::InjuryStatus;
use propdesk::ledger::Ledger;
use propdesk::pipeline::{AgentRole, AnalyzeRequest, Pipeline, Services};

use common::{CannedModel, FakeTransport, date, ravens_transport, test_config};

const SCOUT_REPLY: &str = r#"{"verdict": "OVER", "confidence": 7,
  "analysis": "Henry has cleared this number in the games where he saw 18+ carries.",
  "key_factors": ["Cincinnati allows 5.2 yards per carry", "Workload steady at 17 touches"]}"#;

const WEATHER_REPLY: &str = r#"{"user_weather_writeup": ["Showers and a 15-20 mph wind.", "Lean on the run game."],
  "impact_scores": {"passing_penalty": 0.4, "rushing_boost": 0.3, "kicking_penalty": 0.5,
    "ball_security_risk": 0.3, "visibility_risk": 0.1, "pace_slowdown_risk": 0.2},
  "overall_confidence": "Medium", "confidence_drivers": ["Forecast is three days out"],
  "data_quality": {"forecast_age": "3 days", "missing_fields": [], "assumptions": ["Gusts not modeled"]}}"#;

const MASTER_REPLY: &str = r#"```json
{"analysis": {"projection": "Above Line", "confidence_score": 72},
 "analysis_summary": ["Volume is stable.", "Matchup favors the run."],
 "data_sources": {"historical_data": "supports_above", "availability_data": "limiting", "environmental_data": "favorable"},
 "key_factors": ["Run defense allows 5.2 YPC", "Questionable tag caps the ceiling"],
 "data_limitations": ["Forecast may change"],
 "confidence_explanation": "Strong matchup tempered by the ankle."}
```"#;

fn services(transport: Arc<FakeTransport>, model: Arc<CannedModel>, dir: &std::path::Path) -> Services {
    let config = test_config(dir, Some("tank01-key"), Some("sr-key"));
    Services::with_backends(config, transport, model, None)
}

fn henry_over() -> BetContext {
    BetContext::from_query("Derrick Henry", "Over 82.5 Rushing Yards", None)
}

fn request(agent: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        player: "Derrick Henry".to_string(),
        prop: "Over 82.5 Rushing Yards".to_string(),
        agent: agent.to_string(),
        ..AnalyzeRequest::default()
    }
}

#[test]
fn every_packet_describes_the_same_game() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(ravens_transport());
    let model = Arc::new(CannedModel::new().scout(SCOUT_REPLY));
    let services = services(transport.clone(), model, dir.path());

    let evidence = Pipeline::new(&services)
        .on(date("2025-11-06"))
        .gather(&henry_over(), None);

    let ctx = &evidence.context;
    assert_eq!(ctx.source, ContextSource::Tank01);
    assert_eq!(ctx.team, "BAL");
    assert_eq!(ctx.opponent.as_deref(), Some("CIN"));
    assert_eq!(ctx.home_away, Some(HomeAway::Home));
    assert_eq!(ctx.game_id.as_deref(), Some("20251109_CIN@BAL"));
    assert_eq!((ctx.season, ctx.week), (2025, 11));

    let scout = evidence.scout.as_ref().expect("scout packet");
    let insider = evidence.insider.as_ref().expect("insider packet");
    let weather = evidence.meteorologist.as_ref().expect("meteorologist report");
    assert_eq!(scout.meta.opponent, ctx.opponent);
    assert_eq!(scout.meta.kickoff, ctx.kickoff);
    assert_eq!(insider.game_context.opponent, ctx.opponent);
    assert_eq!(insider.game_context.kickoff_time, ctx.kickoff);
    assert_eq!(weather.game.opponent, "CIN");
    assert_eq!(weather.game.location, "Home vs CIN");

    // Shared context plus player logs means the scout never asks Sportradar.
    assert_eq!(transport.calls_matching("statistics.json"), 0);
    assert_eq!(transport.calls_matching("full_roster.json"), 0);
    // The team schedule is fetched once even though three builders ran.
    assert_eq!(transport.calls_matching("getNFLTeamSchedule"), 1);
}

#[test]
fn scout_analysis_comes_from_player_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = Arc::new(CannedModel::new().scout(SCOUT_REPLY));
    let services = services(Arc::new(ravens_transport()), model, dir.path());

    let evidence = Pipeline::new(&services)
        .on(date("2025-11-06"))
        .gather(&henry_over(), None);
    let analysis = evidence
        .scout
        .as_ref()
        .and_then(|p| p.player_analysis.as_ref())
        .expect("player analysis");

    assert_eq!(analysis.prop_type, PropType::RushYards);
    assert_eq!(analysis.games_analyzed, 7);
    assert_eq!(analysis.prop_values[0], 119.0);
    assert_eq!(analysis.prop_average(), Some(93.3));
    assert_eq!(analysis.volume.floor, Some(33.0));
    assert_eq!(analysis.volume.ceiling, Some(169.0));
    assert_eq!(evidence.scout_judgment.as_ref().map(|j| j.confidence), Some(7.0));
}

#[test]
fn insider_reads_injuries_depth_and_rest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let services = services(Arc::new(ravens_transport()), Arc::new(CannedModel::new()), dir.path());

    let evidence = Pipeline::new(&services)
        .on(date("2025-11-06"))
        .gather(&henry_over(), None);
    let insider = evidence.insider.as_ref().expect("insider packet");

    assert_eq!(insider.player_availability.injury_status, InjuryStatus::Questionable);
    assert!(insider.player_availability.game_time_decision_flag);
    assert_eq!(insider.volatility.snap_volatility_score, 0.9);
    assert_eq!(insider.depth_chart.depth_chart_position, 1);
    assert_eq!(insider.depth_chart.direct_backup_name.as_deref(), Some("Justice Hill"));
    assert_eq!(insider.offensive_line.ol_injuries, vec!["Andrew Vorhees".to_string()]);
    assert_eq!(insider.offensive_line.ol_replacements, vec!["Ben Cleveland".to_string()]);
    assert_eq!(insider.offensive_line.ol_continuity_score, 0.85);
    assert_eq!(insider.defensive_line.cb1_status, "Out (DJ Turner II)");
    assert_eq!(insider.game_context.days_rest, Some(10));
    assert!(!insider.game_context.short_week_flag);
    // The model failed, so the raw packet is what flows downstream.
    assert!(evidence.insider_judgment.is_none());
    assert!(evidence.insider_value().expect("value").get("player_availability").is_some());
}

#[test]
fn outdoor_forecast_covers_kickoff() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = Arc::new(CannedModel::new().schema("weather_impact_analysis", WEATHER_REPLY));
    let services = services(Arc::new(ravens_transport()), model, dir.path());

    let report = Pipeline::new(&services)
        .on(date("2025-11-06"))
        .analyze(&request("meteorologist"), AgentRole::Meteorologist)
        .expect("report");

    assert_eq!(report.title, "Atmospheric Factors");
    assert_eq!(report.confidence, 65);
    assert!(report.data_points.contains(&"Stadium: M&T Bank Stadium".to_string()));
    assert!(report.data_points.contains(&"Weather: Chance Rain Showers, 48°F".to_string()));
    assert_eq!(report.content, "Showers and a 15-20 mph wind. Lean on the run game.");
}

#[test]
fn per_agent_confidence_mappings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = Arc::new(CannedModel::new().scout(SCOUT_REPLY));
    let services = services(Arc::new(ravens_transport()), model, dir.path());
    let pipeline = Pipeline::new(&services).on(date("2025-11-06"));

    let scout = pipeline.analyze(&request("scout"), AgentRole::Scout).expect("scout");
    assert_eq!(scout.title, "Statistical Deep Dive");
    assert_eq!(scout.confidence, 70);
    assert_eq!(scout.data_points[0], "Verdict: OVER");

    // Game-time decision pins snap volatility at 0.9; no model adjustment.
    let insider = pipeline.analyze(&request("insider"), AgentRole::Insider).expect("insider");
    assert_eq!(insider.title, "Touchdown Whisperer");
    assert_eq!(insider.confidence, 10);
    assert!(insider.data_points.contains(&"Status: questionable".to_string()));

    // No forecast judgment available.
    let weather = pipeline
        .analyze(&request("meteorologist"), AgentRole::Meteorologist)
        .expect("weather");
    assert_eq!(weather.confidence, 50);
}

#[test]
fn bookie_synthesizes_and_records_to_ledger() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = Arc::new(
        CannedModel::new()
            .scout(SCOUT_REPLY)
            .schema("weather_impact_analysis", WEATHER_REPLY)
            .schema("master_analysis", MASTER_REPLY),
    );
    let services = services(Arc::new(ravens_transport()), model.clone(), dir.path());

    let report = Pipeline::new(&services)
        .on(date("2025-11-06"))
        .analyze(&request("bookie"), AgentRole::Bookie)
        .expect("report");

    assert_eq!(report.title, "The Final Verdict");
    assert_eq!(report.confidence, 72);
    assert_eq!(report.data_points[0], "Projection: Above Line");
    assert_eq!(report.content, "Volume is stable. Matchup favors the run.");

    let master_prompt = model
        .requests
        .lock()
        .expect("requests lock")
        .iter()
        .find(|r| r.model == "master-model")
        .map(|r| r.user.clone())
        .expect("master request");
    assert!(master_prompt.contains("\"edge_signals\""));
    assert!(master_prompt.contains("3/7 (43%)"));

    let entries = Ledger::new(dir.path().join("ledger.jsonl")).read_all().expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].bet.player_name, "Derrick Henry");
    assert_eq!(entries[0].analysis.confidence_score, 0.72);
}

#[test]
fn bookie_with_supplied_context_skips_providers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(ravens_transport());
    let model = Arc::new(CannedModel::new().schema("master_analysis", MASTER_REPLY));
    let services = services(transport.clone(), model, dir.path());

    let mut req = request("bookie");
    req.context = Some(json!({
        "scout": {"player_analysis": {"prop_type": "rush_yards", "prop_values": [119.0, 71.0, 33.0]}},
        "insider": {"insider_brief": ["Limited Thursday, trending up."]},
        "meteorologist": null
    }));
    let report = Pipeline::new(&services)
        .on(date("2025-11-06"))
        .analyze(&req, AgentRole::Bookie)
        .expect("report");

    assert_eq!(report.confidence, 72);
    assert!(transport.calls.lock().expect("calls lock").is_empty());
}

#[test]
fn unresolved_game_degrades_instead_of_failing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(FakeTransport::new());
    let config = test_config(dir.path(), None, None);
    let services = Services::with_backends(config, transport.clone(), Arc::new(CannedModel::new()), None);
    let pipeline = Pipeline::new(&services).on(date("2025-11-06"));

    let insider = pipeline.analyze(&request("insider"), AgentRole::Insider).expect("insider");
    assert_eq!(insider.confidence, 0);
    assert_eq!(insider.data_points, vec!["No Data".to_string()]);

    let scout = pipeline.analyze(&request("scout"), AgentRole::Scout).expect("scout");
    assert_eq!(scout.confidence, 0);
    assert_eq!(scout.data_points[0], "Verdict: PASS");
    assert!(scout.data_points.contains(&"System Error".to_string()));

    // Unconfigured providers are never contacted.
    assert!(transport.calls.lock().expect("calls lock").is_empty());
}

#[test]
fn empty_player_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let services = services(Arc::new(ravens_transport()), Arc::new(CannedModel::new()), dir.path());
    let mut req = request("scout");
    req.player = "  ".to_string();
    assert!(Pipeline::new(&services).analyze(&req, AgentRole::Scout).is_err());
}
