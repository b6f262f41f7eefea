use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use serde_json::Value;

use propdesk::config::EvidenceThresholds;
use propdesk::context::{GameContext, PropType};
use propdesk::insider::team_injuries;
use propdesk::scout::{ScoutRequest, SeasonSources, build_packet, player_analysis};
use propdesk::stress_test::{Lexicon, Script, score_script};
use propdesk::tank01::{parse_game_logs, parse_player_info};

fn json(raw: &str) -> Value {
    serde_json::from_str(raw).expect("valid fixture json")
}

fn bench_game_log_parse(c: &mut Criterion) {
    let payload = json(GAMES_JSON);
    c.bench_function("tank01_game_logs_parse", |b| {
        b.iter(|| {
            let logs = parse_game_logs(black_box(&payload));
            black_box(logs.len());
        })
    });
}

fn bench_player_analysis(c: &mut Criterion) {
    let player = parse_player_info(&json(PLAYER_JSON)).expect("player fixture");
    let logs = parse_game_logs(&json(GAMES_JSON));
    let thresholds = EvidenceThresholds::default();
    c.bench_function("scout_player_analysis", |b| {
        b.iter(|| {
            let analysis = player_analysis(&player, black_box(&logs), PropType::RushYards, &thresholds);
            black_box(analysis.map(|a| a.games_analyzed));
        })
    });
}

fn bench_scout_packet_build(c: &mut Criterion) {
    let ctx = GameContext::unresolved(2025, 11, "BAL");
    let sources = SeasonSources {
        team_stats: Some(json(BAL_STATS_JSON)),
        opponent_stats: Some(json(CIN_STATS_JSON)),
        roster: Some(json(ROSTER_JSON)),
        profile: Some(json(PROFILE_JSON)),
        target_id: Some("sr-henry".to_string()),
    };
    let thresholds = EvidenceThresholds::default();
    let request = ScoutRequest {
        context: &ctx,
        player_name: Some("Derrick Henry"),
        prop_line: None,
        tank01_player: None,
        logs: &[],
    };
    c.bench_function("scout_packet_build", |b| {
        b.iter(|| {
            let packet = build_packet(&ctx, &request, black_box(&sources), None, &thresholds);
            black_box(packet.missing_data.len());
        })
    });
}

fn bench_injury_report_split(c: &mut Criterion) {
    let report = json(INJURIES_JSON);
    c.bench_function("injury_report_split", |b| {
        b.iter(|| {
            let entries = team_injuries(black_box(&report), "BAL");
            black_box(entries.len());
        })
    });
}

fn bench_script_scoring(c: &mut Criterion) {
    let lexicon = Lexicon::default();
    let script = Script {
        defense: "Henry is clearly the engine here. Cincinnati bleeds yards on the ground and \
                  we expect twenty carries, maybe more if the weather turns."
            .repeat(4),
        skeptic_questions: vec![
            "What if the ankle limits his snaps?".to_string(),
            "Does a negative game script kill the volume?".to_string(),
        ],
        rebuttal: "The ankle held up in practice and Baltimore runs to close games. Lock it in."
            .to_string(),
    };
    c.bench_function("stress_script_scoring", |b| {
        b.iter(|| {
            let (post, breakdown) = score_script(&lexicon, 72.0, black_box(&script));
            black_box((post, breakdown.total_delta));
        })
    });
}

criterion_group!(
    benches,
    bench_game_log_parse,
    bench_player_analysis,
    bench_scout_packet_build,
    bench_injury_report_split,
    bench_script_scoring
);
criterion_main!(benches);

static PLAYER_JSON: &str = include_str!("../tests/fixtures/tank01_player_info.json");
static GAMES_JSON: &str = include_str!("../tests/fixtures/tank01_games_for_player.json");
static BAL_STATS_JSON: &str = include_str!("../tests/fixtures/sportradar_team_stats_bal.json");
static CIN_STATS_JSON: &str = include_str!("../tests/fixtures/sportradar_team_stats_cin.json");
static ROSTER_JSON: &str = include_str!("../tests/fixtures/sportradar_roster_bal.json");
static PROFILE_JSON: &str = include_str!("../tests/fixtures/sportradar_profile_henry.json");
static INJURIES_JSON: &str = include_str!("../tests/fixtures/sportradar_injuries.json");
