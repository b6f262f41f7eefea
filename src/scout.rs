use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::EvidenceThresholds;
use crate::context::{ContextSource, GameContext, HomeAway, PropLine, PropType, YardageFamily};
use crate::error::FetchError;
use crate::normalize::{
    explosive_indicator, missing_paths, normalize_position, round1, safe_rate, safe_ratio, stat,
    str_at,
};
use crate::sportradar::{search_player_in_roster, Sportradar};
use crate::tank01::{GameLog, Tank01Player};

const TREND_THRESHOLD_YARDS: f64 = 20.0;
const RECENT_GAMES_SHOWN: usize = 5;
const TREND_WINDOW: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ScoutPacket {
    pub meta: PacketMeta,
    pub team_identity_tendencies: TeamIdentity,
    pub team_offense: TeamOffense,
    pub team_defense: TeamDefense,
    pub opponent_defense: TeamDefense,
    pub players: Vec<Player>,
    pub matchup_reality: MatchupReality,
    pub reliability: Reliability,
    pub player_analysis: Option<PlayerAnalysis>,
    pub missing_data: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PacketMeta {
    pub season: i32,
    pub week: u32,
    pub game_id: Option<String>,
    pub team: String,
    pub opponent: Option<String>,
    pub home_away: Option<HomeAway>,
    pub kickoff: Option<DateTime<Utc>>,
    pub data_freshness_timestamp: DateTime<Utc>,
    pub context_source: ContextSource,
    pub target_player: Option<String>,
    pub prop_line: Option<PropLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OffensiveIdentity {
    Run,
    Pass,
    Balanced,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamIdentity {
    pub offensive_identity: Option<OffensiveIdentity>,
    pub neutral_pass_rate: Option<f64>,
    pub pace_plays_per_game: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamOffense {
    pub yards_per_dropback: Option<f64>,
    pub explosive_pass_rate_20plus: Option<f64>,
    pub team_adot: Option<f64>,
    pub sack_rate_allowed: Option<f64>,
    pub yards_per_carry: Option<f64>,
    pub explosive_run_rate_10plus: Option<f64>,
    pub third_down_conv_rate: Option<f64>,
    pub red_zone_td_rate: Option<f64>,
    pub goal_to_go_td_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamDefense {
    pub yards_per_dropback_allowed: Option<f64>,
    pub explosive_pass_rate_20plus_allowed: Option<f64>,
    pub team_adot_allowed: Option<f64>,
    pub sack_rate: Option<f64>,
    pub yards_per_carry_allowed: Option<f64>,
    pub explosive_run_rate_10plus_allowed: Option<f64>,
    pub third_down_conv_rate_allowed: Option<f64>,
    pub red_zone_td_rate_allowed: Option<f64>,
    pub goal_to_go_td_rate_allowed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: String,
    pub team: String,
    pub availability: PlayerAvailability,
    pub usage: PlayerUsage,
    pub efficiency: PlayerEfficiency,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerAvailability {
    pub injury_status: Option<String>,
    pub practice_participation_trend: Option<String>,
    pub returning_from_injury_flag: bool,
    pub snap_expectation_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerUsage {
    pub dropbacks_per_game: Option<f64>,
    pub carry_share: Option<f64>,
    pub target_share: Option<f64>,
    pub air_yards_share: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerEfficiency {
    pub int_rate: Option<f64>,
    pub sack_avoidance_rate: Option<f64>,
    pub catch_rate: Option<f64>,
    pub yards_per_target: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchupReality {
    pub pass_funnel_flag: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Reliability {
    pub sample_sizes: SampleSizes,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleSizes {
    pub games: Option<f64>,
    pub pass_attempts: Option<f64>,
    pub rush_attempts: Option<f64>,
    pub player_games_logged: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatLine {
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

impl StatLine {
    fn add(&mut self, log: &GameLog) {
        self.pass_attempts += log.pass_attempts;
        self.completions += log.completions;
        self.pass_yards += log.pass_yards;
        self.pass_tds += log.pass_tds;
        self.interceptions += log.interceptions;
        self.carries += log.carries;
        self.rush_yards += log.rush_yards;
        self.rush_tds += log.rush_tds;
        self.targets += log.targets;
        self.receptions += log.receptions;
        self.rec_yards += log.rec_yards;
        self.rec_tds += log.rec_tds;
    }

    fn per_game(&self, games: f64) -> StatLine {
        let avg = |v: f64| if games > 0.0 { round1(v / games) } else { 0.0 };
        StatLine {
            pass_attempts: avg(self.pass_attempts),
            completions: avg(self.completions),
            pass_yards: avg(self.pass_yards),
            pass_tds: avg(self.pass_tds),
            interceptions: avg(self.interceptions),
            carries: avg(self.carries),
            rush_yards: avg(self.rush_yards),
            rush_tds: avg(self.rush_tds),
            targets: avg(self.targets),
            receptions: avg(self.receptions),
            rec_yards: avg(self.rec_yards),
            rec_tds: avg(self.rec_tds),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentGame {
    pub game_id: String,
    pub game_date: Option<NaiveDate>,
    pub opponent: Option<String>,
    pub pass_yards: f64,
    pub rush_yards: f64,
    pub rec_yards: f64,
    pub receptions: f64,
    pub touches: f64,
    pub prop_value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EfficiencyRatios {
    pub yards_per_attempt: Option<f64>,
    pub completion_pct: Option<f64>,
    pub yards_per_carry: Option<f64>,
    pub catch_rate: Option<f64>,
    pub yards_per_reception: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VolumeRange {
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    TrendingUp,
    TrendingDown,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub last3_average: f64,
    pub season_average: f64,
    pub delta: f64,
    pub direction: TrendDirection,
}

/// Enriched view of the target player built from per-game logs.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerAnalysis {
    pub player_id: String,
    pub player_name: String,
    pub position: Option<String>,
    pub prop_type: PropType,
    pub games_analyzed: usize,
    pub recent_games: Vec<RecentGame>,
    pub season_totals: StatLine,
    pub per_game_averages: StatLine,
    pub efficiency: EfficiencyRatios,
    pub volume: VolumeRange,
    pub trend: Option<TrendAnalysis>,
    /// Prop stat per game, newest first.
    pub prop_values: Vec<f64>,
}

impl PlayerAnalysis {
    pub fn prop_average(&self) -> Option<f64> {
        if self.prop_values.is_empty() {
            return None;
        }
        let sum: f64 = self.prop_values.iter().sum();
        Some(round1(sum / self.prop_values.len() as f64))
    }
}

impl ScoutPacket {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.meta.team.trim().is_empty() {
            errors.push("missing meta.team".to_string());
        }
        if self.meta.week == 0 {
            errors.push("meta.week must be >= 1".to_string());
        }
        errors
    }
}

pub struct ScoutRequest<'a> {
    pub context: &'a GameContext,
    pub player_name: Option<&'a str>,
    pub prop_line: Option<PropLine>,
    pub tank01_player: Option<&'a Tank01Player>,
    pub logs: &'a [GameLog],
}

pub struct ScoutAssembler<'a> {
    sportradar: &'a Sportradar,
    thresholds: &'a EvidenceThresholds,
}

impl<'a> ScoutAssembler<'a> {
    pub fn new(sportradar: &'a Sportradar, thresholds: &'a EvidenceThresholds) -> Self {
        Self {
            sportradar,
            thresholds,
        }
    }

    pub fn assemble(&self, req: &ScoutRequest<'_>) -> ScoutPacket {
        let ctx = req.context;
        info!(
            team = %ctx.team,
            player = req.player_name.unwrap_or("-"),
            season = ctx.season,
            week = ctx.week,
            "assembling scout packet"
        );

        let sources = if ctx.is_shared_fast_path() && !req.logs.is_empty() {
            info!(team = %ctx.team, "shared context with player logs, skipping sportradar");
            SeasonSources::default()
        } else {
            self.fetch_sources(ctx, req.player_name)
        };

        let analysis = req.tank01_player.and_then(|player| {
            let prop_type = req
                .prop_line
                .map(|p| p.prop_type)
                .unwrap_or_else(|| default_prop_for(player.position.as_deref()));
            player_analysis(player, req.logs, prop_type, self.thresholds)
        });

        build_packet(ctx, req, &sources, analysis, self.thresholds)
    }

    fn fetch_sources(&self, ctx: &GameContext, player_name: Option<&str>) -> SeasonSources {
        let resolved = degrade(
            "game resolution",
            self.sportradar.resolve_game(ctx.season, ctx.week, &ctx.team),
        )
        .flatten();
        let Some(game) = resolved else {
            return SeasonSources::default();
        };

        // Sequential on purpose: every call shares the provider's single slot.
        let team_stats = present(degrade(
            "team stats",
            self.sportradar.team_season_stats(ctx.season, &game.team_id),
        ));
        let roster = present(degrade("roster", self.sportradar.team_roster(&game.team_id)));
        let target = player_name
            .zip(roster.as_ref())
            .and_then(|(name, roster)| search_player_in_roster(name, roster));
        let profile = target.as_ref().and_then(|hit| {
            info!(player = %hit.full_name, position = %hit.position, "found target player");
            present(degrade("player profile", self.sportradar.player_profile(&hit.player_id)))
        });
        let same_opponent = ctx
            .opponent
            .as_deref()
            .is_none_or(|opp| opp.eq_ignore_ascii_case(&game.opponent_alias));
        let opponent_stats = if same_opponent {
            present(degrade(
                "opponent stats",
                self.sportradar.team_season_stats(ctx.season, &game.opponent_id),
            ))
        } else {
            warn!(
                context = ctx.opponent.as_deref().unwrap_or("-"),
                schedule = %game.opponent_alias,
                "schedule opponent disagrees with game context, skipping opponent stats"
            );
            None
        };

        SeasonSources {
            team_stats,
            opponent_stats,
            roster,
            profile,
            target_id: target.map(|t| t.player_id),
        }
    }
}

#[derive(Debug, Default)]
pub struct SeasonSources {
    pub team_stats: Option<Value>,
    pub opponent_stats: Option<Value>,
    pub roster: Option<Value>,
    pub profile: Option<Value>,
    pub target_id: Option<String>,
}

fn degrade<T>(what: &str, result: Result<T, FetchError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, rate_limited = err.is_rate_limited(), "scout {what} unavailable");
            None
        }
    }
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

/// Pure assembly from already-fetched sources.
pub fn build_packet(
    ctx: &GameContext,
    req: &ScoutRequest<'_>,
    sources: &SeasonSources,
    player_analysis: Option<PlayerAnalysis>,
    thresholds: &EvidenceThresholds,
) -> ScoutPacket {
    let team_stats = sources.team_stats.as_ref();
    let own_offense = team_offense(team_stats);
    let own_defense = team_defense(team_stats);
    let opponent_defense = team_defense(sources.opponent_stats.as_ref());
    let matchup_reality = matchup_reality(&opponent_defense);

    let mut packet = ScoutPacket {
        meta: PacketMeta {
            season: ctx.season,
            week: ctx.week,
            game_id: ctx.game_id.clone(),
            team: ctx.team.clone(),
            opponent: ctx.opponent.clone(),
            home_away: ctx.home_away,
            kickoff: ctx.kickoff,
            data_freshness_timestamp: ctx.data_freshness,
            context_source: ctx.source,
            target_player: req.player_name.map(str::to_string),
            prop_line: req.prop_line,
        },
        team_identity_tendencies: identity(team_stats),
        team_offense: own_offense,
        team_defense: own_defense,
        opponent_defense,
        players: build_players(
            team_stats,
            sources.roster.as_ref(),
            sources.profile.as_ref(),
            sources.target_id.as_deref(),
            req.player_name,
            thresholds,
        ),
        matchup_reality,
        reliability: reliability(team_stats, player_analysis.as_ref()),
        player_analysis,
        missing_data: Vec::new(),
    };
    let mut missing = match serde_json::to_value(&packet) {
        Ok(value) => missing_paths(&value),
        Err(err) => vec![format!("packet serialization failed: {err}")],
    };
    missing.extend(packet.validate());
    packet.missing_data = missing;
    packet
}

pub fn identity(stats: Option<&Value>) -> TeamIdentity {
    let s = |path: &str| stats.and_then(|v| stat(v, path));
    let (Some(pass), Some(rush)) = (s("record.passing.attempts"), s("record.rushing.attempts")) else {
        return TeamIdentity::default();
    };
    let total = pass + rush;
    if total <= 0.0 {
        return TeamIdentity::default();
    }
    let pass_rate = pass / total;
    let offensive_identity = if pass_rate > 0.60 {
        OffensiveIdentity::Pass
    } else if pass_rate < 0.45 {
        OffensiveIdentity::Run
    } else {
        OffensiveIdentity::Balanced
    };
    TeamIdentity {
        offensive_identity: Some(offensive_identity),
        neutral_pass_rate: Some(round1(pass_rate * 100.0)),
        pace_plays_per_game: safe_ratio(Some(total), s("record.games_played")),
    }
}

struct UnitMetrics {
    per_dropback: Option<f64>,
    explosive_pass: Option<f64>,
    adot: Option<f64>,
    sack_rate: Option<f64>,
    per_carry: Option<f64>,
    explosive_run: Option<f64>,
    third_down: Option<f64>,
    red_zone: Option<f64>,
    goal_to_go: Option<f64>,
}

// `record` is what the team did, `opponents` what it allowed.
fn unit_metrics(stats: Option<&Value>, side: &str, sacks: Option<f64>) -> UnitMetrics {
    let s = |path: &str| stats.and_then(|v| stat(v, &format!("{side}.{path}")));
    let pass_att = s("passing.attempts");
    let pass_yds = s("passing.yards");
    UnitMetrics {
        per_dropback: safe_ratio(pass_yds, pass_att),
        explosive_pass: explosive_indicator(s("passing.longest"), 20.0),
        adot: safe_ratio(pass_yds, s("passing.completions")),
        sack_rate: safe_rate(sacks, pass_att),
        per_carry: safe_ratio(s("rushing.yards"), s("rushing.attempts")),
        explosive_run: explosive_indicator(s("rushing.longest"), 10.0),
        third_down: safe_rate(
            s("efficiency.thirddown.successes"),
            s("efficiency.thirddown.attempts"),
        ),
        red_zone: safe_rate(
            s("efficiency.redzone.successes"),
            s("efficiency.redzone.attempts"),
        ),
        goal_to_go: safe_rate(
            s("efficiency.goaltogo.successes"),
            s("efficiency.goaltogo.attempts"),
        ),
    }
}

pub fn team_offense(stats: Option<&Value>) -> TeamOffense {
    let sacks = stats.and_then(|v| stat(v, "record.passing.sacks"));
    let m = unit_metrics(stats, "record", sacks);
    TeamOffense {
        yards_per_dropback: m.per_dropback,
        explosive_pass_rate_20plus: m.explosive_pass,
        team_adot: m.adot,
        sack_rate_allowed: m.sack_rate,
        yards_per_carry: m.per_carry,
        explosive_run_rate_10plus: m.explosive_run,
        third_down_conv_rate: m.third_down,
        red_zone_td_rate: m.red_zone,
        goal_to_go_td_rate: m.goal_to_go,
    }
}

pub fn team_defense(stats: Option<&Value>) -> TeamDefense {
    let sacks = stats.and_then(|v| {
        stat(v, "record.defense.sacks").or_else(|| stat(v, "opponents.passing.sacks"))
    });
    let m = unit_metrics(stats, "opponents", sacks);
    TeamDefense {
        yards_per_dropback_allowed: m.per_dropback,
        explosive_pass_rate_20plus_allowed: m.explosive_pass,
        team_adot_allowed: m.adot,
        sack_rate: m.sack_rate,
        yards_per_carry_allowed: m.per_carry,
        explosive_run_rate_10plus_allowed: m.explosive_run,
        third_down_conv_rate_allowed: m.third_down,
        red_zone_td_rate_allowed: m.red_zone,
        goal_to_go_td_rate_allowed: m.goal_to_go,
    }
}

/// Three-valued: unknown unless both allowed rates are known.
pub fn matchup_reality(opponent: &TeamDefense) -> MatchupReality {
    let pass_funnel_flag = match (
        opponent.yards_per_dropback_allowed,
        opponent.yards_per_carry_allowed,
    ) {
        (Some(ypa), Some(ypc)) => Some(ypa > 7.5 && ypc < 3.8),
        _ => None,
    };
    MatchupReality { pass_funnel_flag }
}

fn reliability(stats: Option<&Value>, analysis: Option<&PlayerAnalysis>) -> Reliability {
    let s = |path: &str| stats.and_then(|v| stat(v, path));
    Reliability {
        sample_sizes: SampleSizes {
            games: s("record.games_played"),
            pass_attempts: s("record.passing.attempts"),
            rush_attempts: s("record.rushing.attempts"),
            player_games_logged: analysis.map(|a| a.games_analyzed),
        },
    }
}

pub fn build_players(
    stats: Option<&Value>,
    roster: Option<&Value>,
    profile: Option<&Value>,
    target_id: Option<&str>,
    target_name: Option<&str>,
    thresholds: &EvidenceThresholds,
) -> Vec<Player> {
    let team_alias = stats
        .and_then(|v| str_at(v, "alias"))
        .or_else(|| roster.and_then(|r| str_at(r, "alias")))
        .unwrap_or_default()
        .to_string();
    let roster_by_id: HashMap<&str, &Value> = roster
        .and_then(|r| r.get("players"))
        .and_then(Value::as_array)
        .map(|players| {
            players
                .iter()
                .filter_map(|p| Some((p.get("id")?.as_str()?, p)))
                .collect()
        })
        .unwrap_or_default();

    let raw_players = stats
        .and_then(|v| v.get("players"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut ranked: Vec<(f64, Player)> = raw_players
        .iter()
        .filter_map(|p| {
            let volume = |path: &str| stat(p, path).unwrap_or(0.0);
            let (att, carries, targets) = (
                volume("passing.attempts"),
                volume("rushing.attempts"),
                volume("receiving.targets"),
            );
            if att < thresholds.player_min_pass_attempts
                && carries < thresholds.player_min_carries
                && targets < thresholds.player_min_targets
            {
                return None;
            }
            let id = str_at(p, "id")?;
            let player = player_record(p, stats, roster_by_id.get(id).copied(), &team_alias);
            Some((att + carries + targets, player))
        })
        .collect();

    let is_target = |player: &Player| {
        target_id.is_some_and(|id| player.id == id)
            || target_name.is_some_and(|name| player.name.eq_ignore_ascii_case(name.trim()))
    };

    // Low-usage targets still belong in the packet; rebuild from the profile.
    if (target_id.is_some() || target_name.is_some()) && !ranked.iter().any(|(_, p)| is_target(p)) {
        let from_profile = profile.and_then(|prof| {
            let entry = str_at(prof, "id").and_then(|id| roster_by_id.get(id).copied());
            player_from_profile(prof, stats, entry, &team_alias)
        });
        if let Some(player) = from_profile {
            ranked.push((f64::MAX, player));
        }
    }

    ranked.sort_by(|(va, a), (vb, b)| {
        is_target(b)
            .cmp(&is_target(a))
            .then_with(|| vb.total_cmp(va))
    });
    ranked
        .into_iter()
        .take(thresholds.max_players)
        .map(|(_, p)| p)
        .collect()
}

fn player_record(
    p: &Value,
    team_stats: Option<&Value>,
    roster_entry: Option<&Value>,
    team_alias: &str,
) -> Player {
    let s = |path: &str| stat(p, path);
    let team = |path: &str| team_stats.and_then(|v| stat(v, path));

    let att = s("passing.attempts");
    let sacks = s("passing.sacks");
    let dropbacks = match (att, sacks) {
        (Some(a), Some(sk)) => Some(a + sk),
        (Some(a), None) => Some(a),
        _ => None,
    };
    let targets = s("receiving.targets").filter(|t| *t > 0.0);

    let injury = roster_entry.and_then(|r| {
        r.get("injuries")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
    });

    Player {
        id: str_at(p, "id").unwrap_or_default().to_string(),
        name: str_at(p, "name").unwrap_or_default().to_string(),
        position: normalize_position(
            str_at(p, "position")
                .or_else(|| roster_entry.and_then(|r| str_at(r, "position")))
                .unwrap_or_default(),
        ),
        team: team_alias.to_string(),
        availability: PlayerAvailability {
            injury_status: injury.and_then(|i| str_at(i, "status")).map(str::to_string),
            practice_participation_trend: injury
                .and_then(|i| str_at(i, "practice.status"))
                .map(str::to_string),
            returning_from_injury_flag: false,
            snap_expectation_note: None,
        },
        usage: PlayerUsage {
            dropbacks_per_game: safe_ratio(dropbacks, s("games_played")),
            carry_share: safe_rate(
                s("rushing.attempts").filter(|c| *c > 0.0),
                team("record.rushing.attempts"),
            ),
            target_share: safe_rate(targets, team("record.receiving.targets")),
            air_yards_share: safe_rate(
                s("receiving.air_yards"),
                team("record.receiving.air_yards"),
            ),
        },
        efficiency: PlayerEfficiency {
            int_rate: safe_rate(s("passing.interceptions"), att.filter(|a| *a > 0.0)),
            sack_avoidance_rate: match (att, sacks) {
                (Some(a), Some(sk)) => safe_rate(Some(a), Some(a + sk)),
                _ => None,
            },
            catch_rate: safe_rate(s("receiving.receptions"), targets),
            yards_per_target: safe_ratio(s("receiving.yards"), targets),
        },
    }
}

// Profile season blocks nest stats under `seasons[].teams[].statistics`.
fn player_from_profile(
    profile: &Value,
    team_stats: Option<&Value>,
    roster_entry: Option<&Value>,
    team_alias: &str,
) -> Option<Player> {
    let latest = profile
        .get("seasons")
        .and_then(Value::as_array)
        .and_then(|seasons| seasons.last())
        .and_then(|season| season.get("teams"))
        .and_then(Value::as_array)
        .and_then(|teams| teams.first())
        .and_then(|team| team.get("statistics"));

    let mut merged = latest.cloned().unwrap_or_else(|| Value::Object(Default::default()));
    if let Value::Object(map) = &mut merged {
        for key in ["id", "name", "position"] {
            if let Some(v) = profile.get(key) {
                map.insert(key.to_string(), v.clone());
            }
        }
    }
    str_at(&merged, "id")?;
    Some(player_record(&merged, team_stats, roster_entry, team_alias))
}

pub fn default_prop_for(position: Option<&str>) -> PropType {
    match position.map(str::to_ascii_uppercase).as_deref() {
        Some("QB") => PropType::PassYards,
        Some("RB") | Some("FB") => PropType::RushYards,
        _ => PropType::RecYards,
    }
}

pub fn prop_value(log: &GameLog, prop: PropType) -> f64 {
    match prop {
        PropType::PassYards => log.pass_yards,
        PropType::RushYards => log.rush_yards,
        PropType::RecYards => log.rec_yards,
        PropType::Touchdowns => log.rush_tds + log.rec_tds,
        PropType::Completions => log.completions,
        PropType::Attempts => log.pass_attempts,
        PropType::RushAttempts => log.carries,
        PropType::Receptions => log.receptions,
    }
}

fn family_yards(log: &GameLog, family: YardageFamily) -> f64 {
    match family {
        YardageFamily::Passing => log.pass_yards,
        YardageFamily::Rushing => log.rush_yards,
        YardageFamily::Receiving => log.rec_yards,
        YardageFamily::Scrimmage => log.rush_yards + log.rec_yards,
    }
}

/// `logs` newest first. Unknown when there is nothing to analyze.
pub fn player_analysis(
    player: &Tank01Player,
    logs: &[GameLog],
    prop_type: PropType,
    thresholds: &EvidenceThresholds,
) -> Option<PlayerAnalysis> {
    if logs.is_empty() {
        return None;
    }
    let mut totals = StatLine::default();
    for log in logs {
        totals.add(log);
    }
    let games = logs.len() as f64;
    let prop_values: Vec<f64> = logs.iter().map(|l| prop_value(l, prop_type)).collect();
    let floor = prop_values.iter().copied().reduce(f64::min);
    let ceiling = prop_values.iter().copied().reduce(f64::max);

    let recent_games = logs
        .iter()
        .take(RECENT_GAMES_SHOWN)
        .map(|log| RecentGame {
            game_id: log.game_id.clone(),
            game_date: log.game_date,
            opponent: log.opponent.clone(),
            pass_yards: log.pass_yards,
            rush_yards: log.rush_yards,
            rec_yards: log.rec_yards,
            receptions: log.receptions,
            touches: log.carries + log.receptions,
            prop_value: prop_value(log, prop_type),
        })
        .collect();

    let nonzero = |v: f64| Some(v).filter(|x| *x > 0.0);
    Some(PlayerAnalysis {
        player_id: player.player_id.clone(),
        player_name: player.long_name.clone(),
        position: player.position.clone(),
        prop_type,
        games_analyzed: logs.len(),
        recent_games,
        per_game_averages: totals.per_game(games),
        efficiency: EfficiencyRatios {
            yards_per_attempt: safe_ratio(Some(totals.pass_yards), nonzero(totals.pass_attempts)),
            completion_pct: safe_rate(Some(totals.completions), nonzero(totals.pass_attempts)),
            yards_per_carry: safe_ratio(Some(totals.rush_yards), nonzero(totals.carries)),
            catch_rate: safe_rate(Some(totals.receptions), nonzero(totals.targets)),
            yards_per_reception: safe_ratio(Some(totals.rec_yards), nonzero(totals.receptions)),
        },
        season_totals: totals,
        volume: VolumeRange { floor, ceiling },
        trend: trend(logs, prop_type.yardage_family(), thresholds.min_trend_games),
        prop_values,
    })
}

pub fn trend(logs: &[GameLog], family: YardageFamily, min_games: usize) -> Option<TrendAnalysis> {
    if logs.len() < min_games.max(TREND_WINDOW) {
        return None;
    }
    let yards: Vec<f64> = logs.iter().map(|l| family_yards(l, family)).collect();
    let season_average = yards.iter().sum::<f64>() / yards.len() as f64;
    let last3_average = yards.iter().take(TREND_WINDOW).sum::<f64>() / TREND_WINDOW as f64;
    let delta = last3_average - season_average;
    let direction = if delta > TREND_THRESHOLD_YARDS {
        TrendDirection::TrendingUp
    } else if delta < -TREND_THRESHOLD_YARDS {
        TrendDirection::TrendingDown
    } else {
        TrendDirection::Stable
    };
    Some(TrendAnalysis {
        last3_average: round1(last3_average),
        season_average: round1(season_average),
        delta: round1(delta),
        direction,
    })
}
