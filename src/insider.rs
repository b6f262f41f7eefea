use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::EvidenceThresholds;
use crate::context::{GameContext, HomeAway};
use crate::error::FetchError;
use crate::normalize::{missing_paths, normalize_alias, normalize_position, round1, round2, str_at};
use crate::sportradar::Sportradar;
use crate::tank01::GameLog;

const SHORT_WEEK_DAYS: i64 = 6;
const OL_POSITIONS: &[&str] = &["LT", "LG", "C", "RG", "RT", "T", "G", "OT", "OG", "OL"];
const CB_POSITIONS: &[&str] = &["CB", "LCB", "RCB", "NB"];
const EDGE_POSITIONS: &[&str] = &["DE", "LDE", "RDE", "OLB", "EDGE", "LOLB", "ROLB"];
const INTERIOR_POSITIONS: &[&str] = &["DT", "NT", "DL", "LDT", "RDT"];
const LB_POSITIONS: &[&str] = &["LB", "ILB", "MLB", "WLB", "SLB", "LILB", "RILB"];
const SAFETY_POSITIONS: &[&str] = &["S", "FS", "SS", "DB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    Probable,
    Healthy,
}

impl InjuryStatus {
    pub fn is_unavailable(self) -> bool {
        matches!(self, InjuryStatus::Out | InjuryStatus::Doubtful)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryDesignation {
    #[serde(rename = "IR")]
    Ir,
    #[serde(rename = "PUP")]
    Pup,
    #[serde(rename = "NFI")]
    Nfi,
    #[serde(rename = "none")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjurySeverity {
    Minor,
    Moderate,
    Major,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PracticeCode {
    #[serde(rename = "DNP")]
    Dnp,
    #[serde(rename = "LP")]
    Lp,
    #[serde(rename = "FP")]
    Fp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryTrend {
    Improving,
    Unchanged,
    Worsening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapLimit {
    Yes,
    No,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsiderGameContext {
    pub season: i32,
    pub week: u32,
    pub game_id: Option<String>,
    pub team: String,
    pub opponent: Option<String>,
    pub home_away: Option<HomeAway>,
    pub kickoff_time: Option<DateTime<Utc>>,
    pub days_rest: Option<i64>,
    pub short_week_flag: bool,
    pub data_freshness_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerAvailability {
    pub player_id: Option<String>,
    pub name: String,
    pub position: String,
    pub team: String,
    pub injury_status: InjuryStatus,
    pub injury_designation: InjuryDesignation,
    pub injury_body_part: Option<String>,
    pub injury_severity: InjurySeverity,
    pub practice_participation: BTreeMap<String, PracticeCode>,
    pub injury_trend: InjuryTrend,
    pub returning_from_injury_flag: bool,
    pub snap_limit_expectation: SnapLimit,
    pub game_time_decision_flag: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthChartContext {
    pub depth_chart_position: u32,
    pub direct_backup_player_id: Option<String>,
    pub direct_backup_name: Option<String>,
    pub backup_experience_flag: bool,
    pub committee_risk_flag: bool,
    pub positional_thinness_flag: bool,
    pub emergency_elevation_flag: bool,
}

impl Default for DepthChartContext {
    fn default() -> Self {
        Self {
            depth_chart_position: 1,
            direct_backup_player_id: None,
            direct_backup_name: None,
            backup_experience_flag: false,
            committee_risk_flag: false,
            positional_thinness_flag: false,
            emergency_elevation_flag: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecentUsageRole {
    pub snap_share_proxy: Option<f64>,
    pub route_participation_proxy: Option<f64>,
    pub carry_share: Option<f64>,
    pub target_share: Option<f64>,
    pub red_zone_usage: Option<f64>,
    pub goal_line_usage: Option<f64>,
    pub two_minute_usage: Option<f64>,
    pub last3_touches_per_game: Option<f64>,
    pub season_touches_per_game: Option<f64>,
    pub last3_vs_season_usage_delta: f64,
    pub role_expansion_flag: bool,
    pub role_contraction_flag: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OffensiveLineStatus {
    pub starting_ol_expected: u32,
    pub ol_injuries: Vec<String>,
    pub ol_replacements: Vec<String>,
    pub ol_continuity_score: f64,
    pub protection_downgrade_flag: bool,
    pub run_blocking_downgrade_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReplacementQuality {
    Elite,
    Average,
    Poor,
    Unknown,
    #[serde(rename = "N/A")]
    NotApplicable,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefensiveStatus {
    pub cb1_status: String,
    pub cb1_replacement_quality: ReplacementQuality,
    pub edge_rusher_status: String,
    pub interior_dl_status: String,
    pub lb_run_def_status: String,
    pub safety_deep_role_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachingContext {
    pub head_coach: String,
    pub offensive_coordinator: String,
    pub defensive_coordinator: String,
    pub recent_playcaller_change_flag: bool,
    pub recent_scheme_change_notes: String,
}

impl Default for CoachingContext {
    fn default() -> Self {
        Self {
            head_coach: "Unknown".to_string(),
            offensive_coordinator: "Unknown".to_string(),
            defensive_coordinator: "Unknown".to_string(),
            recent_playcaller_change_flag: false,
            recent_scheme_change_notes: "None".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleVolatility {
    pub snap_volatility_score: f64,
    pub usage_volatility_score: f64,
    pub role_stability_flag: bool,
    pub committee_risk_flag: bool,
    pub trust_uncertainty_flag: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQuality {
    pub missing_fields: Vec<String>,
    pub stale_data_flags: Vec<String>,
    pub conflicting_reports_flag: bool,
    pub last_updated_by_source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsiderPacket {
    pub game_context: InsiderGameContext,
    pub player_availability: PlayerAvailability,
    pub depth_chart: DepthChartContext,
    pub recent_usage: RecentUsageRole,
    pub offensive_line: OffensiveLineStatus,
    pub defensive_line: DefensiveStatus,
    pub coaching: CoachingContext,
    pub volatility: RoleVolatility,
    pub data_quality: DataQuality,
}

pub fn normalize_injury_status(status: &str) -> InjuryStatus {
    let s = status.to_lowercase();
    if s.contains("out") {
        InjuryStatus::Out
    } else if s.contains("doub") {
        InjuryStatus::Doubtful
    } else if s.contains("quest") {
        InjuryStatus::Questionable
    } else if s.contains("prob") {
        InjuryStatus::Probable
    } else {
        InjuryStatus::Healthy
    }
}

pub fn practice_code(status: &str) -> Option<PracticeCode> {
    let s = status.trim().to_lowercase();
    if s.is_empty() {
        None
    } else if s.contains("did not") || s == "dnp" || s.contains("out") {
        Some(PracticeCode::Dnp)
    } else if s.contains("limited") || s == "lp" {
        Some(PracticeCode::Lp)
    } else if s.contains("full") || s == "fp" {
        Some(PracticeCode::Fp)
    } else {
        None
    }
}

fn designation(status: &str) -> InjuryDesignation {
    let s = status.to_lowercase();
    if s.contains("injured reserve") || s.split_whitespace().any(|t| t == "ir") {
        InjuryDesignation::Ir
    } else if s.contains("pup") || s.contains("physically unable") {
        InjuryDesignation::Pup
    } else if s.contains("nfi") || s.contains("non-football") {
        InjuryDesignation::Nfi
    } else {
        InjuryDesignation::None
    }
}

/// Deterministic role/snap risk from availability and depth context.
pub fn calculate_volatility(
    availability: &PlayerAvailability,
    depth: &DepthChartContext,
) -> RoleVolatility {
    let mut snap: f64 = 0.1;
    let mut usage: f64 = 0.1;
    let mut trust_uncertainty = false;
    let mut role_stability = true;

    if availability.injury_status != InjuryStatus::Healthy {
        trust_uncertainty = true;
        role_stability = false;
        snap += 0.3;
        if matches!(
            availability.injury_status,
            InjuryStatus::Doubtful | InjuryStatus::Questionable
        ) {
            snap += 0.4;
        }
    }

    if depth.depth_chart_position > 1 {
        usage += 0.3;
        role_stability = false;
    }

    if depth.committee_risk_flag {
        usage += 0.2;
        snap += 0.1;
        role_stability = false;
    }

    // A live game-time decision pins snap risk regardless of the above.
    if availability.game_time_decision_flag {
        snap = 0.9;
        trust_uncertainty = true;
        role_stability = false;
    }

    RoleVolatility {
        snap_volatility_score: round2(snap.clamp(0.0, 1.0)),
        usage_volatility_score: round2(usage.clamp(0.0, 1.0)),
        role_stability_flag: role_stability,
        committee_risk_flag: depth.committee_risk_flag,
        trust_uncertainty_flag: trust_uncertainty,
    }
}

pub fn ol_continuity_score(injuries: usize) -> f64 {
    round2((1.0 - injuries as f64 * 0.15).max(0.5))
}

#[derive(Debug, Clone)]
pub struct InjuryEntry {
    pub id: Option<String>,
    pub name: String,
    pub position: String,
    pub status: InjuryStatus,
    pub raw_status: String,
    pub body_part: Option<String>,
    pub practice: Vec<(String, PracticeCode)>,
}

/// Injury list for `team_alias`, tolerant of both weekly and flat shapes.
pub fn team_injuries(report: &Value, team_alias: &str) -> Vec<InjuryEntry> {
    let alias = normalize_alias(team_alias);
    let teams = report
        .get("weeks")
        .and_then(Value::as_array)
        .and_then(|weeks| weeks.first())
        .and_then(|week| week.get("teams"))
        .or_else(|| report.get("teams"))
        .and_then(Value::as_array);
    let Some(team) = teams.and_then(|teams| {
        teams
            .iter()
            .find(|t| str_at(t, "alias").is_some_and(|a| a.eq_ignore_ascii_case(&alias)))
    }) else {
        return Vec::new();
    };
    team.get("players")
        .and_then(Value::as_array)
        .map(|players| players.iter().filter_map(injury_entry).collect())
        .unwrap_or_default()
}

fn injury_entry(player: &Value) -> Option<InjuryEntry> {
    let injury = player.get("injury").or_else(|| {
        player
            .get("injuries")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
    })?;
    let raw_status = str_at(injury, "status").unwrap_or_default().to_string();
    let mut practice: Vec<(String, PracticeCode)> = injury
        .get("practices")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .filter_map(|d| {
                    let day = str_at(d, "date").or_else(|| str_at(d, "day"))?;
                    let code = str_at(d, "status").and_then(practice_code)?;
                    Some((day.to_string(), code))
                })
                .collect()
        })
        .unwrap_or_default();
    if practice.is_empty() {
        let latest = str_at(injury, "practice_status").or_else(|| str_at(injury, "practice.status"));
        if let Some(code) = latest.and_then(practice_code) {
            let day = str_at(injury, "status_date").unwrap_or("latest");
            practice.push((day.to_string(), code));
        }
    }
    Some(InjuryEntry {
        id: str_at(player, "id").map(str::to_string),
        name: str_at(player, "name")?.to_string(),
        position: normalize_position(str_at(player, "position").unwrap_or_default()),
        status: normalize_injury_status(&raw_status),
        body_part: str_at(injury, "body_part")
            .or_else(|| str_at(injury, "primary"))
            .map(str::to_string),
        raw_status,
        practice,
    })
}

#[derive(Debug, Clone)]
pub struct DepthGroup {
    pub position: String,
    pub players: Vec<(Option<String>, String)>,
}

/// Position groups from either `team.depth_chart[]` or the
/// `offense/defense/special_teams[].position` layout.
pub fn depth_groups(chart: &Value) -> Vec<DepthGroup> {
    let names = |list: &Value| -> Vec<(Option<String>, String)> {
        let mut players: Vec<&Value> = list.as_array().map(|a| a.iter().collect()).unwrap_or_default();
        players.sort_by_key(|p| p.get("depth").and_then(Value::as_u64).unwrap_or(u64::MAX));
        players
            .into_iter()
            .filter_map(|p| Some((str_at(p, "id").map(str::to_string), str_at(p, "name")?.to_string())))
            .collect()
    };

    if let Some(groups) = chart
        .get("team")
        .and_then(|t| t.get("depth_chart"))
        .or_else(|| chart.get("depth_chart"))
        .and_then(Value::as_array)
    {
        return groups
            .iter()
            .filter_map(|g| {
                Some(DepthGroup {
                    position: normalize_position(str_at(g, "position")?),
                    players: names(g.get("players")?),
                })
            })
            .collect();
    }

    ["offense", "defense", "special_teams"]
        .iter()
        .filter_map(|side| chart.get(*side).and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| {
            let pos = entry.get("position")?;
            Some(DepthGroup {
                position: normalize_position(str_at(pos, "name")?),
                players: names(pos.get("players")?),
            })
        })
        .collect()
}

pub fn depth_context(
    groups: &[DepthGroup],
    player_name: &str,
    injuries: &[InjuryEntry],
) -> Option<(DepthChartContext, String, Option<String>)> {
    let unavailable = |name: &str| {
        injuries
            .iter()
            .any(|i| i.name.eq_ignore_ascii_case(name) && i.status.is_unavailable())
    };
    groups.iter().find_map(|group| {
        let idx = group
            .players
            .iter()
            .position(|(_, name)| name.eq_ignore_ascii_case(player_name.trim()))?;
        let rank = idx as u32 + 1;
        let backup = group.players.get(idx + 1);
        let ahead = &group.players[..idx];
        let ctx = DepthChartContext {
            depth_chart_position: rank,
            direct_backup_player_id: backup.and_then(|(id, _)| id.clone()),
            direct_backup_name: backup.map(|(_, name)| name.clone()),
            backup_experience_flag: false,
            committee_risk_flag: rank > 2,
            positional_thinness_flag: backup.is_some_and(|(_, name)| unavailable(name)),
            emergency_elevation_flag: !ahead.is_empty() && ahead.iter().all(|(_, name)| unavailable(name)),
        };
        Some((ctx, group.position.clone(), group.players[idx].0.clone()))
    })
}

pub fn offensive_line_status(injuries: &[InjuryEntry], groups: &[DepthGroup]) -> OffensiveLineStatus {
    let hurt: Vec<&InjuryEntry> = injuries
        .iter()
        .filter(|i| OL_POSITIONS.contains(&i.position.as_str()) && i.status.is_unavailable())
        .collect();
    let replacements = hurt
        .iter()
        .filter_map(|injured| {
            groups
                .iter()
                .filter(|g| OL_POSITIONS.contains(&g.position.as_str()))
                .find_map(|g| {
                    let idx = g
                        .players
                        .iter()
                        .position(|(_, name)| name.eq_ignore_ascii_case(&injured.name))?;
                    g.players.get(idx + 1).map(|(_, name)| name.clone())
                })
        })
        .collect();
    let count = hurt.len();
    OffensiveLineStatus {
        starting_ol_expected: 5u32.saturating_sub(count as u32),
        ol_injuries: hurt.iter().map(|i| i.name.clone()).collect(),
        ol_replacements: replacements,
        ol_continuity_score: ol_continuity_score(count),
        protection_downgrade_flag: count >= 2,
        run_blocking_downgrade_flag: count >= 2,
    }
}

fn unit_status(injuries: &[InjuryEntry], positions: &[&str]) -> String {
    let worst = injuries
        .iter()
        .filter(|i| positions.contains(&i.position.as_str()) && i.status != InjuryStatus::Healthy)
        .min_by_key(|i| match i.status {
            InjuryStatus::Out => 0,
            InjuryStatus::Doubtful => 1,
            InjuryStatus::Questionable => 2,
            _ => 3,
        });
    match worst {
        Some(entry) if entry.status != InjuryStatus::Probable => {
            let label = match entry.status {
                InjuryStatus::Out => "Out",
                InjuryStatus::Doubtful => "Doubtful",
                _ => "Questionable",
            };
            format!("{label} ({})", entry.name)
        }
        _ => "Healthy".to_string(),
    }
}

pub fn defensive_status(opponent_injuries: &[InjuryEntry]) -> DefensiveStatus {
    let cb1_status = unit_status(opponent_injuries, CB_POSITIONS);
    let cb1_replacement_quality = if cb1_status == "Healthy" {
        ReplacementQuality::NotApplicable
    } else {
        ReplacementQuality::Unknown
    };
    DefensiveStatus {
        cb1_status,
        cb1_replacement_quality,
        edge_rusher_status: unit_status(opponent_injuries, EDGE_POSITIONS),
        interior_dl_status: unit_status(opponent_injuries, INTERIOR_POSITIONS),
        lb_run_def_status: unit_status(opponent_injuries, LB_POSITIONS),
        safety_deep_role_status: unit_status(opponent_injuries, SAFETY_POSITIONS),
    }
}

/// Touch-based usage shift from per-game logs (newest first).
pub fn recent_usage(logs: &[GameLog], thresholds: &EvidenceThresholds) -> RecentUsageRole {
    if logs.len() < thresholds.min_trend_games.max(3) {
        return RecentUsageRole::default();
    }
    let touches: Vec<f64> = logs.iter().map(|l| l.carries + l.receptions).collect();
    let season = touches.iter().sum::<f64>() / touches.len() as f64;
    let last3 = touches.iter().take(3).sum::<f64>() / 3.0;
    let delta = round1(last3 - season);
    RecentUsageRole {
        last3_touches_per_game: Some(round1(last3)),
        season_touches_per_game: Some(round1(season)),
        last3_vs_season_usage_delta: delta,
        role_expansion_flag: delta >= thresholds.role_shift_touches,
        role_contraction_flag: delta <= -thresholds.role_shift_touches,
        ..RecentUsageRole::default()
    }
}

fn injury_trend(practice: &[(String, PracticeCode)]) -> InjuryTrend {
    match (practice.first(), practice.last()) {
        (Some((_, first)), Some((_, last))) if last > first => InjuryTrend::Improving,
        (Some((_, first)), Some((_, last))) if last < first => InjuryTrend::Worsening,
        _ => InjuryTrend::Unchanged,
    }
}

pub struct InsiderInputs<'a> {
    pub injuries: Option<&'a Value>,
    pub depth_chart: Option<&'a Value>,
    pub logs: &'a [GameLog],
}

/// Pure assembly from already-fetched sources.
pub fn build_packet(
    ctx: &GameContext,
    player_name: &str,
    inputs: &InsiderInputs<'_>,
    thresholds: &EvidenceThresholds,
) -> InsiderPacket {
    let team_injuries_list = inputs
        .injuries
        .map(|r| team_injuries(r, &ctx.team))
        .unwrap_or_default();
    let opponent_injuries = match (inputs.injuries, ctx.opponent.as_deref()) {
        (Some(report), Some(opp)) => team_injuries(report, opp),
        _ => Vec::new(),
    };
    let groups = inputs.depth_chart.map(depth_groups).unwrap_or_default();
    let found = depth_context(&groups, player_name, &team_injuries_list);
    let injury = team_injuries_list
        .iter()
        .find(|i| i.name.eq_ignore_ascii_case(player_name.trim()));

    let player_listed = found.is_some();
    let (depth, depth_position, depth_id) = match found {
        Some((ctx, pos, id)) => (ctx, Some(pos), id),
        None => (DepthChartContext::default(), None, None),
    };

    let status = injury.map(|i| i.status).unwrap_or(InjuryStatus::Healthy);
    let severity = match (injury, status) {
        (None, _) => InjurySeverity::Unknown,
        (Some(_), InjuryStatus::Out) => InjurySeverity::Major,
        (Some(_), InjuryStatus::Doubtful | InjuryStatus::Questionable) => InjurySeverity::Moderate,
        (Some(_), _) => InjurySeverity::Minor,
    };
    let availability = PlayerAvailability {
        player_id: injury.and_then(|i| i.id.clone()).or(depth_id),
        name: player_name.trim().to_string(),
        position: injury
            .map(|i| i.position.clone())
            .or(depth_position)
            .unwrap_or_else(|| "UNK".to_string()),
        team: ctx.team.clone(),
        injury_status: status,
        injury_designation: injury
            .map(|i| designation(&i.raw_status))
            .unwrap_or(InjuryDesignation::None),
        injury_body_part: injury.and_then(|i| i.body_part.clone()),
        injury_severity: severity,
        practice_participation: injury
            .map(|i| i.practice.iter().cloned().collect())
            .unwrap_or_default(),
        injury_trend: injury
            .map(|i| injury_trend(&i.practice))
            .unwrap_or(InjuryTrend::Unchanged),
        returning_from_injury_flag: false,
        snap_limit_expectation: match status {
            InjuryStatus::Healthy => SnapLimit::No,
            InjuryStatus::Out => SnapLimit::Unknown,
            _ => SnapLimit::Yes,
        },
        game_time_decision_flag: status == InjuryStatus::Questionable,
    };

    let volatility = calculate_volatility(&availability, &depth);
    let days_rest = ctx.days_rest();

    let mut packet = InsiderPacket {
        game_context: InsiderGameContext {
            season: ctx.season,
            week: ctx.week,
            game_id: ctx.game_id.clone(),
            team: ctx.team.clone(),
            opponent: ctx.opponent.clone(),
            home_away: ctx.home_away,
            kickoff_time: ctx.kickoff,
            days_rest,
            short_week_flag: days_rest.is_some_and(|d| d < SHORT_WEEK_DAYS),
            data_freshness_timestamp: ctx.data_freshness,
        },
        player_availability: availability,
        depth_chart: depth,
        recent_usage: recent_usage(inputs.logs, thresholds),
        offensive_line: offensive_line_status(&team_injuries_list, &groups),
        defensive_line: defensive_status(&opponent_injuries),
        coaching: CoachingContext::default(),
        volatility,
        data_quality: DataQuality {
            missing_fields: Vec::new(),
            stale_data_flags: Vec::new(),
            conflicting_reports_flag: false,
            last_updated_by_source: "Sportradar Official".to_string(),
        },
    };

    let mut missing = serde_json::to_value(&packet)
        .map(|v| missing_paths(&v))
        .unwrap_or_default();
    if inputs.injuries.is_none() {
        missing.push("injury_report".to_string());
    }
    if inputs.depth_chart.is_none() || groups.is_empty() {
        missing.push("depth_chart".to_string());
    } else if !player_listed {
        missing.push("depth_chart.player_not_listed".to_string());
    }
    missing.push("depth_chart.backup_experience_flag".to_string());
    missing.push("coaching".to_string());
    packet.data_quality.missing_fields = missing;
    packet
}

pub struct InsiderAssembler<'a> {
    sportradar: &'a Sportradar,
    thresholds: &'a EvidenceThresholds,
}

impl<'a> InsiderAssembler<'a> {
    pub fn new(sportradar: &'a Sportradar, thresholds: &'a EvidenceThresholds) -> Self {
        Self {
            sportradar,
            thresholds,
        }
    }

    /// `None` when the context has no game to describe.
    pub fn assemble(&self, ctx: &GameContext, player_name: &str, logs: &[GameLog]) -> Option<InsiderPacket> {
        if ctx.opponent.is_none() {
            warn!(team = %ctx.team, "insider: no game in context");
            return None;
        }
        info!(team = %ctx.team, player = player_name, "assembling insider packet");

        let injuries = degrade("injury report", self.sportradar.injuries(ctx.season, ctx.week));
        let team_id = degrade(
            "game resolution",
            self.sportradar.resolve_game(ctx.season, ctx.week, &ctx.team),
        )
        .flatten()
        .map(|game| game.team_id);
        let depth = team_id.and_then(|id| degrade("depth chart", self.sportradar.depth_chart(&id)));

        let inputs = InsiderInputs {
            injuries: injuries.as_ref().filter(|v| !v.is_null()),
            depth_chart: depth.as_ref().filter(|v| !v.is_null()),
            logs,
        };
        Some(build_packet(ctx, player_name, &inputs, self.thresholds))
    }
}

fn degrade<T>(what: &str, result: Result<T, FetchError>) -> Option<T> {
    result
        .map_err(|err| warn!(error = %err, rate_limited = err.is_rate_limited(), "insider {what} unavailable"))
        .ok()
}
