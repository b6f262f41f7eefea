use std::sync::Arc;
use std::thread;

use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::agents::{AnalysisAgents, InsiderAnalysis, OverallConfidence, ScoutJudgment};
use crate::config::AppConfig;
use crate::context::{BetContext, ContextSource, GameContext, TeamResolver};
use crate::gateway::{RateLimitedClient, TtlCache};
use crate::http_client::Transport;
use crate::insider::{InsiderAssembler, InsiderPacket};
use crate::ledger::Ledger;
use crate::llm::{CompletionModel, OpenAiClient};
use crate::master::{MasterInputs, MasterPacket, Synthesizer};
use crate::meteorologist::{MeteorologistReport, ReportPlayer, build_report};
use crate::scout::{ScoutAssembler, ScoutPacket, ScoutRequest};
use crate::season::upcoming_week;
use crate::sportradar::{self, Sportradar};
use crate::stress_test::{StressTestStore, Voices};
use crate::tank01::{self, GameLog, Tank01, Tank01Player};
use crate::tts::{ElevenLabsClient, SpeechSynth};
use crate::weather::{self, WeatherService};

const SCOUT_TITLE: &str = "Statistical Deep Dive";
const INSIDER_TITLE: &str = "Touchdown Whisperer";
const WEATHER_TITLE: &str = "Atmospheric Factors";
const BOOKIE_TITLE: &str = "The Final Verdict";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Scout,
    Insider,
    Meteorologist,
    Bookie,
}

impl AgentRole {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "scout" => Some(AgentRole::Scout),
            "insider" => Some(AgentRole::Insider),
            "meteorologist" => Some(AgentRole::Meteorologist),
            "bookie" => Some(AgentRole::Bookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    pub player: String,
    pub prop: String,
    pub agent: String,
    pub team: Option<String>,
    pub line: Option<f64>,
    pub context: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub title: String,
    pub content: String,
    pub confidence: u32,
    pub data_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Value>,
}

/// Long-lived backends shared by every request.
pub struct Services {
    pub config: AppConfig,
    pub cache: Arc<TtlCache>,
    pub sportradar: Sportradar,
    pub tank01: Tank01,
    pub weather: WeatherService,
    pub model: Arc<dyn CompletionModel>,
    pub speech: Option<Arc<dyn SpeechSynth>>,
    pub ledger: Ledger,
    pub stress_store: StressTestStore,
    pub voices: Voices,
}

impl Services {
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>) -> Self {
        let model = OpenAiClient::new(transport.clone(), &config.model);
        if !model.is_configured() {
            warn!("OPENAI_API_KEY not set; agents will return fallback judgments");
        }
        let speech = config.speech.api_key.is_some().then(|| {
            Arc::new(ElevenLabsClient::new(
                transport.clone(),
                &config.speech,
                config.audio_dir(),
            )) as Arc<dyn SpeechSynth>
        });
        Self::with_backends(config, transport, Arc::new(model), speech)
    }

    pub fn with_backends(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        model: Arc<dyn CompletionModel>,
        speech: Option<Arc<dyn SpeechSynth>>,
    ) -> Self {
        let cache = Arc::new(TtlCache::new());
        let sportradar = Sportradar::new(
            Arc::new(RateLimitedClient::new(
                sportradar::PROVIDER,
                transport.clone(),
                config.sportradar.min_delay,
            )),
            cache.clone(),
            &config.sportradar,
            config.ttls.clone(),
        );
        let tank01 = Tank01::new(
            Arc::new(RateLimitedClient::new(
                tank01::PROVIDER,
                transport.clone(),
                config.tank01.min_delay,
            )),
            cache.clone(),
            &config.tank01,
            &config.tank01_host,
            config.ttls.tank01,
        );
        let weather = WeatherService::new(
            Arc::new(RateLimitedClient::new(
                weather::PROVIDER,
                transport,
                config.weather.min_delay,
            )),
            cache.clone(),
            &config.weather,
            &config.weather_user_agent,
        );
        let voices = Voices {
            bookie: config.speech.bookie_voice.clone(),
            skeptic: config.speech.skeptic_voice.clone(),
        };
        Self {
            ledger: Ledger::new(config.ledger_path()),
            stress_store: StressTestStore::new(config.stress_store_path()),
            config,
            cache,
            sportradar,
            tank01,
            weather,
            model,
            speech,
            voices,
        }
    }
}

/// What the primary provider knows about the target player.
#[derive(Debug, Clone, Default)]
pub struct PlayerEvidence {
    pub player: Option<Tank01Player>,
    pub logs: Vec<GameLog>,
}

/// Every packet built for one request, all describing the same game.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub context: GameContext,
    pub scout: Option<ScoutPacket>,
    pub scout_judgment: Option<ScoutJudgment>,
    pub insider: Option<InsiderPacket>,
    pub insider_judgment: Option<InsiderAnalysis>,
    pub meteorologist: Option<MeteorologistReport>,
}

impl Evidence {
    pub fn scout_value(&self) -> Option<Value> {
        self.scout.as_ref().and_then(|p| serde_json::to_value(p).ok())
    }

    /// The insider judgment when the model produced one, else the raw packet.
    pub fn insider_value(&self) -> Option<Value> {
        match (&self.insider_judgment, &self.insider) {
            (Some(judgment), _) => serde_json::to_value(judgment).ok(),
            (None, Some(packet)) => serde_json::to_value(packet).ok(),
            (None, None) => None,
        }
    }

    pub fn meteorologist_value(&self) -> Option<Value> {
        self.meteorologist
            .as_ref()
            .and_then(|r| serde_json::to_value(r).ok())
    }
}

/// Per-request orchestration over shared [`Services`].
pub struct Pipeline<'a> {
    services: &'a Services,
    today: NaiveDate,
}

impl<'a> Pipeline<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self {
            services,
            today: Utc::now().date_naive(),
        }
    }

    pub fn on(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn tank01_player(&self, player: &str) -> Option<Tank01Player> {
        if !self.services.tank01.is_configured() {
            return None;
        }
        self.services
            .tank01
            .player_info(player)
            .map_err(|err| warn!(error = %err, player, "tank01 player lookup failed"))
            .ok()
            .flatten()
    }

    pub fn resolve_team(&self, player: &str, team_override: Option<&str>) -> String {
        let config = &self.services.config;
        TeamResolver::new(&config.player_teams, &config.default_team).resolve(
            team_override,
            player,
            || self.tank01_player(player).map(|p| p.team),
        )
    }

    /// Resolved once per request; every builder receives this same value.
    pub fn game_context(&self, team: &str) -> GameContext {
        let week = upcoming_week(self.services.config.season_start, self.today);
        if self.services.tank01.is_configured() {
            match self
                .services
                .tank01
                .game_context(team, week.season, week.week, self.today)
            {
                Ok(Some(ctx)) => return ctx,
                Ok(None) => {}
                Err(err) => warn!(error = %err, team, "tank01 game context unavailable"),
            }
        }

        match self
            .services
            .sportradar
            .resolve_game(week.season, week.week, team)
        {
            Ok(Some(game)) => GameContext {
                season: week.season,
                week: week.week,
                game_id: Some(game.game_id),
                team: team.to_string(),
                opponent: Some(game.opponent_alias),
                home_away: Some(game.home_away),
                kickoff: game.scheduled,
                previous_kickoff: None,
                data_freshness: Utc::now(),
                source: ContextSource::Sportradar,
            },
            Ok(None) => GameContext::unresolved(week.season, week.week, team),
            Err(err) => {
                warn!(error = %err, team, "no provider could resolve the game");
                GameContext::unresolved(week.season, week.week, team)
            }
        }
    }

    pub fn player_evidence(&self, player: &str, season: i32) -> PlayerEvidence {
        let Some(found) = self.tank01_player(player) else {
            return PlayerEvidence::default();
        };
        let logs = self
            .services
            .tank01
            .game_logs(&found.player_id, season)
            .map_err(|err| warn!(error = %err, player, "tank01 game logs unavailable"))
            .unwrap_or_default();
        PlayerEvidence {
            player: Some(found),
            logs,
        }
    }

    fn agents(&self) -> AnalysisAgents<'_> {
        AnalysisAgents::new(
            self.services.model.as_ref(),
            &self.services.config.model.agent_model,
        )
    }

    fn scout_leg(
        &self,
        ctx: &GameContext,
        bet: &BetContext,
        evidence: &PlayerEvidence,
    ) -> (ScoutPacket, ScoutJudgment) {
        let thresholds = &self.services.config.thresholds;
        let request = ScoutRequest {
            context: ctx,
            player_name: Some(bet.player_name.as_str()),
            prop_line: bet.prop_line(),
            tank01_player: evidence.player.as_ref(),
            logs: &evidence.logs,
        };
        let packet = ScoutAssembler::new(&self.services.sportradar, thresholds).assemble(&request);
        let judgment = match serde_json::to_value(&packet) {
            Ok(value) => self.agents().scout(&value),
            Err(err) => {
                warn!(error = %err, "scout packet did not serialize");
                ScoutJudgment::fallback()
            }
        };
        (packet, judgment)
    }

    fn insider_leg(
        &self,
        ctx: &GameContext,
        bet: &BetContext,
        evidence: &PlayerEvidence,
    ) -> Option<(InsiderPacket, Option<InsiderAnalysis>)> {
        let thresholds = &self.services.config.thresholds;
        let packet = InsiderAssembler::new(&self.services.sportradar, thresholds).assemble(
            ctx,
            &bet.player_name,
            &evidence.logs,
        )?;
        let judgment = serde_json::to_value(&packet)
            .ok()
            .and_then(|value| self.agents().insider(&value));
        Some((packet, judgment))
    }

    fn meteorologist_leg(
        &self,
        ctx: &GameContext,
        bet: &BetContext,
        evidence: &PlayerEvidence,
    ) -> Option<MeteorologistReport> {
        let player = ReportPlayer {
            name: bet.player_name.clone(),
            team: ctx.team.clone(),
            position: evidence
                .player
                .as_ref()
                .and_then(|p| p.position.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
        };
        let mut report = build_report(ctx, player, &self.services.weather)?;
        if report.forecast_resolved() {
            report.analysis = self.agents().weather(&report);
        }
        Some(report)
    }

    /// Resolves the context once, then runs the three builders concurrently.
    pub fn gather(&self, bet: &BetContext, team_override: Option<&str>) -> Evidence {
        let team = self.resolve_team(&bet.player_name, team_override);
        let context = self.game_context(&team);
        info!(
            player = %bet.player_name,
            team = %context.team,
            opponent = context.opponent.as_deref().unwrap_or("-"),
            source = ?context.source,
            "game context resolved"
        );
        let evidence = self.player_evidence(&bet.player_name, context.season);

        let (scout, insider, meteorologist) = thread::scope(|scope| {
            let ctx = &context;
            let evidence = &evidence;
            let scout = scope.spawn(move || self.scout_leg(ctx, bet, evidence));
            let insider = scope.spawn(move || self.insider_leg(ctx, bet, evidence));
            let meteorologist = scope.spawn(move || self.meteorologist_leg(ctx, bet, evidence));
            (
                joined("scout", scout.join()),
                joined("insider", insider.join()).flatten(),
                joined("meteorologist", meteorologist.join()).flatten(),
            )
        });

        let (scout, scout_judgment) = scout.unzip();
        let (insider, insider_judgment) = insider.unzip();
        Evidence {
            context,
            scout,
            scout_judgment,
            insider,
            insider_judgment: insider_judgment.flatten(),
            meteorologist,
        }
    }

    pub fn analyze(&self, request: &AnalyzeRequest, role: AgentRole) -> Result<AgentReport> {
        if request.player.trim().is_empty() {
            bail!("player is required");
        }
        let bet = BetContext::from_query(&request.player, &request.prop, request.line);
        let team_override = request.team.as_deref();
        info!(player = %bet.player_name, prop = %bet.prop_type, agent = ?role, "analyze request");

        let report = match role {
            AgentRole::Scout => {
                let (ctx, evidence) = self.single_leg_setup(&bet, team_override);
                let (packet, judgment) = self.scout_leg(&ctx, &bet, &evidence);
                scout_report(&packet, &judgment)
            }
            AgentRole::Insider => {
                let (ctx, evidence) = self.single_leg_setup(&bet, team_override);
                match self.insider_leg(&ctx, &bet, &evidence) {
                    Some((packet, judgment)) => insider_report(&packet, judgment.as_ref()),
                    None => no_game_report(INSIDER_TITLE, &bet.player_name),
                }
            }
            AgentRole::Meteorologist => {
                let (ctx, evidence) = self.single_leg_setup(&bet, team_override);
                match self.meteorologist_leg(&ctx, &bet, &evidence) {
                    Some(report) => weather_report(&report),
                    None => no_game_report(WEATHER_TITLE, &bet.player_name),
                }
            }
            AgentRole::Bookie => self.bookie(&bet, team_override, request.context.as_ref()),
        };
        Ok(report)
    }

    fn single_leg_setup(&self, bet: &BetContext, team_override: Option<&str>) -> (GameContext, PlayerEvidence) {
        let team = self.resolve_team(&bet.player_name, team_override);
        let ctx = self.game_context(&team);
        let evidence = self.player_evidence(&bet.player_name, ctx.season);
        (ctx, evidence)
    }

    fn bookie(&self, bet: &BetContext, team_override: Option<&str>, context: Option<&Value>) -> AgentReport {
        let provided = context.filter(|c| {
            ["scout", "insider", "meteorologist"]
                .iter()
                .any(|key| c.get(key).is_some_and(|v| !v.is_null()))
        });
        let (scout, insider, meteorologist) = match provided {
            Some(ctx) => {
                info!("bookie: using evidence supplied by the caller");
                let pick = |key: &str| ctx.get(key).filter(|v| !v.is_null()).cloned();
                (pick("scout"), pick("insider"), pick("meteorologist"))
            }
            None => {
                let evidence = self.gather(bet, team_override);
                (
                    evidence.scout_value(),
                    evidence.insider_value(),
                    evidence.meteorologist_value(),
                )
            }
        };

        let config = &self.services.config;
        let packet = Synthesizer::new(
            self.services.model.as_ref(),
            &config.model.master_model,
            Some(&self.services.ledger),
            config.thresholds.min_hit_rate_games,
        )
        .run(MasterInputs {
            bet,
            scout: scout.as_ref(),
            insider: insider.as_ref(),
            meteorologist: meteorologist.as_ref(),
        });
        bookie_report(&packet)
    }
}

fn joined<T>(leg: &str, result: thread::Result<T>) -> Option<T> {
    result
        .map_err(|_| warn!(leg, "packet builder panicked; continuing without it"))
        .ok()
}

// Serialized enum label, e.g. `"questionable"` or `"OVER"`.
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

fn percent(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u32
}

pub fn scout_report(packet: &ScoutPacket, judgment: &ScoutJudgment) -> AgentReport {
    let mut data_points = vec![format!("Verdict: {}", label(&judgment.verdict))];
    if let Some(analysis) = &packet.player_analysis {
        data_points.push(format!("Games analyzed: {}", analysis.games_analyzed));
        if let Some(avg) = analysis.prop_average() {
            data_points.push(format!("{} avg: {avg}", analysis.prop_type.label()));
        }
        if let Some(trend) = &analysis.trend {
            data_points.push(format!(
                "Last 3: {} vs season {} ({})",
                trend.last3_average,
                trend.season_average,
                label(&trend.direction)
            ));
        }
    }
    data_points.extend(judgment.key_factors.iter().cloned());
    if !packet.missing_data.is_empty() {
        data_points.push(format!("Missing: {}", packet.missing_data.len()));
    }

    AgentReport {
        title: SCOUT_TITLE.to_string(),
        content: judgment.analysis.clone(),
        confidence: percent(judgment.confidence * 10.0),
        data_points,
        structured_data: serde_json::to_value(packet).ok(),
    }
}

pub fn insider_confidence(packet: &InsiderPacket, judgment: Option<&InsiderAnalysis>) -> u32 {
    let base = ((1.0 - packet.volatility.snap_volatility_score) * 100.0).round();
    let penalty = judgment
        .map(|j| j.confidence_adjustment.adjustment.penalty())
        .unwrap_or(0);
    percent(base - penalty as f64)
}

pub fn insider_report(packet: &InsiderPacket, judgment: Option<&InsiderAnalysis>) -> AgentReport {
    let availability = &packet.player_availability;
    let mut data_points = vec![
        format!("Status: {}", label(&availability.injury_status)),
        format!("Depth chart: #{}", packet.depth_chart.depth_chart_position),
        format!("OL continuity: {}", packet.offensive_line.ol_continuity_score),
        format!("Snap volatility: {}", packet.volatility.snap_volatility_score),
    ];
    if let Some(days) = packet.game_context.days_rest {
        data_points.push(format!("Days rest: {days}"));
    }

    let content = match judgment {
        Some(j) if !j.insider_brief.is_empty() => j.insider_brief.join(" "),
        Some(j) => j.confidence_adjustment.summary.clone(),
        None => format!(
            "{} is listed {} and sits #{} on the depth chart. Availability analysis unavailable; raw report attached.",
            availability.name,
            label(&availability.injury_status),
            packet.depth_chart.depth_chart_position
        ),
    };
    let structured_data = match judgment {
        Some(j) => serde_json::to_value(j).ok(),
        None => serde_json::to_value(packet).ok(),
    };

    AgentReport {
        title: INSIDER_TITLE.to_string(),
        content,
        confidence: insider_confidence(packet, judgment),
        data_points,
        structured_data,
    }
}

pub fn weather_confidence(report: &MeteorologistReport) -> u32 {
    match report.analysis.as_ref().map(|a| a.overall_confidence) {
        Some(OverallConfidence::High) => 85,
        Some(OverallConfidence::Medium) => 65,
        Some(OverallConfidence::Low) => 40,
        None => 50,
    }
}

pub fn weather_report(report: &MeteorologistReport) -> AgentReport {
    let env = &report.environment;
    let data_points = vec![
        format!("Stadium: {}", report.game.stadium),
        format!("Roof: {}", env.roof.label()),
        format!("Field: {}", env.field.label()),
        format!("Weather: {}", env.weather_summary),
    ];
    let content = match &report.analysis {
        Some(impact) if !impact.user_weather_writeup.is_empty() => impact.user_weather_writeup.join(" "),
        _ => format!("{} {}", env.weather_summary, env.details),
    };

    AgentReport {
        title: WEATHER_TITLE.to_string(),
        content,
        confidence: weather_confidence(report),
        data_points,
        structured_data: serde_json::to_value(report).ok(),
    }
}

pub fn bookie_report(packet: &MasterPacket) -> AgentReport {
    let mut data_points = vec![format!("Projection: {}", label(&packet.analysis.projection))];
    data_points.extend(packet.key_factors.iter().cloned());

    AgentReport {
        title: BOOKIE_TITLE.to_string(),
        content: packet.analysis_summary.join(" "),
        confidence: percent(packet.analysis.confidence_score * 100.0),
        data_points,
        structured_data: serde_json::to_value(packet).ok(),
    }
}

fn no_game_report(title: &str, player: &str) -> AgentReport {
    AgentReport {
        title: title.to_string(),
        content: format!("No upcoming game found for {player}."),
        confidence: 0,
        data_points: vec!["No Data".to_string()],
        structured_data: None,
    }
}
