use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;

const DEFAULT_SPORTRADAR_BASE: &str = "https://api.sportradar.us/nfl/official/trial/v7/en";
const DEFAULT_TANK01_HOST: &str = "tank01-nfl-live-in-game-real-time-statistics-nfl.p.rapidapi.com";
const DEFAULT_NWS_BASE: &str = "https://api.weather.gov";
const DEFAULT_NWS_USER_AGENT: &str = "(propdesk/0.1; ops@propdesk.local)";
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TTS_BASE: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_SEASON_START: &str = "2025-09-04";

#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub schedule: u64,
    pub roster: u64,
    pub game_stats: u64,
    pub season_stats: u64,
    pub injuries: u64,
    pub depth_chart: u64,
    pub tank01: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            schedule: 60 * 60 * 24,
            roster: 60 * 60 * 24,
            game_stats: 60 * 5,
            season_stats: 60 * 60,
            injuries: 60 * 15,
            depth_chart: 60 * 60 * 6,
            tank01: 60 * 60,
        }
    }
}

// "How much evidence is enough" knobs. None of these are implied by the
// providers, so they stay tunable.
#[derive(Debug, Clone)]
pub struct EvidenceThresholds {
    pub min_trend_games: usize,
    pub min_hit_rate_games: usize,
    pub player_min_pass_attempts: f64,
    pub player_min_carries: f64,
    pub player_min_targets: f64,
    pub max_players: usize,
    pub role_shift_touches: f64,
}

impl Default for EvidenceThresholds {
    fn default() -> Self {
        Self {
            min_trend_games: 4,
            min_hit_rate_games: 1,
            player_min_pass_attempts: 10.0,
            player_min_carries: 5.0,
            player_min_targets: 2.0,
            max_players: 15,
            role_shift_touches: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub min_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub agent_model: String,
    pub master_model: String,
    pub script_model: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub bookie_voice: String,
    pub skeptic_voice: String,
    pub model_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sportradar: ProviderConfig,
    pub tank01: ProviderConfig,
    pub tank01_host: String,
    pub weather: ProviderConfig,
    pub weather_user_agent: String,
    pub model: ModelConfig,
    pub speech: SpeechConfig,
    pub ttls: CacheTtls,
    pub thresholds: EvidenceThresholds,
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub season_start: NaiveDate,
    pub default_team: String,
    pub player_teams: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let sportradar = ProviderConfig {
            base_url: env_string("SPORTRADAR_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SPORTRADAR_BASE.to_string()),
            api_key: env_string("SPORTRADAR_API_KEY"),
            min_delay: Duration::from_millis(env_u64("SPORTRADAR_MIN_DELAY_MS", 3000).min(60_000)),
        };
        let tank01_host =
            env_string("TANK01_HOST").unwrap_or_else(|| DEFAULT_TANK01_HOST.to_string());
        let tank01 = ProviderConfig {
            base_url: env_string("TANK01_BASE_URL").unwrap_or_else(|| format!("https://{tank01_host}")),
            api_key: env_string("TANK01_API_KEY").or_else(|| env_string("RAPIDAPI_KEY")),
            min_delay: Duration::from_millis(env_u64("TANK01_MIN_DELAY_MS", 0).min(60_000)),
        };
        let weather = ProviderConfig {
            base_url: env_string("NWS_BASE_URL").unwrap_or_else(|| DEFAULT_NWS_BASE.to_string()),
            api_key: None,
            min_delay: Duration::ZERO,
        };
        let model = ModelConfig {
            base_url: env_string("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            api_key: env_string("OPENAI_API_KEY"),
            agent_model: env_string("OPENAI_AGENT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            master_model: env_string("OPENAI_MASTER_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            script_model: env_string("OPENAI_SCRIPT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
        };
        let speech = SpeechConfig {
            base_url: env_string("ELEVENLABS_BASE_URL").unwrap_or_else(|| DEFAULT_TTS_BASE.to_string()),
            api_key: env_string("ELEVENLABS_API_KEY"),
            bookie_voice: env_string("ELEVENLABS_BOOKIE_VOICE")
                .unwrap_or_else(|| "pqHfZKP75CvOlQylNhV4".to_string()),
            skeptic_voice: env_string("ELEVENLABS_SKEPTIC_VOICE")
                .unwrap_or_else(|| "29vD33N1CtxCmqQRPOHJ".to_string()),
            model_id: env_string("ELEVENLABS_MODEL").unwrap_or_else(|| "eleven_turbo_v2".to_string()),
        };

        let defaults = CacheTtls::default();
        let ttls = CacheTtls {
            schedule: env_u64("CACHE_TTL_SCHEDULE_SECS", defaults.schedule),
            roster: env_u64("CACHE_TTL_ROSTER_SECS", defaults.roster),
            game_stats: env_u64("CACHE_TTL_GAME_STATS_SECS", defaults.game_stats),
            season_stats: env_u64("CACHE_TTL_SEASON_STATS_SECS", defaults.season_stats),
            injuries: env_u64("CACHE_TTL_INJURIES_SECS", defaults.injuries),
            depth_chart: env_u64("CACHE_TTL_DEPTH_CHART_SECS", defaults.depth_chart),
            tank01: env_u64("CACHE_TTL_TANK01_SECS", defaults.tank01),
        };

        let base = EvidenceThresholds::default();
        let thresholds = EvidenceThresholds {
            min_trend_games: env_usize("MIN_TREND_GAMES", base.min_trend_games).clamp(2, 17),
            min_hit_rate_games: env_usize("MIN_HIT_RATE_GAMES", base.min_hit_rate_games).clamp(1, 17),
            player_min_pass_attempts: env_f64("PLAYER_MIN_PASS_ATTEMPTS", base.player_min_pass_attempts),
            player_min_carries: env_f64("PLAYER_MIN_CARRIES", base.player_min_carries),
            player_min_targets: env_f64("PLAYER_MIN_TARGETS", base.player_min_targets),
            max_players: env_usize("MAX_PACKET_PLAYERS", base.max_players).clamp(1, 60),
            role_shift_touches: env_f64("ROLE_SHIFT_TOUCHES", base.role_shift_touches),
        };

        let season_start = env_string("SEASON_START")
            .unwrap_or_else(|| DEFAULT_SEASON_START.to_string());
        let season_start = NaiveDate::parse_from_str(&season_start, "%Y-%m-%d")
            .with_context(|| format!("invalid SEASON_START={season_start}"))?;

        let mut player_teams = default_player_teams();
        if let Some(path) = env_string("PLAYER_TEAM_MAP") {
            player_teams.extend(load_player_team_map(&PathBuf::from(path))?);
        }

        Ok(Self {
            sportradar,
            tank01,
            tank01_host,
            weather,
            weather_user_agent: env_string("NWS_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_NWS_USER_AGENT.to_string()),
            model,
            speech,
            ttls,
            thresholds,
            data_dir: env_string("PROPDESK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            bind_addr: env_string("PROPDESK_BIND").unwrap_or_else(|| "127.0.0.1:8787".to_string()),
            request_timeout: Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS", 60).clamp(5, 600)),
            season_start,
            default_team: env_string("DEFAULT_TEAM")
                .map(|t| t.to_ascii_uppercase())
                .unwrap_or_else(|| "BAL".to_string()),
            player_teams,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.jsonl")
    }

    pub fn stress_store_path(&self) -> PathBuf {
        self.data_dir.join("stress_tests.json")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio-cache")
    }
}

pub fn default_player_teams() -> HashMap<String, String> {
    [
        ("dak prescott", "DAL"),
        ("lamar jackson", "BAL"),
        ("patrick mahomes", "KC"),
        ("josh allen", "BUF"),
        ("jalen hurts", "PHI"),
        ("joe burrow", "CIN"),
        ("kyren williams", "LAR"),
        ("derrick henry", "BAL"),
        ("ja'marr chase", "CIN"),
        ("jamarr chase", "CIN"),
        ("ceedee lamb", "DAL"),
        ("tyreek hill", "MIA"),
        ("davante adams", "NYJ"),
    ]
    .into_iter()
    .map(|(name, team)| (name.to_string(), team.to_string()))
    .collect()
}

// File format: {"player name": "TEAM", ...}
pub fn load_player_team_map(path: &PathBuf) -> Result<HashMap<String, String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read player team map {}", path.display()))?;
    let parsed: HashMap<String, String> =
        serde_json::from_str(&raw).context("invalid player team map json")?;
    Ok(parsed
        .into_iter()
        .map(|(name, team)| (name.trim().to_lowercase(), team.trim().to_ascii_uppercase()))
        .collect())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}
