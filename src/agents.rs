use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::llm::{CompletionModel, CompletionRequest, ResponseFormat};
use crate::meteorologist::MeteorologistReport;

const SCOUT_SYSTEM_PROMPT: &str = r#"You are the "Scout" agent of a football player-prop analysis desk.
Read the structured Scout Packet (player, prop line, team, opponent, season stats, recent games) and give a sharp, data-driven read.

Persona: analytical, professional, concise. Prefer efficiency, leverage and mismatch metrics over box-score totals. Name the risks honestly.

Return a JSON object:
{
  "verdict": "OVER" | "UNDER" | "PASS",
  "confidence": number,   // 0-10, 10 is highest
  "analysis": string,     // 2-3 sentences citing the packet
  "key_factors": string[] // 3 bullets with the strongest evidence
}

Guidelines:
1. Compare recent usage and efficiency against the exact line value.
2. Read the opponent's allowed metrics (yards_per_dropback_allowed etc.) and pass_funnel_flag.
3. Usage is king: weight target and carry share heavily.
4. Be skeptical: thin samples in the reliability block mean lower confidence or PASS.
5. Nulls are unknowns; only mention them when they change the decision."#;

const INSIDER_SYSTEM_PROMPT: &str = r#"You are the Insider agent. You assess availability, role stability and hidden risk.
You never create upside. You only confirm stability or flag risk.

Input: an Insider Packet with official injury data, depth charts, usage signals and a precomputed volatility block.
Output: a strict assessment of whether the player will play their normal role.
If unsure: lower confidence, raise a risk flag, say "uncertain".
No wagering advice, no efficiency metrics, no weather predictions.

Key logic:
- injury_status other than healthy means risk is present.
- days_rest below 6 means fatigue risk.
- a backup in the role means high volatility."#;

const WEATHER_SYSTEM_PROMPT: &str = r#"You are the Meteorologist agent. Translate the game environment into football impact.
Score each impact between 0 and 1 (0 = no effect, 1 = severe). Indoor games score near zero everywhere.
Wind above 15 mph hurts passing and kicking; rain and snow raise ball-security risk and favor the run.
Write 4-7 short bullets for the user. Be explicit about forecast age and any assumptions."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Over,
    Under,
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutJudgment {
    pub verdict: Verdict,
    pub confidence: f64,
    pub analysis: String,
    #[serde(default)]
    pub key_factors: Vec<String>,
}

impl ScoutJudgment {
    pub fn fallback() -> Self {
        Self {
            verdict: Verdict::Pass,
            confidence: 0.0,
            analysis: "Failed to generate analysis due to technical error.".to_string(),
            key_factors: vec!["System Error".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityOverview {
    pub qb_status: String,
    pub skill_positions_status: String,
    pub offensive_line_status: String,
    pub defensive_availability_status: String,
    pub overall_availability_grade: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPlayerStatus {
    pub player_id: String,
    pub name: String,
    pub position: String,
    pub availability_status: String,
    pub expected_snap_level: String,
    pub primary_limitation: String,
    pub replacement_player_id: String,
    pub risk_flag: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChange {
    pub player_id: String,
    pub change_type: String,
    pub driver: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleStabilitySummary {
    pub overall_role_stability: String,
    pub committee_risk_present: bool,
    pub recent_role_changes_detected: bool,
    pub trust_distribution_shift: bool,
    pub role_changes: Vec<RoleChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementRisk {
    pub critical_replacements: Vec<String>,
    pub replacement_quality: String,
    pub positional_thinness_flags: Vec<String>,
    pub cascade_risk_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffensiveLineImpact {
    pub continuity_grade: String,
    pub protection_risk: bool,
    pub run_blocking_risk: bool,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefensiveAvailabilityNotes {
    pub cb1_status: String,
    pub edge_rusher_status: String,
    pub lb_run_def_status: String,
    pub safety_deep_role_status: String,
    pub impact_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlags {
    pub late_injury_uncertainty: bool,
    pub snap_limit_risk: bool,
    pub committee_usage_risk: bool,
    pub depth_instability_risk: bool,
    pub ol_disruption_risk: bool,
    pub conflicting_reports_risk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    None,
    ReduceSlightly,
    ReduceSignificantly,
}

impl Adjustment {
    /// Points taken off the availability confidence shown to the user.
    pub fn penalty(self) -> i64 {
        match self {
            Adjustment::None => 0,
            Adjustment::ReduceSlightly => 10,
            Adjustment::ReduceSignificantly => 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceAdjustment {
    pub adjustment: Adjustment,
    pub reason_codes: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderDataQuality {
    pub missing_fields: Vec<String>,
    pub stale_data_present: bool,
    pub conflicting_reports_present: bool,
    pub last_updated_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderAnalysis {
    pub availability_overview: AvailabilityOverview,
    pub key_player_statuses: Vec<KeyPlayerStatus>,
    pub role_stability_summary: RoleStabilitySummary,
    pub replacement_risk_assessment: ReplacementRisk,
    pub offensive_line_impact: OffensiveLineImpact,
    pub defensive_availability_notes: DefensiveAvailabilityNotes,
    pub risk_flags: RiskFlags,
    pub confidence_adjustment: ConfidenceAdjustment,
    pub data_quality: InsiderDataQuality,
    pub insider_brief: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactScores {
    pub passing_penalty: f64,
    pub rushing_boost: f64,
    pub kicking_penalty: f64,
    pub ball_security_risk: f64,
    pub visibility_risk: f64,
    pub pace_slowdown_risk: f64,
}

impl ImpactScores {
    fn clamped(self) -> Self {
        let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            passing_penalty: unit(self.passing_penalty),
            rushing_boost: unit(self.rushing_boost),
            kicking_penalty: unit(self.kicking_penalty),
            ball_security_risk: unit(self.ball_security_risk),
            visibility_risk: unit(self.visibility_risk),
            pace_slowdown_risk: unit(self.pace_slowdown_risk),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherDataQuality {
    pub forecast_age: String,
    pub missing_fields: Vec<String>,
    pub assumptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherImpact {
    pub user_weather_writeup: Vec<String>,
    pub impact_scores: ImpactScores,
    pub overall_confidence: OverallConfidence,
    pub confidence_drivers: Vec<String>,
    pub data_quality: WeatherDataQuality,
}

/// Strict-mode object: every listed property is required and nothing else
/// is allowed.
fn strict_object(properties: Value) -> Value {
    let required: Vec<Value> = properties
        .as_object()
        .map(|props| props.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn one_of(values: &[&str]) -> Value {
    json!({"type": "string", "enum": values})
}

fn strings() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

fn boolean() -> Value {
    json!({"type": "boolean"})
}

fn text() -> Value {
    json!({"type": "string"})
}

fn number() -> Value {
    json!({"type": "number"})
}

fn array_of(item: Value) -> Value {
    json!({"type": "array", "items": item})
}

fn properties(entries: &[(&str, Value)]) -> Value {
    let map: Map<String, Value> = entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();
    Value::Object(map)
}

pub fn insider_schema() -> Value {
    let risk = || one_of(&["Low", "Medium", "High"]);
    strict_object(properties(&[
        (
            "availability_overview",
            strict_object(properties(&[
                ("qb_status", one_of(&["full", "limited", "out", "uncertain"])),
                ("skill_positions_status", one_of(&["stable", "mixed", "unstable"])),
                ("offensive_line_status", one_of(&["stable", "degraded", "unstable"])),
                ("defensive_availability_status", one_of(&["stable", "degraded"])),
                ("overall_availability_grade", one_of(&["Good", "Caution", "Risk"])),
            ])),
        ),
        (
            "key_player_statuses",
            array_of(strict_object(properties(&[
                ("player_id", text()),
                ("name", text()),
                ("position", text()),
                ("availability_status", text()),
                ("expected_snap_level", one_of(&["normal", "reduced", "emergency", "unknown"])),
                ("primary_limitation", text()),
                ("replacement_player_id", text()),
                ("risk_flag", risk()),
                ("notes", text()),
            ]))),
        ),
        (
            "role_stability_summary",
            strict_object(properties(&[
                ("overall_role_stability", one_of(&["Stable", "Mixed", "Volatile"])),
                ("committee_risk_present", boolean()),
                ("recent_role_changes_detected", boolean()),
                ("trust_distribution_shift", boolean()),
                (
                    "role_changes",
                    array_of(strict_object(properties(&[
                        ("player_id", text()),
                        ("change_type", one_of(&["expanded", "reduced", "uncertain"])),
                        ("driver", one_of(&["injury", "depth_chart", "coach_decision"])),
                        ("confidence", number()),
                    ]))),
                ),
            ])),
        ),
        (
            "replacement_risk_assessment",
            strict_object(properties(&[
                ("critical_replacements", strings()),
                ("replacement_quality", one_of(&["Turnstile", "Weak", "Adequate", "Good", "Unknown"])),
                ("positional_thinness_flags", strings()),
                ("cascade_risk_present", boolean()),
            ])),
        ),
        (
            "offensive_line_impact",
            strict_object(properties(&[
                ("continuity_grade", one_of(&["High", "Medium", "Low"])),
                ("protection_risk", boolean()),
                ("run_blocking_risk", boolean()),
                ("notes", text()),
            ])),
        ),
        (
            "defensive_availability_notes",
            strict_object(properties(&[
                ("cb1_status", text()),
                ("edge_rusher_status", text()),
                ("lb_run_def_status", text()),
                ("safety_deep_role_status", text()),
                ("impact_level", risk()),
            ])),
        ),
        (
            "risk_flags",
            strict_object(properties(&[
                ("late_injury_uncertainty", boolean()),
                ("snap_limit_risk", boolean()),
                ("committee_usage_risk", boolean()),
                ("depth_instability_risk", boolean()),
                ("ol_disruption_risk", boolean()),
                ("conflicting_reports_risk", boolean()),
            ])),
        ),
        (
            "confidence_adjustment",
            strict_object(properties(&[
                ("adjustment", one_of(&["none", "reduce_slightly", "reduce_significantly"])),
                ("reason_codes", strings()),
                ("summary", text()),
            ])),
        ),
        (
            "data_quality",
            strict_object(properties(&[
                ("missing_fields", strings()),
                ("stale_data_present", boolean()),
                ("conflicting_reports_present", boolean()),
                ("last_updated_timestamp", text()),
            ])),
        ),
        ("insider_brief", strings()),
    ]))
}

pub fn weather_schema() -> Value {
    strict_object(properties(&[
        ("user_weather_writeup", strings()),
        (
            "impact_scores",
            strict_object(properties(&[
                ("passing_penalty", number()),
                ("rushing_boost", number()),
                ("kicking_penalty", number()),
                ("ball_security_risk", number()),
                ("visibility_risk", number()),
                ("pace_slowdown_risk", number()),
            ])),
        ),
        ("overall_confidence", one_of(&["High", "Medium", "Low"])),
        ("confidence_drivers", strings()),
        (
            "data_quality",
            strict_object(properties(&[
                ("forecast_age", text()),
                ("missing_fields", strings()),
                ("assumptions", strings()),
            ])),
        ),
    ]))
}

/// Per-packet interpretation calls. Each returns a fixed fallback (or
/// `None`) instead of an error.
pub struct AnalysisAgents<'a> {
    model: &'a dyn CompletionModel,
    model_name: &'a str,
}

impl<'a> AnalysisAgents<'a> {
    pub fn new(model: &'a dyn CompletionModel, model_name: &'a str) -> Self {
        Self { model, model_name }
    }

    fn request(&self, system: &str, user: String, format: ResponseFormat) -> CompletionRequest {
        CompletionRequest {
            model: self.model_name.to_string(),
            system: system.to_string(),
            user,
            format,
            temperature: None,
        }
    }

    pub fn scout(&self, packet: &Value) -> ScoutJudgment {
        let req = self.request(SCOUT_SYSTEM_PROMPT, packet.to_string(), ResponseFormat::JsonObject);
        let parsed = self
            .model
            .complete_json(&req)
            .and_then(|v| serde_json::from_value::<ScoutJudgment>(v).map_err(Into::into));
        match parsed {
            Ok(mut judgment) => {
                judgment.confidence = if judgment.confidence.is_finite() {
                    judgment.confidence.clamp(0.0, 10.0)
                } else {
                    0.0
                };
                info!(verdict = ?judgment.verdict, confidence = judgment.confidence, "scout judgment");
                judgment
            }
            Err(err) => {
                warn!(error = %err, "scout agent failed");
                ScoutJudgment::fallback()
            }
        }
    }

    pub fn insider(&self, packet: &Value) -> Option<InsiderAnalysis> {
        let req = self.request(
            INSIDER_SYSTEM_PROMPT,
            format!("Analyze this Insider Packet:\n{packet}"),
            ResponseFormat::Schema {
                name: "insider_analysis",
                schema: insider_schema(),
            },
        );
        let parsed = self
            .model
            .complete_json(&req)
            .and_then(|v| serde_json::from_value::<InsiderAnalysis>(v).map_err(Into::into));
        parsed
            .map_err(|err| warn!(error = %err, "insider agent failed"))
            .ok()
    }

    pub fn weather(&self, report: &MeteorologistReport) -> Option<WeatherImpact> {
        let environment = json!({
            "type": report.environment.roof,
            "field": report.environment.field,
            "summary": report.environment.weather_summary,
            "details": report.environment.details,
        });
        let user = format!(
            "Game Context: {}\nEnvironment Data: {}",
            report.game_line(),
            environment
        );
        let req = self.request(
            WEATHER_SYSTEM_PROMPT,
            user,
            ResponseFormat::Schema {
                name: "weather_impact_analysis",
                schema: weather_schema(),
            },
        );
        let parsed = self
            .model
            .complete_json(&req)
            .and_then(|v| serde_json::from_value::<WeatherImpact>(v).map_err(Into::into));
        match parsed {
            Ok(mut impact) => {
                impact.impact_scores = impact.impact_scores.clamped();
                Some(impact)
            }
            Err(err) => {
                warn!(error = %err, "meteorologist agent failed");
                None
            }
        }
    }
}
