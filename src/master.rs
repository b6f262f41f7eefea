use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::context::{BetContext, PropType, YardageFamily};
use crate::ledger::Ledger;
use crate::llm::{CompletionModel, CompletionRequest, ResponseFormat};
use crate::normalize::{round1, stat, value_at};

const MASTER_SYSTEM_PROMPT: &str = r#"You are a SPORTS DATA ANALYST synthesizing several evidence sources into one statistical projection.
This is a data analysis tool, not wagering advice. Never tell the user what to bet or whether to bet.

Confidence reflects data quality and signal strength:
- 0.70-1.00: strong history, clear trend, consistent performance
- 0.50-0.69: moderate support with some variability
- 0.30-0.49: limited or conflicting data
- 0.00-0.29: not enough data for a meaningful projection

Inputs: bet_context (player, statistical category, reference line), scout_packet (history, efficiency, trend, opponent), insider_analysis (availability, role), meteorologist_report (environment) and edge_signals (precomputed anchors).

Protocol:
1. Compare the historical average to the line and note the percentage gap, floor and ceiling.
2. Compare the last three games to the season average.
3. Weigh availability, opponent defensive tier (Elite/Average/Vulnerable) and environment.
4. Use edge_signals.hit_rate_over and suggested_confidence_floor as calibration anchors.
5. "Above Line" when most factors support exceeding the value, "Below Line" when most support falling short, "Inconclusive" when they cancel.
6. Cite the specific statistics behind each factor and say which way each pulled.

Never say "bet", "wager", "play" or "fade". confidence_score must be a decimal between 0.00 and 1.00."#;

const CRITICAL_DATA_MISSING: &str = "Critical Data Missing: Neither Scout nor Insider provided data.";
const ENGINE_FAILURE: &str = "System Error: Analysis engine failed to generate projection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    #[serde(rename = "Above Line")]
    AboveLine,
    #[serde(rename = "Below Line")]
    BelowLine,
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionCore {
    pub projection: Projection,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalLean {
    SupportsAbove,
    Neutral,
    SupportsBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLean {
    Favorable,
    Neutral,
    Limiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSources {
    pub historical_data: HistoricalLean,
    pub availability_data: ContextLean,
    pub environmental_data: ContextLean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterPacket {
    pub analysis: ProjectionCore,
    pub analysis_summary: Vec<String>,
    pub data_sources: DataSources,
    pub key_factors: Vec<String>,
    pub data_limitations: Vec<String>,
    pub confidence_explanation: String,
}

impl MasterPacket {
    pub fn fallback(reason: &str) -> Self {
        Self {
            analysis: ProjectionCore {
                projection: Projection::Inconclusive,
                confidence_score: 0.0,
            },
            analysis_summary: vec!["Automated System Response".to_string(), reason.to_string()],
            data_sources: DataSources {
                historical_data: HistoricalLean::Neutral,
                availability_data: ContextLean::Neutral,
                environmental_data: ContextLean::Neutral,
            },
            key_factors: vec![reason.to_string()],
            data_limitations: vec!["Unable to complete full analysis.".to_string()],
            confidence_explanation: "Insufficient data for projection.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefenseTier {
    Elite,
    Average,
    Vulnerable,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSignals {
    pub prop_line: f64,
    pub player_average: Option<f64>,
    pub average_vs_line_pct: Option<String>,
    pub hit_rate_over: Option<String>,
    pub volume_floor: Option<f64>,
    pub volume_ceiling: Option<f64>,
    pub trend_direction: Option<String>,
    pub opponent_defense: DefenseTier,
    pub suggested_confidence_floor: Option<u32>,
}

/// `> 1` is read as a percentage; the result always lands in [0, 1].
pub fn normalize_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

pub fn confidence_floor(hit_rate: f64) -> u32 {
    if hit_rate >= 0.6 {
        60
    } else if hit_rate >= 0.4 {
        45
    } else {
        30
    }
}

/// Opponent tier from the allowed metric that matters for this prop.
pub fn defense_tier(scout: &Value, prop: Option<PropType>) -> DefenseTier {
    let rushing = prop.is_some_and(|p| p.yardage_family() == YardageFamily::Rushing);
    let (metric, elite_below, vulnerable_above) = if rushing {
        (stat(scout, "opponent_defense.yards_per_carry_allowed"), 3.9, 4.6)
    } else {
        (stat(scout, "opponent_defense.yards_per_dropback_allowed"), 6.0, 7.0)
    };
    match metric {
        Some(v) if v < elite_below => DefenseTier::Elite,
        Some(v) if v > vulnerable_above => DefenseTier::Vulnerable,
        Some(_) => DefenseTier::Average,
        None => DefenseTier::Unknown,
    }
}

/// Deterministic anchors from the scout packet's per-game prop values.
/// `None` without a line or without enriched player analysis.
pub fn edge_signals(bet: &BetContext, scout: &Value, min_hit_rate_games: usize) -> Option<EdgeSignals> {
    let line = bet.prop_line?;
    let analysis = value_at(scout, "player_analysis").filter(|v| v.is_object())?;
    let values: Vec<f64> = analysis
        .get("prop_values")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default();

    let average = (!values.is_empty()).then(|| round1(values.iter().sum::<f64>() / values.len() as f64));
    let average_vs_line_pct = average
        .filter(|_| line != 0.0)
        .map(|avg| format!("{:.1}%", (avg - line) / line * 100.0));

    let (hit_rate_over, floor) = if values.len() >= min_hit_rate_games.max(1) {
        let hits = values.iter().filter(|v| **v > line).count();
        let rate = hits as f64 / values.len() as f64;
        (
            Some(format!("{hits}/{} ({:.0}%)", values.len(), rate * 100.0)),
            Some(confidence_floor(rate)),
        )
    } else {
        (None, None)
    };

    let prop = analysis
        .get("prop_type")
        .cloned()
        .and_then(|v| serde_json::from_value::<PropType>(v).ok())
        .or_else(|| PropType::from_label(&bet.prop_type));

    Some(EdgeSignals {
        prop_line: line,
        player_average: average,
        average_vs_line_pct,
        hit_rate_over,
        volume_floor: stat(analysis, "volume.floor"),
        volume_ceiling: stat(analysis, "volume.ceiling"),
        trend_direction: value_at(analysis, "trend.direction")
            .and_then(Value::as_str)
            .map(str::to_string),
        opponent_defense: defense_tier(scout, prop),
        suggested_confidence_floor: floor,
    })
}

pub fn master_schema() -> Value {
    let lean = |values: &[&str]| json!({"type": "string", "enum": values});
    let strings = json!({"type": "array", "items": {"type": "string"}});
    json!({
        "type": "object",
        "properties": {
            "analysis": {
                "type": "object",
                "properties": {
                    "projection": lean(&["Above Line", "Below Line", "Inconclusive"]),
                    "confidence_score": {"type": "number"}
                },
                "required": ["projection", "confidence_score"],
                "additionalProperties": false
            },
            "analysis_summary": strings,
            "data_sources": {
                "type": "object",
                "properties": {
                    "historical_data": lean(&["supports_above", "neutral", "supports_below"]),
                    "availability_data": lean(&["favorable", "neutral", "limiting"]),
                    "environmental_data": lean(&["favorable", "neutral", "limiting"])
                },
                "required": ["historical_data", "availability_data", "environmental_data"],
                "additionalProperties": false
            },
            "key_factors": strings,
            "data_limitations": strings,
            "confidence_explanation": {"type": "string"}
        },
        "required": [
            "analysis", "analysis_summary", "data_sources",
            "key_factors", "data_limitations", "confidence_explanation"
        ],
        "additionalProperties": false
    })
}

/// Evidence handed to the synthesizer. `insider` is the insider judgment
/// when one exists, otherwise the raw packet.
#[derive(Debug, Clone, Copy)]
pub struct MasterInputs<'a> {
    pub bet: &'a BetContext,
    pub scout: Option<&'a Value>,
    pub insider: Option<&'a Value>,
    pub meteorologist: Option<&'a Value>,
}

pub struct Synthesizer<'a> {
    model: &'a dyn CompletionModel,
    model_name: &'a str,
    ledger: Option<&'a Ledger>,
    min_hit_rate_games: usize,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        model: &'a dyn CompletionModel,
        model_name: &'a str,
        ledger: Option<&'a Ledger>,
        min_hit_rate_games: usize,
    ) -> Self {
        Self {
            model,
            model_name,
            ledger,
            min_hit_rate_games,
        }
    }

    pub fn run(&self, inputs: MasterInputs<'_>) -> MasterPacket {
        let present = |v: Option<&Value>| v.is_some_and(|v| !v.is_null());
        if !present(inputs.scout) && !present(inputs.insider) {
            warn!(player = %inputs.bet.player_name, "no scout or insider evidence; skipping model");
            return MasterPacket::fallback(CRITICAL_DATA_MISSING);
        }

        let edge = inputs
            .scout
            .and_then(|scout| edge_signals(inputs.bet, scout, self.min_hit_rate_games));
        if let Some(edge) = &edge {
            info!(
                hit_rate = edge.hit_rate_over.as_deref().unwrap_or("n/a"),
                tier = ?edge.opponent_defense,
                "edge signals"
            );
        }

        let payload = json!({
            "bet_context": inputs.bet,
            "scout_packet": inputs.scout,
            "insider_analysis": inputs.insider,
            "meteorologist_report": inputs.meteorologist,
            "edge_signals": edge,
        });

        match self.decide(&payload) {
            Some(packet) => {
                if let Some(ledger) = self.ledger {
                    ledger.record(inputs.bet, &packet.analysis);
                }
                packet
            }
            None => MasterPacket::fallback(ENGINE_FAILURE),
        }
    }

    fn decide(&self, payload: &Value) -> Option<MasterPacket> {
        let pretty = serde_json::to_string_pretty(payload).ok()?;
        let request = CompletionRequest {
            model: self.model_name.to_string(),
            system: MASTER_SYSTEM_PROMPT.to_string(),
            user: format!("Analyze this Packet Set and provide a Final Decision:\n{pretty}"),
            format: ResponseFormat::Schema {
                name: "master_analysis",
                schema: master_schema(),
            },
            temperature: None,
        };
        let parsed = self
            .model
            .complete_json(&request)
            .and_then(|v| serde_json::from_value::<MasterPacket>(v).map_err(Into::into));
        match parsed {
            Ok(mut packet) => {
                packet.analysis.confidence_score = normalize_confidence(packet.analysis.confidence_score);
                info!(
                    projection = ?packet.analysis.projection,
                    confidence = packet.analysis.confidence_score,
                    "master decision"
                );
                Some(packet)
            }
            Err(err) => {
                warn!(error = %err, "master decision failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;

    struct Counting {
        reply: String,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CompletionModel for Counting {
        fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn reply(confidence: f64) -> String {
        json!({
            "analysis": {"projection": "Above Line", "confidence_score": confidence},
            "analysis_summary": ["avg above line"],
            "data_sources": {"historical_data": "supports_above", "availability_data": "neutral", "environmental_data": "favorable"},
            "key_factors": ["4/5 over"],
            "data_limitations": [],
            "confidence_explanation": "consistent"
        })
        .to_string()
    }

    fn bet() -> BetContext {
        BetContext::from_query("Lamar Jackson", "Over 220.5 Pass Yards", None)
    }

    fn scout() -> Value {
        json!({
            "opponent_defense": {"yards_per_dropback_allowed": 7.6, "yards_per_carry_allowed": 4.1},
            "player_analysis": {
                "prop_type": "pass_yards",
                "prop_values": [250.0, 180.0, 230.0, 290.0, 205.0],
                "volume": {"floor": 180.0, "ceiling": 290.0},
                "trend": {"direction": "STABLE"}
            }
        })
    }

    #[test]
    fn confidence_normalization() {
        assert_eq!(normalize_confidence(85.0), 0.85);
        assert_eq!(normalize_confidence(0.85), 0.85);
        assert_eq!(normalize_confidence(1.0), 1.0);
        assert_eq!(normalize_confidence(250.0), 1.0);
        assert_eq!(normalize_confidence(-0.3), 0.0);
        assert_eq!(normalize_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn no_evidence_never_calls_the_model() {
        let model = Counting::new(&reply(0.7));
        let synth = Synthesizer::new(&model, "m", None, 1);
        let bet = bet();
        let packet = synth.run(MasterInputs {
            bet: &bet,
            scout: None,
            insider: Some(&Value::Null),
            meteorologist: Some(&json!({"environment": {}})),
        });
        assert_eq!(packet, MasterPacket::fallback(CRITICAL_DATA_MISSING));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn percentage_confidence_is_rescaled() {
        let model = Counting::new(&reply(85.0));
        let synth = Synthesizer::new(&model, "m", None, 1);
        let bet = bet();
        let scout = scout();
        let packet = synth.run(MasterInputs {
            bet: &bet,
            scout: Some(&scout),
            insider: None,
            meteorologist: None,
        });
        assert_eq!(packet.analysis.projection, Projection::AboveLine);
        assert_eq!(packet.analysis.confidence_score, 0.85);
    }

    #[test]
    fn malformed_reply_falls_back() {
        let model = Counting::new("{\"analysis\": 3}");
        let synth = Synthesizer::new(&model, "m", None, 1);
        let bet = bet();
        let scout = scout();
        let packet = synth.run(MasterInputs {
            bet: &bet,
            scout: Some(&scout),
            insider: None,
            meteorologist: None,
        });
        assert_eq!(packet, MasterPacket::fallback(ENGINE_FAILURE));
    }

    #[test]
    fn edge_signals_from_prop_history() {
        let edge = edge_signals(&bet(), &scout(), 1).expect("signals");
        assert_eq!(edge.player_average, Some(231.0));
        assert_eq!(edge.average_vs_line_pct.as_deref(), Some("4.8%"));
        assert_eq!(edge.hit_rate_over.as_deref(), Some("3/5 (60%)"));
        assert_eq!(edge.suggested_confidence_floor, Some(60));
        assert_eq!(edge.volume_floor, Some(180.0));
        assert_eq!(edge.trend_direction.as_deref(), Some("STABLE"));
        assert_eq!(edge.opponent_defense, DefenseTier::Vulnerable);
    }

    #[test]
    fn thin_history_omits_hit_rate() {
        let edge = edge_signals(&bet(), &scout(), 8).expect("signals");
        assert!(edge.hit_rate_over.is_none());
        assert!(edge.suggested_confidence_floor.is_none());
        assert!(edge_signals(&bet(), &json!({"player_analysis": null}), 1).is_none());
    }

    #[test]
    fn hit_rate_floors() {
        assert_eq!(confidence_floor(0.6), 60);
        assert_eq!(confidence_floor(0.4), 45);
        assert_eq!(confidence_floor(0.39), 30);
    }
}
