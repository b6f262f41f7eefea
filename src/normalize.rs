use serde_json::Value;

/// Walks a dotted path (`record.passing.attempts`) and returns the leaf, or
/// `None` on any missing or non-object segment.
pub fn value_at<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Numeric leaf at `path`. Providers send numbers as strings often enough
/// that both are accepted; anything else is unknown.
pub fn stat(source: &Value, path: &str) -> Option<f64> {
    value_at(source, path).and_then(as_number)
}

pub fn str_at<'a>(source: &'a Value, path: &str) -> Option<&'a str> {
    value_at(source, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `n / d` to one decimal; unknown when either side is missing or `d == 0`.
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let ratio = n / d;
    ratio.is_finite().then(|| round1(ratio))
}

/// Percentage form of [`safe_ratio`], for rates and shares.
pub fn safe_rate(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let rate = n / d * 100.0;
    rate.is_finite().then(|| round1(rate))
}

/// 1.0 when the season long crosses `threshold`, 0.0 when it doesn't.
pub fn explosive_indicator(longest: Option<f64>, threshold: f64) -> Option<f64> {
    longest.map(|long| if long >= threshold { 1.0 } else { 0.0 })
}

/// Dotted path of every null leaf. Arrays are not descended; an empty
/// top-level `players` list is reported as `players (empty)`.
pub fn missing_paths(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_missing(value, "", &mut out);
    out
}

fn collect_missing(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Null => {
            if !prefix.is_empty() {
                out.push(prefix.to_string());
            }
        }
        Value::Array(items) => {
            if items.is_empty() && prefix == "players" {
                out.push("players (empty)".to_string());
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                if prefix.is_empty() && key == "missing_data" {
                    continue;
                }
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_missing(child, &path, out);
            }
        }
        _ => {}
    }
}

pub fn normalize_alias(alias: &str) -> String {
    alias.trim().to_ascii_uppercase()
}

pub fn normalize_position(pos: &str) -> String {
    let trimmed = pos.trim();
    if trimmed.is_empty() {
        "UNK".to_string()
    } else {
        trimmed.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ratio_is_null_for_zero_missing_or_non_numeric_denominator() {
        assert_eq!(safe_ratio(Some(300.0), Some(0.0)), None);
        assert_eq!(safe_ratio(Some(300.0), None), None);
        let stats = json!({"passing": {"attempts": "n/a", "yards": 300}});
        assert_eq!(
            safe_ratio(stat(&stats, "passing.yards"), stat(&stats, "passing.attempts")),
            None
        );
        assert_eq!(safe_ratio(Some(300.0), Some(41.0)), Some(7.3));
    }

    #[test]
    fn rate_is_percentage_with_same_null_rules() {
        assert_eq!(safe_rate(Some(5.0), Some(12.0)), Some(41.7));
        assert_eq!(safe_rate(None, Some(12.0)), None);
        assert_eq!(safe_rate(Some(5.0), Some(0.0)), None);
    }

    #[test]
    fn extractor_handles_strings_and_mismatched_segments() {
        let stats = json!({"record": {"games_played": "13", "passing": 7}});
        assert_eq!(stat(&stats, "record.games_played"), Some(13.0));
        assert_eq!(stat(&stats, "record.passing.attempts"), None);
        assert_eq!(stat(&stats, "nope.deeper"), None);
        assert_eq!(stat(&Value::Null, "record"), None);
    }

    #[test]
    fn explosive_indicator_is_unknown_without_long() {
        assert_eq!(explosive_indicator(None, 20.0), None);
        assert_eq!(explosive_indicator(Some(19.0), 20.0), Some(0.0));
        assert_eq!(explosive_indicator(Some(64.0), 20.0), Some(1.0));
    }

    #[test]
    fn missing_paths_reports_null_leaves_and_empty_players() {
        let packet = json!({
            "meta": {"opponent": null, "team": "BAL"},
            "team_offense": {"yards_per_dropback": null, "yards_per_carry": 4.4},
            "players": [],
            "missing_data": []
        });
        let missing = missing_paths(&packet);
        assert!(missing.contains(&"meta.opponent".to_string()));
        assert!(missing.contains(&"team_offense.yards_per_dropback".to_string()));
        assert!(missing.contains(&"players (empty)".to_string()));
        assert_eq!(missing.len(), 3);
    }
}
