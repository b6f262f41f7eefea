use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::gateway::{RateLimitedClient, TtlCache};

pub const PROVIDER: &str = "nws";

const GRID_TTL_SECS: u64 = 24 * 3600;
const FORECAST_TTL_SECS: u64 = 1800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    #[serde(default)]
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub temperature_unit: Option<String>,
    #[serde(default)]
    pub wind_speed: Option<String>,
    #[serde(default)]
    pub short_forecast: Option<String>,
    #[serde(default)]
    pub detailed_forecast: Option<String>,
}

impl ForecastPeriod {
    pub fn summary(&self) -> String {
        let short = self.short_forecast.as_deref().unwrap_or("Unknown");
        match self.temperature {
            Some(t) => format!("{short}, {t}°{}", self.temperature_unit.as_deref().unwrap_or("F")),
            None => short.to_string(),
        }
    }

    pub fn details(&self) -> String {
        format!(
            "{} Wind: {}",
            self.detailed_forecast.as_deref().unwrap_or(""),
            self.wind_speed.as_deref().unwrap_or("unknown")
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub office: String,
    pub x: i64,
    pub y: i64,
}

/// National Weather Service client: point -> grid -> forecast periods.
pub struct WeatherService {
    client: Arc<RateLimitedClient>,
    cache: Arc<TtlCache>,
    base_url: String,
    user_agent: String,
}

impl WeatherService {
    pub fn new(
        client: Arc<RateLimitedClient>,
        cache: Arc<TtlCache>,
        config: &ProviderConfig,
        user_agent: &str,
    ) -> Self {
        Self {
            client,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    fn get(&self, url: &str) -> Result<Value, FetchError> {
        let headers = [
            ("User-Agent", self.user_agent.as_str()),
            ("Accept", "application/geo+json"),
        ];
        self.client.fetch_json(url, &headers)
    }

    pub fn grid_point(&self, lat: f64, long: f64) -> Result<Option<GridPoint>, FetchError> {
        let key = format!("nws_points_{lat:.4}_{long:.4}");
        let url = format!("{}/points/{lat:.4},{long:.4}", self.base_url);
        let body = self.cache.cached(&key, GRID_TTL_SECS, || self.get(&url))?;
        Ok(parse_grid_point(&body))
    }

    pub fn forecast_periods(&self, grid: &GridPoint) -> Result<Vec<ForecastPeriod>, FetchError> {
        let key = format!("nws_forecast_{}_{}_{}", grid.office, grid.x, grid.y);
        let url = format!(
            "{}/gridpoints/{}/{},{}/forecast",
            self.base_url, grid.office, grid.x, grid.y
        );
        let body = self.cache.cached(&key, FORECAST_TTL_SECS, || self.get(&url))?;
        Ok(parse_forecast_periods(&body))
    }

    /// Forecast period covering `kickoff`, or the nearest one. `Ok(None)`
    /// when the location or forecast can't be resolved.
    pub fn forecast_at(
        &self,
        lat: f64,
        long: f64,
        kickoff: DateTime<Utc>,
    ) -> Result<Option<ForecastPeriod>, FetchError> {
        let Some(grid) = self.grid_point(lat, long)? else {
            warn!(lat, long, "nws returned no grid for point");
            return Ok(None);
        };
        let periods = self.forecast_periods(&grid)?;
        let period = select_period(&periods, kickoff).cloned();
        info!(
            office = %grid.office,
            periods = periods.len(),
            found = period.is_some(),
            "nws forecast resolved"
        );
        Ok(period)
    }
}

pub fn parse_grid_point(body: &Value) -> Option<GridPoint> {
    let props = body.get("properties")?;
    Some(GridPoint {
        office: props.get("gridId")?.as_str()?.to_string(),
        x: props.get("gridX")?.as_i64()?,
        y: props.get("gridY")?.as_i64()?,
    })
}

/// Malformed periods are skipped rather than failing the whole forecast.
pub fn parse_forecast_periods(body: &Value) -> Vec<ForecastPeriod> {
    body.get("properties")
        .and_then(|p| p.get("periods"))
        .and_then(Value::as_array)
        .map(|periods| {
            periods
                .iter()
                .filter_map(|p| serde_json::from_value(p.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn select_period(periods: &[ForecastPeriod], kickoff: DateTime<Utc>) -> Option<&ForecastPeriod> {
    periods
        .iter()
        .find(|p| p.start_time <= kickoff && kickoff < p.end_time)
        .or_else(|| {
            periods.iter().min_by_key(|p| {
                let to_start = (p.start_time - kickoff).num_seconds().abs();
                let to_end = (p.end_time - kickoff).num_seconds().abs();
                to_start.min(to_end)
            })
        })
}
