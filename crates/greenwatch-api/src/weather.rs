//! Proxy for the third-party forecast provider.
//!
//! The provider speaks the WeatherAPI `forecast.json` format; clients only
//! ever see the normalized [`WeatherReport`].

use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::{debug, warn};

use greenwatch_types::api::{CurrentWeather, ForecastDay, WeatherLocation, WeatherReport};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const FORECAST_DAYS: &str = "3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub async fn forecast(&self, location: &str) -> Result<WeatherReport, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::Upstream("no weather API key configured".into()));
        }

        let resp = self
            .http
            .get(format!("{}/forecast.json", self.base_url))
            .query(&[("key", self.api_key.as_str()), ("q", location), ("days", FORECAST_DAYS)])
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("status {}: {}", status, body)));
        }

        let forecast: ProviderForecast = resp
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("unexpected payload: {}", e)))?;

        debug!("Forecast fetched for {}", location);
        Ok(forecast.normalize())
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

/// GET /weather?location=...
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> ApiResult<Json<WeatherReport>> {
    let location = query
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::Validation("location is required".into()))?;

    match state.weather.forecast(location).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            warn!("Weather lookup for '{}' failed", location);
            Err(e)
        }
    }
}

// -- Provider payload --

#[derive(Debug, Deserialize)]
struct ProviderForecast {
    location: ProviderLocation,
    current: ProviderCurrent,
    forecast: ProviderDays,
}

#[derive(Debug, Deserialize)]
struct ProviderLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct ProviderCurrent {
    temp_c: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    wind_kph: f64,
    condition: ProviderCondition,
}

#[derive(Debug, Deserialize)]
struct ProviderCondition {
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ProviderDays {
    forecastday: Vec<ProviderDay>,
}

#[derive(Debug, Deserialize)]
struct ProviderDay {
    date: String,
    day: ProviderDaySummary,
}

#[derive(Debug, Deserialize)]
struct ProviderDaySummary {
    maxtemp_c: f64,
    mintemp_c: f64,
    #[serde(default)]
    daily_chance_of_rain: f64,
    condition: ProviderCondition,
}

impl ProviderForecast {
    fn normalize(self) -> WeatherReport {
        WeatherReport {
            location: WeatherLocation {
                name: self.location.name,
                region: self.location.region,
                country: self.location.country,
            },
            current: CurrentWeather {
                temperature_c: self.current.temp_c,
                condition: self.current.condition.text,
                icon: absolute_icon(self.current.condition.icon),
                humidity: self.current.humidity,
                wind_kph: self.current.wind_kph,
            },
            days: self
                .forecast
                .forecastday
                .into_iter()
                .map(|d| ForecastDay {
                    date: d.date,
                    max_temperature_c: d.day.maxtemp_c,
                    min_temperature_c: d.day.mintemp_c,
                    condition: d.day.condition.text,
                    icon: absolute_icon(d.day.condition.icon),
                    chance_of_rain: d.day.daily_chance_of_rain,
                })
                .collect(),
        }
    }
}

/// The provider hands out protocol-relative icon URLs.
fn absolute_icon(icon: String) -> String {
    match icon.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => icon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "location": {"name": "Salinas", "region": "California", "country": "USA", "lat": 36.68},
        "current": {
            "temp_c": 17.2, "humidity": 64, "wind_kph": 13.0,
            "condition": {"text": "Partly cloudy", "icon": "//cdn.weatherapi.com/116.png", "code": 1003}
        },
        "forecast": {"forecastday": [
            {"date": "2026-10-18", "day": {"maxtemp_c": 21.0, "mintemp_c": 9.5, "daily_chance_of_rain": 10,
                "condition": {"text": "Sunny", "icon": "//cdn.weatherapi.com/113.png"}}},
            {"date": "2026-10-19", "day": {"maxtemp_c": 18.4, "mintemp_c": 11.0, "daily_chance_of_rain": 85,
                "condition": {"text": "Light rain", "icon": "https://cdn.weatherapi.com/296.png"}}}
        ]}
    }"#;

    #[test]
    fn normalizes_provider_payload() {
        let forecast: ProviderForecast = serde_json::from_str(SAMPLE).unwrap();
        let report = forecast.normalize();

        assert_eq!(report.location.name, "Salinas");
        assert_eq!(report.current.temperature_c, 17.2);
        assert_eq!(report.current.humidity, 64.0);
        assert_eq!(report.current.icon, "https://cdn.weatherapi.com/116.png");
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.days[1].chance_of_rain, 85.0);
        assert_eq!(report.days[1].icon, "https://cdn.weatherapi.com/296.png");
    }

    #[test]
    fn missing_sections_fail_to_parse() {
        let partial = r#"{"location": {"name": "Salinas"}}"#;
        assert!(serde_json::from_str::<ProviderForecast>(partial).is_err());
    }

    #[tokio::test]
    async fn no_api_key_is_an_upstream_error() {
        let client = WeatherClient::new("http://127.0.0.1:9", "").unwrap();
        assert!(matches!(client.forecast("Salinas").await, Err(ApiError::Upstream(_))));
    }
}
