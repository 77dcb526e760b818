use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::{
    config::Config,
    model::{WeatherRecord, round_reading},
};

use super::{FetchError, WeatherClient};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Client for the WeatherAPI.com `current.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { api_key, base_url: base_url.into(), timeout, http })
    }

    /// Build a client from the on-disk config, optionally overriding its API key.
    pub fn from_config(config: &Config, api_key: Option<String>) -> anyhow::Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => config.api_key()?.to_owned(),
        };

        Self::new(api_key, config.base_url.clone(), config.timeout())
    }

    fn current_url(&self, city_name: &str) -> Result<Url, FetchError> {
        let city = city_name.trim();
        if city.is_empty() {
            return Err(FetchError::InvalidRequest("city name is empty".to_string()));
        }

        let endpoint = format!("{}/current.json", self.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&endpoint)
            .map_err(|e| FetchError::InvalidRequest(format!("{endpoint}: {e}")))?;

        url.query_pairs_mut().append_pair("key", &self.api_key).append_pair("q", city);

        Ok(url)
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Transport(format!("request timed out after {:?}", self.timeout))
        } else {
            // without_url keeps the API key out of the message
            FetchError::Transport(err.without_url().to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_f: f64,
    condition: WaCondition,
    humidity: f64,
    uv: f64,
    feelslike_f: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaErrorDetail {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WaErrorResponse {
    error: WaErrorDetail,
}

impl TryFrom<WaResponse> for WeatherRecord {
    type Error = FetchError;

    fn try_from(parsed: WaResponse) -> Result<Self, Self::Error> {
        let reading = |field: &str, value: f64| {
            round_reading(value)
                .ok_or_else(|| FetchError::Decode(format!("`{field}` is not a usable number")))
        };

        let mut record = WeatherRecord::new(parsed.location.name)
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let current = parsed.current;
        record.temperature_f = Some(reading("temp_f", current.temp_f)?);
        record.condition_icon_ref = Some(current.condition.icon);
        record.humidity_percent = Some(reading("humidity", current.humidity)?);
        record.uv_index = Some(reading("uv", current.uv)?);
        record.feels_like_f = Some(reading("feelslike_f", current.feelslike_f)?);

        Ok(record)
    }
}

#[async_trait]
impl WeatherClient for WeatherApiClient {
    async fn fetch(&self, city_name: &str) -> Result<WeatherRecord, FetchError> {
        let url = self.current_url(city_name)?;
        tracing::debug!(city = city_name, "requesting current weather");

        let res = self.http.get(url).send().await.map_err(|e| self.transport_error(e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            if let Ok(api_err) = serde_json::from_str::<WaErrorResponse>(&body) {
                tracing::debug!(%status, code = api_err.error.code, "weather API rejected request");
                return Err(FetchError::Decode(api_err.error.message));
            }

            return Err(FetchError::Transport(format!(
                "weather API request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: WaResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(format!("unexpected response body: {e}")))?;

        WeatherRecord::try_from(parsed)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
