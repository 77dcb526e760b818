use crate::model::WeatherRecord;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod weatherapi;

pub use weatherapi::WeatherApiClient;

/// Why a weather fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The city name could not be turned into a valid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout, DNS, connection failure or an unexplained non-2xx status.
    #[error("Network error: {0}")]
    Transport(String),

    /// The body did not have the expected shape.
    #[error("Could not read weather data: {0}")]
    Decode(String),
}

#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Fetch current weather for `city_name`.
    ///
    /// The returned record is named after the location the service resolved,
    /// which may differ from the query.
    async fn fetch(&self, city_name: &str) -> Result<WeatherRecord, FetchError>;
}
