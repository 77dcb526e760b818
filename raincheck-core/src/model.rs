use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("city name must not be empty")]
    EmptyName,
}

/// One city's weather snapshot.
///
/// Weather fields are `None` until populated from a fetch; a record built
/// from a name alone carries no readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    id: Uuid,
    #[serde(deserialize_with = "non_empty_name")]
    name: String,
    pub temperature_f: Option<i32>,
    pub condition_icon_ref: Option<String>,
    pub humidity_percent: Option<i32>,
    pub uv_index: Option<i32>,
    pub feels_like_f: Option<i32>,
}

impl WeatherRecord {
    pub fn new(name: impl Into<String>) -> Result<Self, RecordError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            temperature_f: None,
            condition_icon_ref: None,
            humidity_percent: None,
            uv_index: None,
            feels_like_f: None,
        })
    }

    /// Display-list identity. Not part of equality.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute HTTPS URL of the condition icon.
    ///
    /// The API hands out protocol-relative references (`//cdn.weatherapi.com/...`).
    pub fn icon_url(&self) -> Option<Url> {
        let icon = self.condition_icon_ref.as_deref()?;
        if icon.starts_with("//") {
            Url::parse(&format!("https:{icon}")).ok()
        } else {
            Url::parse(icon).ok()
        }
    }
}

impl PartialEq for WeatherRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.temperature_f == other.temperature_f
            && self.condition_icon_ref == other.condition_icon_ref
            && self.humidity_percent == other.humidity_percent
            && self.uv_index == other.uv_index
            && self.feels_like_f == other.feels_like_f
    }
}

impl Eq for WeatherRecord {}

/// Round half away from zero; `None` for NaN, infinities and values that
/// do not fit an `i32`.
pub fn round_reading(value: f64) -> Option<i32> {
    let rounded = value.round();
    if !(f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&rounded) {
        return None;
    }
    Some(rounded as i32)
}

fn non_empty_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    if name.trim().is_empty() {
        return Err(serde::de::Error::custom(RecordError::EmptyName));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_no_readings() {
        let record = WeatherRecord::new("Chicago").unwrap();

        assert_eq!(record.name(), "Chicago");
        assert_eq!(record.temperature_f, None);
        assert_eq!(record.condition_icon_ref, None);
        assert_eq!(record.humidity_percent, None);
        assert_eq!(record.uv_index, None);
        assert_eq!(record.feels_like_f, None);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(WeatherRecord::new("").unwrap_err(), RecordError::EmptyName);
        assert_eq!(WeatherRecord::new("   ").unwrap_err(), RecordError::EmptyName);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_reading(72.4), Some(72));
        assert_eq!(round_reading(72.5), Some(73));
        assert_eq!(round_reading(45.6), Some(46));
        assert_eq!(round_reading(-0.5), Some(-1));
        assert_eq!(round_reading(-3.4), Some(-3));
        assert_eq!(round_reading(0.0), Some(0));
    }

    #[test]
    fn rounding_rejects_non_finite() {
        assert_eq!(round_reading(f64::NAN), None);
        assert_eq!(round_reading(f64::INFINITY), None);
        assert_eq!(round_reading(f64::NEG_INFINITY), None);
    }

    #[test]
    fn rounding_rejects_out_of_range() {
        assert_eq!(round_reading(1e12), None);
        assert_eq!(round_reading(-1e12), None);
        assert_eq!(round_reading(2_147_483_647.4), Some(i32::MAX));
        assert_eq!(round_reading(-2_147_483_648.0), Some(i32::MIN));
        assert_eq!(round_reading(2_147_483_647.5), None);
    }

    #[test]
    fn icon_url_adds_https_scheme() {
        let mut record = WeatherRecord::new("Chicago").unwrap();
        record.condition_icon_ref = Some("//cdn.weatherapi.com/weather/64x64/day/116.png".into());

        let url = record.icon_url().expect("icon url");
        assert_eq!(url.as_str(), "https://cdn.weatherapi.com/weather/64x64/day/116.png");
    }

    #[test]
    fn icon_url_keeps_absolute_reference() {
        let mut record = WeatherRecord::new("Chicago").unwrap();
        record.condition_icon_ref = Some("https://example.com/x.png".into());
        assert_eq!(record.icon_url().unwrap().as_str(), "https://example.com/x.png");

        record.condition_icon_ref = None;
        assert!(record.icon_url().is_none());
    }

    #[test]
    fn equality_ignores_id() {
        let a = WeatherRecord::new("Austin").unwrap();
        let b = WeatherRecord::new("Austin").unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn json_keeps_id_and_rejects_empty_name() {
        let mut record = WeatherRecord::new("Denver").unwrap();
        record.temperature_f = Some(51);

        let json = serde_json::to_string(&record).unwrap();
        let back: WeatherRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), record.id());
        assert_eq!(back.temperature_f, Some(51));

        let bad = json.replace("\"Denver\"", "\"\"");
        assert!(serde_json::from_str::<WeatherRecord>(&bad).is_err());
    }
}
