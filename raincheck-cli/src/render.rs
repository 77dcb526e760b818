use raincheck_core::WeatherRecord;

/// Text block for one city, "-" standing in for readings not yet fetched.
pub fn record(record: &WeatherRecord) -> String {
    let mut lines = vec![
        record.name().to_string(),
        format!("  {}°", reading(record.temperature_f)),
    ];

    if let Some(url) = record.icon_url() {
        lines.push(format!("  Icon:       {url}"));
    }

    lines.push(format!("  Humidity:   {}", with_unit(record.humidity_percent, "%")));
    lines.push(format!("  UV:         {}", reading(record.uv_index)));
    lines.push(format!("  Feels like: {}", with_unit(record.feels_like_f, "°")));

    lines.join("\n")
}

pub fn placeholder() -> &'static str {
    "No City Selected\nPlease Search for a City"
}

fn reading(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn with_unit(value: Option<i32>, unit: &str) -> String {
    value.map(|v| format!("{v}{unit}")).unwrap_or_else(|| "-".to_string())
}
