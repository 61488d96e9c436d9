//! OpenWeatherMap 5-day / 3-hour forecast provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike};
use moodtrip_core::{Error, GeoPoint, Result, TemperatureRange, WeatherSnapshot};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::providers::WeatherProvider;

pub const OPENWEATHER_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    cod: Value,
    #[serde(default)]
    message: Value,
    #[serde(default)]
    list: Vec<ForecastEntry>,
    #[serde(default)]
    city: Option<ForecastCity>,
}

#[derive(Debug, Deserialize)]
struct ForecastCity {
    /// Seconds east of UTC.
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    rain: Option<Rain>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Rain {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

impl ForecastResponse {
    fn is_ok(&self) -> bool {
        self.cod.as_str() == Some("200") || self.cod.as_i64() == Some(200)
    }

    /// Fold the 3-hour slots falling on `date` (city local time) into one snapshot.
    ///
    /// Temperatures span the day's extremes, rain is summed, wind and humidity
    /// averaged, and the condition is taken from the slot nearest noon.
    pub fn summarize(&self, date: NaiveDate) -> Option<WeatherSnapshot> {
        let offset = self.city.as_ref().map(|c| c.timezone).unwrap_or(0);
        let slots: Vec<(u32, &ForecastEntry)> = self
            .list
            .iter()
            .filter_map(|entry| {
                let local = DateTime::from_timestamp(entry.dt + offset, 0)?;
                (local.date_naive() == date).then(|| (local.hour(), entry))
            })
            .collect();
        if slots.is_empty() {
            return None;
        }

        let n = slots.len() as f64;
        let min = slots.iter().map(|(_, e)| e.main.temp_min).fold(f64::INFINITY, f64::min);
        let max = slots.iter().map(|(_, e)| e.main.temp_max).fold(f64::NEG_INFINITY, f64::max);
        let precipitation = slots
            .iter()
            .filter_map(|(_, e)| e.rain.as_ref())
            .map(|r| r.three_hours)
            .sum();
        let wind_speed = slots
            .iter()
            .map(|(_, e)| e.wind.as_ref().map(|w| w.speed).unwrap_or(0.0))
            .sum::<f64>()
            / n;
        let humidity = slots.iter().map(|(_, e)| e.main.humidity).sum::<f64>() / n;
        let condition = slots
            .iter()
            .min_by_key(|(hour, _)| (*hour as i32 - 12).abs())
            .and_then(|(_, e)| e.weather.first())
            .map(|c| c.description.clone())
            .unwrap_or_default();

        Some(WeatherSnapshot {
            date,
            temperature: TemperatureRange { min, max },
            condition,
            precipitation,
            wind_speed,
            humidity,
        })
    }
}

pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<String>,
    url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            url: OPENWEATHER_FORECAST_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get(&self, location: GeoPoint, date: NaiveDate) -> Result<Option<WeatherSnapshot>> {
        let Some(key) = &self.api_key else {
            debug!("Weather API key not configured");
            return Ok(None);
        };

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("appid", key.clone()),
                ("lat", location.lat.to_string()),
                ("lon", location.lng.to_string()),
                ("units", "metric".to_string()),
                ("lang", "zh_cn".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("weather request failed: {}", e)))?;

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("weather response unreadable: {}", e)))?;

        if !body.is_ok() {
            return Err(Error::ProviderUnavailable(format!(
                "weather API error {}: {}",
                body.cod, body.message
            )));
        }

        Ok(body.summarize(date))
    }
}
