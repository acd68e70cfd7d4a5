//! Open-Meteo APIs. These work worldwide and need no key, which makes them a
//! good complement to NWS for air quality, marine and historical data.

use crate::{
    location::Location,
    provider::{get_json, OutOfCoverage, Source},
    snapshot::{DataKind, DataValue},
};
use chrono::NaiveDate;
use itertools::Itertools;
use log::debug;
use serde::Deserialize;
use std::time::Duration;

const AIR_QUALITY_URL: &str =
    "https://air-quality-api.open-meteo.com/v1/air-quality";
const MARINE_URL: &str = "https://marine-api.open-meteo.com/v1/marine";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

fn request(agent: &ureq::Agent, url: &str, location: &Location) -> ureq::Request {
    agent
        .get(url)
        .query("latitude", &location.latitude.to_string())
        .query("longitude", &location.longitude.to_string())
}

pub struct AirQualitySource {
    agent: ureq::Agent,
}

impl AirQualitySource {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Source for AirQualitySource {
    fn kind(&self) -> DataKind {
        DataKind::AirQuality
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(30 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let response: CurrentResponse<AirQuality> = get_json(
            request(&self.agent, AIR_QUALITY_URL, location)
                .query("current", "us_aqi,pm2_5,pm10,ozone"),
        )?;
        Ok(DataValue::AirQuality(response.current))
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse<T> {
    current: T,
}

/// https://open-meteo.com/en/docs/air-quality-api
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AirQuality {
    pub us_aqi: Option<f64>,
    /// μg/m³
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub ozone: Option<f64>,
}

impl AirQuality {
    /// EPA category for the AQI value
    pub fn category(&self) -> Option<&'static str> {
        let aqi = self.us_aqi?;
        Some(if aqi <= 50.0 {
            "Good"
        } else if aqi <= 100.0 {
            "Moderate"
        } else if aqi <= 150.0 {
            "Unhealthy for Sensitive Groups"
        } else if aqi <= 200.0 {
            "Unhealthy"
        } else if aqi <= 300.0 {
            "Very Unhealthy"
        } else {
            "Hazardous"
        })
    }
}

/// Wave conditions. Only registered for coastal installs
pub struct MarineSource {
    agent: ureq::Agent,
}

impl MarineSource {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Source for MarineSource {
    fn kind(&self) -> DataKind {
        DataKind::Marine
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(30 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let response: CurrentResponse<MarineConditions> = get_json(
            request(&self.agent, MARINE_URL, location)
                .query("current", "wave_height,wave_direction,wave_period")
                .query("length_unit", "imperial"),
        )?;
        // Inland grid cells come back with every value null
        if response.current.wave_height.is_none() {
            return Err(OutOfCoverage(format!(
                "No marine data for {}",
                location.name
            ))
            .into());
        }
        Ok(DataValue::Marine(response.current))
    }
}

/// https://open-meteo.com/en/docs/marine-weather-api
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MarineConditions {
    /// Feet
    pub wave_height: Option<f64>,
    /// Degrees the waves are coming from
    pub wave_direction: Option<f64>,
    /// Seconds
    pub wave_period: Option<f64>,
}

/// The past week of daily highs, lows and rainfall
pub struct HistorySource {
    agent: ureq::Agent,
}

impl HistorySource {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Source for HistorySource {
    fn kind(&self) -> DataKind {
        DataKind::History
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(6 * 60 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let response: HistoryResponse = get_json(
            request(&self.agent, FORECAST_URL, location)
                .query(
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_sum",
                )
                .query("past_days", "7")
                .query("forecast_days", "1")
                .query("temperature_unit", "fahrenheit")
                .query("precipitation_unit", "inch")
                .query("timezone", "auto"),
        )?;
        let history = response.daily.into_history();
        let incomplete = history.incomplete_days();
        if !incomplete.is_empty() {
            debug!("History is missing values for {incomplete}");
        }
        Ok(DataValue::History(history))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    daily: Daily,
}

/// Open-Meteo returns parallel arrays, one per variable
#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<NaiveDate>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
}

impl Daily {
    fn into_history(self) -> History {
        let days = self
            .time
            .into_iter()
            .zip(self.temperature_2m_max)
            .zip(self.temperature_2m_min)
            .zip(self.precipitation_sum)
            .map(|(((date, high_f), low_f), precipitation_in)| HistoryDay {
                date,
                high_f,
                low_f,
                precipitation_in,
            })
            .collect();
        History { days }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct History {
    /// Oldest first. The last day is today
    pub days: Vec<HistoryDay>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub high_f: Option<f64>,
    pub low_f: Option<f64>,
    pub precipitation_in: Option<f64>,
}

impl History {
    /// Warmest day in the window
    pub fn record_high(&self) -> Option<(&HistoryDay, f64)> {
        self.days
            .iter()
            .filter_map(|day| Some((day, day.high_f?)))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
    }

    /// Coldest night in the window
    pub fn record_low(&self) -> Option<(&HistoryDay, f64)> {
        self.days
            .iter()
            .filter_map(|day| Some((day, day.low_f?)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
    }

    pub fn total_precipitation(&self) -> f64 {
        self.days.iter().filter_map(|day| day.precipitation_in).sum()
    }

    /// Dates missing any value, for logging
    pub fn incomplete_days(&self) -> String {
        self.days
            .iter()
            .filter(|day| day.high_f.is_none() || day.low_f.is_none())
            .map(|day| day.date)
            .join(", ")
    }
}
