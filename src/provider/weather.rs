//! National Weather Service data: observations, forecasts, alerts and radar.
//! Everything NWS serves is keyed off a "point" lookup for the location, so
//! the point (plus its nearest observation station) is cached per location
//! and shared by every NWS source.

use crate::{
    cache::TtlCache,
    location::Location,
    provider::{get_json, OutOfCoverage, Source},
    settings::Units,
    snapshot::{DataKind, DataValue},
};
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::{
    fmt::{self, Debug},
    io::Read,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

const API_HOST: &str = "https://api.weather.gov";
const RADAR_HOST: &str = "https://radar.weather.gov/ridge/standard";

/// Shared NWS access. Holds the point cache
pub struct NwsClient {
    agent: ureq::Agent,
    points: Mutex<TtlCache<String, Arc<Point>>>,
}

impl NwsClient {
    const POINT_TTL: Duration = Duration::from_secs(60 * 60);

    pub fn new(agent: ureq::Agent) -> Self {
        Self {
            agent,
            points: Mutex::new(TtlCache::new()),
        }
    }

    /// Look up grid metadata for a location. The lock is held for the whole
    /// lookup, so concurrent sources wait for one request instead of each
    /// making their own.
    pub fn point(&self, location: &Location) -> anyhow::Result<Arc<Point>> {
        let key = location.cache_key();
        let mut points =
            self.points.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(point) = points.get(&key, Self::POINT_TTL, Instant::now()) {
            return Ok(point);
        }

        info!("Looking up NWS point for {location}");
        let url = format!(
            "{API_HOST}/points/{:.4},{:.4}",
            location.latitude, location.longitude
        );
        let response = match self.request(&url).call() {
            Ok(response) => response,
            // NWS answers 404 for anything outside the US
            Err(ureq::Error::Status(404, _)) => {
                return Err(OutOfCoverage(format!(
                    "{} is outside National Weather Service coverage",
                    location.name
                ))
                .into())
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Error fetching {url}"))
            }
        };
        let PointResponse { properties } = response
            .into_json()
            .context("Error parsing NWS point response")?;

        // Missing station isn't fatal, forecasts still work without one
        let station = match self.station(&properties.observation_stations) {
            Ok(station) => Some(station),
            Err(err) => {
                warn!("Error finding observation station: {err:#}");
                None
            }
        };
        let point = Arc::new(Point {
            forecast_url: properties.forecast,
            forecast_hourly_url: properties.forecast_hourly,
            radar_station: properties.radar_station,
            city: properties
                .relative_location
                .map(|relative| relative.properties.city),
            station,
        });
        debug!("NWS point: {point:?}");
        points.insert(key, Arc::clone(&point), Instant::now());
        Ok(point)
    }

    /// Pick an observation station. NWS lists them nearest first; prefer a
    /// standard 4-letter ICAO id, since some others rarely report
    fn station(&self, stations_url: &str) -> anyhow::Result<String> {
        let response: StationsResponse = get_json(self.request(stations_url))?;
        let ids: Vec<String> = response
            .features
            .into_iter()
            .map(|feature| feature.properties.station_identifier)
            .collect();
        ids.iter()
            .find(|id| {
                id.len() == 4 && !id.starts_with('U') && !id.starts_with('C')
            })
            .or(ids.first())
            .cloned()
            .ok_or_else(|| anyhow!("No observation stations listed"))
    }

    pub fn alerts(&self, location: &Location) -> anyhow::Result<Vec<Alert>> {
        let url = format!(
            "{API_HOST}/alerts/active?point={:.4},{:.4}",
            location.latitude, location.longitude
        );
        let response: AlertsResponse = get_json(self.request(&url))?;
        Ok(response
            .features
            .into_iter()
            .map(|feature| feature.properties)
            .collect())
    }

    fn request(&self, url: &str) -> ureq::Request {
        self.agent.get(url).set("Accept", "application/geo+json")
    }
}

/// Grid metadata for a location
#[derive(Debug)]
pub struct Point {
    pub forecast_url: String,
    pub forecast_hourly_url: String,
    pub radar_station: Option<String>,
    pub city: Option<String>,
    /// Nearest usable observation station
    pub station: Option<String>,
}

/// https://www.weather.gov/documentation/services-web-api#/default/point
#[derive(Debug, Deserialize)]
struct PointResponse {
    properties: PointProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointProperties {
    forecast: String,
    forecast_hourly: String,
    observation_stations: String,
    radar_station: Option<String>,
    relative_location: Option<RelativeLocation>,
}

#[derive(Debug, Deserialize)]
struct RelativeLocation {
    properties: RelativeLocationProperties,
}

#[derive(Debug, Deserialize)]
struct RelativeLocationProperties {
    city: String,
}

#[derive(Debug, Deserialize)]
struct StationsResponse {
    features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    properties: StationProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationProperties {
    station_identifier: String,
}

/// Latest observation from the nearest station
pub struct CurrentSource {
    nws: Arc<NwsClient>,
}

impl CurrentSource {
    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }
}

impl Source for CurrentSource {
    fn kind(&self) -> DataKind {
        DataKind::Current
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let point = self.nws.point(location)?;
        let Some(station) = &point.station else {
            bail!("No observation station near {}", location.name);
        };
        let url = format!("{API_HOST}/stations/{station}/observations/latest");
        let response: ObservationResponse = get_json(self.nws.request(&url))?;
        Ok(DataValue::Current(
            response.properties.into_conditions(station.clone()),
        ))
    }
}

/// https://www.weather.gov/documentation/services-web-api#/default/station_observation_latest
#[derive(Debug, Deserialize)]
struct ObservationResponse {
    properties: Observation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Observation {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    text_description: String,
    temperature: Measurement,
    dewpoint: Measurement,
    relative_humidity: Measurement,
    wind_direction: Measurement,
    wind_speed: Measurement,
    barometric_pressure: Measurement,
    visibility: Measurement,
}

/// A value with a unit code. NWS leaves `value` null when a sensor is out
#[derive(Clone, Debug, Default, Deserialize)]
struct Measurement {
    value: Option<f64>,
}

impl Observation {
    fn into_conditions(self, station: String) -> CurrentConditions {
        CurrentConditions {
            station,
            observed_at: self.timestamp,
            description: self.text_description,
            temperature_c: self.temperature.value,
            dewpoint_c: self.dewpoint.value,
            humidity: self.relative_humidity.value,
            wind_direction: self.wind_direction.value,
            wind_speed_kmh: self.wind_speed.value,
            pressure_pa: self.barometric_pressure.value,
            visibility_m: self.visibility.value,
        }
    }
}

/// Observed conditions, in the SI units NWS reports them in. Any sensor can
/// be missing.
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentConditions {
    pub station: String,
    pub observed_at: DateTime<Utc>,
    pub description: String,
    pub temperature_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    /// Percent
    pub humidity: Option<f64>,
    /// Degrees
    pub wind_direction: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub pressure_pa: Option<f64>,
    pub visibility_m: Option<f64>,
}

impl CurrentConditions {
    pub fn temperature(&self, units: Units) -> Option<String> {
        self.temperature_c
            .map(|celsius| units.temperature_from_celsius(celsius))
    }

    pub fn dewpoint(&self, units: Units) -> Option<String> {
        self.dewpoint_c
            .map(|celsius| units.temperature_from_celsius(celsius))
    }

    pub fn humidity(&self) -> Option<String> {
        self.humidity.map(|humidity| format!("{humidity:.0}%"))
    }

    /// e.g. "NW 12 mph", or "Calm"
    pub fn wind(&self) -> Option<String> {
        let mph = self.wind_speed_kmh? * 0.621371;
        if mph < 1.0 {
            return Some("Calm".into());
        }
        Some(match self.wind_direction {
            Some(degrees) => format!("{} {mph:.0} mph", compass(degrees)),
            None => format!("{mph:.0} mph"),
        })
    }

    /// Inches of mercury
    pub fn pressure(&self) -> Option<String> {
        self.pressure_pa
            .map(|pascals| format!("{:.2} in", pascals * 0.0002953))
    }

    pub fn visibility(&self) -> Option<String> {
        self.visibility_m
            .map(|meters| format!("{:.0} mi", meters / 1609.344))
    }
}

/// Convert a bearing to a 16-point compass direction
pub fn compass(degrees: f64) -> &'static str {
    const DIRECTIONS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW",
        "WSW", "W", "WNW", "NW", "NNW",
    ];
    let index = ((degrees.rem_euclid(360.0) + 11.25) / 22.5) as usize % 16;
    DIRECTIONS[index]
}

/// Named periods (Today, Tonight, ...) for the next week
pub struct ForecastSource {
    nws: Arc<NwsClient>,
}

impl ForecastSource {
    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }
}

impl Source for ForecastSource {
    fn kind(&self) -> DataKind {
        DataKind::Forecast
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(30 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let point = self.nws.point(location)?;
        let response: ForecastResponse =
            get_json(self.nws.request(&point.forecast_url))?;
        Ok(DataValue::Forecast(response.properties))
    }
}

/// Hour-by-hour forecast
pub struct HourlySource {
    nws: Arc<NwsClient>,
}

impl HourlySource {
    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }
}

impl Source for HourlySource {
    fn kind(&self) -> DataKind {
        DataKind::Hourly
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(30 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let point = self.nws.point(location)?;
        let response: ForecastResponse =
            get_json(self.nws.request(&point.forecast_hourly_url))?;
        Ok(DataValue::Hourly(response.properties))
    }
}

///https://www.weather.gov/documentation/services-web-api#/default/gridpoint_forecast
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Forecast,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    /// Empty for hourly periods
    #[serde(default)]
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_daytime: bool,
    /// In the unit given by `temperature_unit`, which is F unless asked
    pub temperature: i32,
    #[serde(default = "fahrenheit")]
    pub temperature_unit: String,
    pub probability_of_precipitation: Unit,
    #[serde(default)]
    pub wind_speed: String,
    #[serde(default)]
    pub wind_direction: String,
    #[serde(default)]
    pub short_forecast: String,
    #[serde(default)]
    pub detailed_forecast: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub value: Option<i32>,
}

fn fahrenheit() -> String {
    "F".into()
}

/// One day of the extended forecast: the daytime period plus the night low
#[derive(Clone, Debug, PartialEq)]
pub struct DaySummary<'a> {
    pub day: &'a ForecastPeriod,
    pub night: Option<&'a ForecastPeriod>,
}

impl Forecast {
    /// Get the current forecast period
    pub fn now(&self) -> Option<&ForecastPeriod> {
        self.periods.first()
    }

    /// Pair up day and night periods. If the forecast starts at night (e.g.
    /// fetched in the evening) that lone night is skipped
    pub fn days(&self) -> Vec<DaySummary<'_>> {
        let mut days = Vec::new();
        let mut periods = self.periods.iter().peekable();
        while let Some(period) = periods.next() {
            if !period.is_daytime {
                continue;
            }
            let night = periods.next_if(|next| !next.is_daytime);
            days.push(DaySummary { day: period, night });
        }
        days
    }
}

impl ForecastPeriod {
    /// Localized timestamp for the start of this period
    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time.with_timezone(&Local)
    }

    /// Formatted temperature
    pub fn temperature(&self, units: Units) -> String {
        let value = f64::from(self.temperature);
        if self.temperature_unit == "C" {
            units.temperature_from_celsius(value)
        } else {
            units.temperature_from_fahrenheit(value)
        }
    }

    /// Formatted probability of precipitation
    pub fn prob_of_precip(&self) -> String {
        format!(
            "{:.0}%",
            self.probability_of_precipitation.value.unwrap_or_default()
        )
    }
}

/// Active watches, warnings and advisories at the location
pub struct AlertsSource {
    nws: Arc<NwsClient>,
}

impl AlertsSource {
    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }
}

impl Source for AlertsSource {
    fn kind(&self) -> DataKind {
        DataKind::Alerts
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        // Alerts are only served for points NWS covers
        self.nws.point(location)?;
        Ok(DataValue::Alerts(self.nws.alerts(location)?))
    }
}

/// https://www.weather.gov/documentation/services-web-api#/default/alerts_active
#[derive(Debug, Deserialize)]
struct AlertsResponse {
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    properties: Alert,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub event: String,
    /// Extreme, Severe, Moderate, Minor or Unknown
    pub severity: String,
    pub headline: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_severe(&self) -> bool {
        matches!(self.severity.as_str(), "Extreme" | "Severe")
    }

    pub fn url(&self) -> String {
        format!("https://www.weather.gov/alerts/{}", self.id)
    }
}

/// Latest radar loop frame for the nearest radar site
pub struct RadarSource {
    nws: Arc<NwsClient>,
}

impl RadarSource {
    /// Anything smaller than this is an error page, not an image
    const MIN_IMAGE_SIZE: usize = 1000;
    const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }

    /// Image URLs to try, most local first
    fn urls(location: &Location, station: Option<&str>) -> Vec<String> {
        let mut urls = Vec::new();
        if let Some(station) = station {
            urls.push(format!("{RADAR_HOST}/{station}_0.gif"));
        }
        urls.push(format!("{RADAR_HOST}/{}_0.gif", regional_sector(location)));
        urls.push(format!("{RADAR_HOST}/CONUS-LARGE_0.gif"));
        urls.push(format!("{RADAR_HOST}/CONUS_0.gif"));
        urls
    }

    fn download(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .nws
            .agent
            .get(url)
            .call()
            .with_context(|| format!("Error fetching {url}"))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(Self::MAX_IMAGE_SIZE)
            .read_to_end(&mut bytes)
            .with_context(|| format!("Error reading image from {url}"))?;
        if bytes.len() < Self::MIN_IMAGE_SIZE {
            bail!("Image from {url} is only {} bytes", bytes.len());
        }
        Ok(bytes)
    }
}

impl Source for RadarSource {
    fn kind(&self) -> DataKind {
        DataKind::Radar
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        // Radar still works without a point, via the regional image
        let station = match self.nws.point(location) {
            Ok(point) => point.radar_station.clone(),
            Err(err) => {
                debug!("No radar station: {err:#}");
                None
            }
        };

        let mut last_error = anyhow!("No radar URLs to try");
        for url in Self::urls(location, station.as_deref()) {
            match self.download(&url) {
                Ok(bytes) => {
                    return Ok(DataValue::Radar(RadarImage {
                        url,
                        bytes: bytes.into(),
                    }))
                }
                Err(err) => {
                    debug!("Radar fallback: {err:#}");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

/// Fallback radar sector by rough region of the country
fn regional_sector(location: &Location) -> &'static str {
    let Location {
        latitude: lat,
        longitude: lon,
        ..
    } = *location;
    if lon < -100.0 {
        if lat > 42.0 {
            "PACNORTHWEST"
        } else if lat > 35.0 {
            "PACSOUTHWEST"
        } else {
            "SOUTHROCKIES"
        }
    } else if lon < -85.0 {
        if lat > 42.0 {
            "NORTHROCKIES"
        } else if lat > 35.0 {
            "SOUTHPLAINS"
        } else {
            "SOUTHMISSVLY"
        }
    } else if lat > 40.0 {
        "NORTHEAST"
    } else if lat > 36.0 {
        "CENTGRTLAKES"
    } else {
        "SOUTHEAST"
    }
}

/// Raw image bytes. Decoding is up to the surface
#[derive(Clone, PartialEq)]
pub struct RadarImage {
    pub url: String,
    pub bytes: Arc<[u8]>,
}

// Don't dump a few hundred KB of bytes into the logs
impl Debug for RadarImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadarImage")
            .field("url", &self.url)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
