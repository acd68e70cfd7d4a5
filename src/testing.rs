//! Test fixtures and fakes shared across modules

use crate::{
    location::{Location, LocationRequest, Locator},
    provider::{
        news::{Headline, Headlines},
        open_meteo::{History, HistoryDay},
        weather::{
            Alert, CurrentConditions, Forecast, ForecastPeriod, RadarImage, Unit,
        },
        DataProvider, OutOfCoverage, Source,
    },
    refresh::RefreshRequest,
    snapshot::{DataKind, DataValue, Fetched, Snapshot},
    surface::{Frame, InputEvent, Surface},
};
use anyhow::anyhow;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::{
    collections::VecDeque,
    net::TcpListener,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

pub fn location() -> Location {
    Location {
        latitude: 28.5383,
        longitude: -81.3792,
        name: "Orlando, FL".into(),
    }
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 24, 12, 0, 0).unwrap()
}

pub fn current(temperature_c: f64) -> DataValue {
    DataValue::Current(CurrentConditions {
        station: "KMCO".into(),
        observed_at: timestamp(),
        description: "Sunny".into(),
        temperature_c: Some(temperature_c),
        dewpoint_c: Some(15.0),
        humidity: Some(60.0),
        wind_direction: Some(310.0),
        wind_speed_kmh: Some(16.0),
        pressure_pa: Some(101_660.0),
        visibility_m: Some(16_093.0),
    })
}

/// Alternating day/night periods, starting with a day
pub fn forecast(periods: usize) -> Forecast {
    let start = timestamp();
    Forecast {
        periods: (0..periods)
            .map(|i| ForecastPeriod {
                name: if i % 2 == 0 {
                    format!("Day {}", i / 2)
                } else {
                    format!("Night {}", i / 2)
                },
                start_time: start + chrono::Duration::hours(i as i64),
                end_time: start + chrono::Duration::hours(i as i64 + 1),
                is_daytime: i % 2 == 0,
                temperature: 70 + i as i32,
                temperature_unit: "F".into(),
                probability_of_precipitation: Unit { value: Some(10) },
                wind_speed: "5 mph".into(),
                wind_direction: "E".into(),
                short_forecast: "Sunny".into(),
                detailed_forecast: format!("Sunny, with a high near {}.", 70 + i),
            })
            .collect(),
    }
}

pub fn hourly() -> DataValue {
    DataValue::Hourly(forecast(24))
}

pub fn alerts() -> DataValue {
    DataValue::Alerts(vec![Alert {
        id: "urn:oid:2.49.0.1.840.0.1".into(),
        event: "Heat Advisory".into(),
        severity: "Moderate".into(),
        headline: Some("Heat Advisory issued May 24".into()),
        expires: Some(timestamp() + chrono::Duration::hours(8)),
    }])
}

pub fn history() -> DataValue {
    DataValue::History(History {
        days: (1..=7)
            .map(|day| HistoryDay {
                date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
                high_f: Some(85.0 + day as f64),
                low_f: Some(70.0 - day as f64),
                precipitation_in: Some(0.1),
            })
            .collect(),
    })
}

pub fn radar() -> DataValue {
    DataValue::Radar(RadarImage {
        url: "https://radar.weather.gov/ridge/standard/KMLB_0.gif".into(),
        bytes: vec![0u8; 2048].into(),
    })
}

/// `count` headlines, with URLs `https://example.com/{source}/{i}`
pub fn headlines(source: &str, count: usize) -> DataValue {
    DataValue::Headlines(Headlines {
        source: source.into(),
        items: (0..count)
            .map(|i| Headline {
                title: format!("{source} headline {i}"),
                url: format!("https://example.com/{source}/{i}"),
            })
            .collect(),
    })
}

/// A snapshot holding exactly these values
pub fn snapshot(values: Vec<(DataKind, DataValue)>) -> Snapshot {
    let mut fetched = Fetched::new(location());
    for (kind, value) in values {
        fetched.values.insert(kind, Arc::new(value));
    }
    Snapshot::default().apply(fetched)
}

/// A handful of different refresh outcomes, picked by index
pub fn fetched(variant: usize) -> Fetched {
    let mut fetched = Fetched::new(location());
    fetched.completed_at = Local
        .with_ymd_and_hms(2024, 5, 24, 8, variant as u32, 0)
        .unwrap();
    match variant % 5 {
        0 => {
            fetched.values.insert(DataKind::Current, Arc::new(current(20.0)));
        }
        1 => {
            fetched.values.insert(DataKind::Current, Arc::new(current(25.0)));
            fetched.values.insert(DataKind::Radar, Arc::new(radar()));
        }
        2 => {
            fetched.failures.insert(DataKind::Radar, "Timed out".into());
            fetched.values.insert(DataKind::Alerts, Arc::new(alerts()));
        }
        3 => {
            fetched
                .out_of_coverage
                .insert(DataKind::Alerts, "Outside NWS coverage".into());
        }
        _ => {
            fetched.location = Location {
                latitude: 42.36,
                longitude: -71.06,
                name: "Boston, MA".into(),
            };
            fetched.values.insert(DataKind::Current, Arc::new(current(10.0)));
        }
    }
    fetched
}

pub fn request(kinds: &[DataKind]) -> RefreshRequest {
    RefreshRequest {
        location: LocationRequest::AutoDetect,
        kinds: kinds.iter().copied().collect(),
    }
}

/// A provider with no sources, whose auto-detection always lands on
/// [location]
pub fn provider(timeout: Duration) -> DataProvider {
    DataProvider::new(Locator::fixed(ureq::agent(), location()), timeout)
}

/// A local server that takes connections but never answers. Keep the
/// listener alive for as long as the URL is in use
pub fn silent_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/json/", listener.local_addr().unwrap());
    (listener, url)
}

/// A local URL that refuses connections
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}/json/", listener.local_addr().unwrap())
}

enum Outcome {
    Value(DataValue),
    Fail,
    OutOfCoverage,
}

/// Source with a canned response
pub struct FakeSource {
    kind: DataKind,
    outcome: Outcome,
    ttl: Duration,
    delay: Arc<Mutex<Duration>>,
    calls: Arc<AtomicUsize>,
}

impl FakeSource {
    fn with_outcome(kind: DataKind, outcome: Outcome) -> Self {
        Self {
            kind,
            outcome,
            ttl: Duration::from_secs(60),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn new(kind: DataKind, value: DataValue) -> Self {
        Self::with_outcome(kind, Outcome::Value(value))
    }

    pub fn failing(kind: DataKind) -> Self {
        Self::with_outcome(kind, Outcome::Fail)
    }

    pub fn out_of_coverage(kind: DataKind) -> Self {
        Self::with_outcome(kind, Outcome::OutOfCoverage)
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Change the delay after the source has been handed off
    pub fn delay_handle(&self) -> Arc<Mutex<Duration>> {
        Arc::clone(&self.delay)
    }

    /// Number of fetches so far
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Source for FakeSource {
    fn kind(&self) -> DataKind {
        self.kind
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fetch(&self, _: &Location) -> anyhow::Result<DataValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        thread::sleep(delay);
        match &self.outcome {
            Outcome::Value(value) => Ok(value.clone()),
            Outcome::Fail => Err(anyhow!("{} is down", self.kind)),
            Outcome::OutOfCoverage => {
                Err(OutOfCoverage("Outside coverage".into()).into())
            }
        }
    }
}

/// Surface that records everything it's asked to do, and replays queued
/// input
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub frames: Vec<Frame>,
    pub volume: Option<f32>,
    pub tracks: Vec<PathBuf>,
    pub music_stopped: bool,
    pub opened: Vec<String>,
    input: VecDeque<InputEvent>,
}

impl RecordingSurface {
    pub fn push(&mut self, event: InputEvent) {
        self.input.push_back(event);
    }

    pub fn last_frame(&self) -> &Frame {
        self.frames.last().expect("Nothing drawn yet")
    }
}

impl Surface for RecordingSurface {
    fn draw_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn play_track(&mut self, track: &Path) -> anyhow::Result<()> {
        self.tracks.push(track.to_owned());
        Ok(())
    }

    fn stop_music(&mut self) {
        self.music_stopped = true;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = Some(volume);
    }

    fn open_link(&mut self, url: &str) -> anyhow::Result<()> {
        self.opened.push(url.to_owned());
        Ok(())
    }

    fn poll_input(&mut self) -> Vec<InputEvent> {
        self.input.drain(..).collect()
    }
}
