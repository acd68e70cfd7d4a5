//! The page registry. Each page is a pure function from the current
//! [Snapshot] to a [Frame], plus the metadata the controller needs to decide
//! when to show it.

use crate::{
    provider::weather::{compass, Forecast},
    settings::{Settings, SettingsOption, Units},
    snapshot::{DataKind, DataValue, Snapshot},
    surface::{Frame, FrameImage, Link},
};
use chrono::Local;
use indexmap::IndexSet;
use std::{fmt::Display, time::Duration};

/// Every page the kiosk knows about, in rotation order
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PageId {
    CurrentConditions,
    ExtendedForecast,
    HourlyForecast,
    LocalForecast,
    Radar,
    Hazards,
    AirQuality,
    Marine,
    TemperatureTrend,
    WeatherRecords,
    MsnNews,
    RedditNews,
    LocalNews,
}

impl PageId {
    pub const ALL: &'static [Self] = &[
        Self::CurrentConditions,
        Self::ExtendedForecast,
        Self::HourlyForecast,
        Self::LocalForecast,
        Self::Radar,
        Self::Hazards,
        Self::AirQuality,
        Self::Marine,
        Self::TemperatureTrend,
        Self::WeatherRecords,
        Self::MsnNews,
        Self::RedditNews,
        Self::LocalNews,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CurrentConditions => "current-conditions",
            Self::ExtendedForecast => "extended-forecast",
            Self::HourlyForecast => "hourly-forecast",
            Self::LocalForecast => "local-forecast",
            Self::Radar => "radar",
            Self::Hazards => "hazards",
            Self::AirQuality => "air-quality",
            Self::Marine => "marine",
            Self::TemperatureTrend => "temperature-trend",
            Self::WeatherRecords => "weather-records",
            Self::MsnNews => "msn-news",
            Self::RedditNews => "reddit-news",
            Self::LocalNews => "local-news",
        }
    }
}

impl Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How long a page stays up
#[derive(Copy, Clone, Debug, PartialEq)]
enum Timing {
    /// The configured page duration
    Fixed,
    /// Scrolling pages get extra time per line
    PerItem,
}

/// Static description of a page
struct Page {
    id: PageId,
    title: &'static str,
    subtitle: &'static str,
    /// Data the page is drawn from. Pages whose kind has no registered
    /// source are never shown
    kind: DataKind,
    /// Settings toggle that hides the page. None means always on
    toggle: Option<SettingsOption>,
    timing: Timing,
    /// None if the data isn't there
    body: fn(&Snapshot, Units) -> Option<Body>,
}

#[derive(Debug, Default)]
struct Body {
    lines: Vec<String>,
    links: Vec<Link>,
    image: Option<FrameImage>,
}

impl Body {
    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }
}

const PAGES: &[Page] = &[
    Page {
        id: PageId::CurrentConditions,
        title: "Current",
        subtitle: "Conditions",
        kind: DataKind::Current,
        toggle: None,
        timing: Timing::Fixed,
        body: current_conditions,
    },
    Page {
        id: PageId::ExtendedForecast,
        title: "Extended",
        subtitle: "Forecast",
        kind: DataKind::Forecast,
        toggle: None,
        timing: Timing::Fixed,
        body: extended_forecast,
    },
    Page {
        id: PageId::HourlyForecast,
        title: "Hourly",
        subtitle: "Forecast",
        kind: DataKind::Hourly,
        toggle: None,
        timing: Timing::Fixed,
        body: hourly_forecast,
    },
    Page {
        id: PageId::LocalForecast,
        title: "Local",
        subtitle: "Forecast",
        kind: DataKind::Forecast,
        toggle: None,
        timing: Timing::PerItem,
        body: local_forecast,
    },
    Page {
        id: PageId::Radar,
        title: "Local",
        subtitle: "Radar",
        kind: DataKind::Radar,
        toggle: None,
        timing: Timing::Fixed,
        body: radar,
    },
    Page {
        id: PageId::Hazards,
        title: "Weather",
        subtitle: "Hazards",
        kind: DataKind::Alerts,
        toggle: None,
        timing: Timing::Fixed,
        body: hazards,
    },
    Page {
        id: PageId::AirQuality,
        title: "Air",
        subtitle: "Quality",
        kind: DataKind::AirQuality,
        toggle: None,
        timing: Timing::Fixed,
        body: air_quality,
    },
    Page {
        id: PageId::Marine,
        title: "Marine",
        subtitle: "Forecast",
        kind: DataKind::Marine,
        toggle: Some(SettingsOption::Marine),
        timing: Timing::Fixed,
        body: marine,
    },
    Page {
        id: PageId::TemperatureTrend,
        title: "Temperature",
        subtitle: "Trends",
        kind: DataKind::Hourly,
        toggle: Some(SettingsOption::Trends),
        timing: Timing::Fixed,
        body: temperature_trend,
    },
    Page {
        id: PageId::WeatherRecords,
        title: "Weather",
        subtitle: "Records",
        kind: DataKind::History,
        toggle: Some(SettingsOption::Historical),
        timing: Timing::Fixed,
        body: weather_records,
    },
    Page {
        id: PageId::MsnNews,
        title: "MSN",
        subtitle: "Top Stories",
        kind: DataKind::MsnHeadlines,
        toggle: Some(SettingsOption::Msn),
        timing: Timing::PerItem,
        body: msn_news,
    },
    Page {
        id: PageId::RedditNews,
        title: "Reddit",
        subtitle: "Headlines",
        kind: DataKind::RedditHeadlines,
        toggle: Some(SettingsOption::Reddit),
        timing: Timing::PerItem,
        body: reddit_news,
    },
    Page {
        id: PageId::LocalNews,
        title: "Local",
        subtitle: "News",
        kind: DataKind::LocalNews,
        toggle: Some(SettingsOption::LocalNews),
        timing: Timing::PerItem,
        body: local_news,
    },
];

/// Owns page order and timing
#[derive(Debug)]
pub struct Registry {
    page_duration: Duration,
}

impl Registry {
    const ITEM_TIME: Duration = Duration::from_secs(2);
    /// Scrolling pages never stay up longer than this many page durations
    const MAX_SCALE: u32 = 3;
    const TITLE: &'static str = "WeatherStar 4000+";
    const PLACEHOLDER: &'static str = "Data unavailable";

    pub fn new(page_duration: Duration) -> Self {
        Self { page_duration }
    }

    pub fn page_duration(&self) -> Duration {
        self.page_duration
    }

    fn page(&self, id: PageId) -> Option<&'static Page> {
        PAGES.iter().find(|page| page.id == id)
    }

    /// Pages that should be in rotation, in registry order. A page shows if
    /// its toggle (if any) is on and something can supply its data
    pub fn enabled_pages(
        &self,
        settings: &Settings,
        available: &IndexSet<DataKind>,
    ) -> Vec<PageId> {
        PAGES
            .iter()
            .filter(|page| {
                page.toggle.map_or(true, |option| settings.is_enabled(option))
            })
            .filter(|page| available.contains(&page.kind))
            .map(|page| page.id)
            .collect()
    }

    /// Data needed to draw these pages, plus whatever the ticker uses
    pub fn required_kinds(
        &self,
        pages: &[PageId],
        available: &IndexSet<DataKind>,
    ) -> IndexSet<DataKind> {
        pages
            .iter()
            .filter_map(|&id| self.page(id))
            .map(|page| page.kind)
            .chain([DataKind::Current, DataKind::Forecast])
            .filter(|kind| available.contains(kind))
            .collect()
    }

    /// Index (into `enabled`) of the first page after `from` in registry
    /// order, wrapping around. Used when the active page gets disabled
    pub fn following(&self, from: PageId, enabled: &[PageId]) -> Option<usize> {
        let start = PageId::ALL.iter().position(|&id| id == from)?;
        let count = PageId::ALL.len();
        (1..=count)
            .map(|offset| PageId::ALL[(start + offset) % count])
            .find_map(|id| enabled.iter().position(|&page| page == id))
    }

    /// How long to show a page given the current data
    pub fn duration(
        &self,
        id: PageId,
        snapshot: &Snapshot,
        units: Units,
    ) -> Duration {
        match self.page(id) {
            Some(page) if page.timing == Timing::PerItem => {
                let items = (page.body)(snapshot, units)
                    .map_or(0, |body| body.lines.len());
                (self.page_duration + Self::ITEM_TIME * items as u32)
                    .min(self.page_duration * Self::MAX_SCALE)
            }
            _ => self.page_duration,
        }
    }

    /// Draw a page. Missing data gives a placeholder frame, never an error
    pub fn render(&self, id: PageId, snapshot: &Snapshot, units: Units) -> Frame {
        let Some(page) = self.page(id) else {
            return self.render_fallback(snapshot, units);
        };
        let mut frame = Frame {
            page: Some(id),
            title: page.title.to_owned(),
            subtitle: Some(page.subtitle.to_owned()),
            ticker: ticker(snapshot, units),
            generation: snapshot.generation(),
            ..Frame::default()
        };
        match (page.body)(snapshot, units) {
            Some(body) => {
                frame.lines = body.lines;
                frame.links = body.links;
                frame.image = body.image;
            }
            None => {
                frame.placeholder = true;
                frame.lines = vec![snapshot
                    .notice(page.kind)
                    .unwrap_or(Self::PLACEHOLDER)
                    .to_owned()];
            }
        }
        frame
    }

    /// Shown when no page is enabled at all
    pub fn render_fallback(&self, snapshot: &Snapshot, units: Units) -> Frame {
        Frame {
            page: None,
            title: Self::TITLE.to_owned(),
            subtitle: None,
            lines: vec![
                "No data pages are available".to_owned(),
                "Open settings to enable pages".to_owned(),
            ],
            placeholder: true,
            ticker: ticker(snapshot, units),
            generation: snapshot.generation(),
            ..Frame::default()
        }
    }

    /// The settings overlay. Options are numbered for keyboard selection
    pub fn render_menu(&self, settings: &Settings) -> Frame {
        let mut lines: Vec<String> = SettingsOption::ALL
            .iter()
            .enumerate()
            .map(|(i, &option)| {
                format!(
                    "{}. {option}: {}",
                    i + 1,
                    if settings.is_enabled(option) { "On" } else { "Off" }
                )
            })
            .collect();
        lines.push(format!(
            "V. Music Volume: {:.0}%",
            settings.music_volume * 100.0
        ));
        lines.push(match (settings.auto_detect, &settings.location_name) {
            (true, _) => "Location: Auto-detect".to_owned(),
            (false, Some(name)) => format!("Location: {name}"),
            (false, None) => format!(
                "Location: {:.4}, {:.4}",
                settings.latitude.unwrap_or_default(),
                settings.longitude.unwrap_or_default()
            ),
        });
        Frame {
            page: None,
            title: "Settings".to_owned(),
            subtitle: None,
            lines,
            ..Frame::default()
        }
    }
}

/// The line along the bottom. Always drawable, even with no data
fn ticker(snapshot: &Snapshot, units: Units) -> String {
    let mut parts = vec![Registry::TITLE.to_owned()];
    if let Some(location) = snapshot.location() {
        parts.push(location.name.clone());
    }
    if let Some(current) = snapshot.current() {
        if let Some(temperature) = current.temperature(units) {
            parts.push(format!("Now {temperature} {}", current.description));
        }
    }
    if let Some(period) = snapshot.forecast().and_then(Forecast::now) {
        parts.push(format!("{}: {}", period.name, period.short_forecast));
    }
    // Lets viewers tell when data has gone stale
    parts.push(match snapshot.updated_at() {
        Some(updated_at) => {
            format!("Updated {}", updated_at.format("%-I:%M %p"))
        }
        None => "Waiting for data".to_owned(),
    });
    parts.join("  *  ")
}

fn push_field(lines: &mut Vec<String>, label: &str, value: Option<String>) {
    if let Some(value) = value {
        lines.push(format!("{label}: {value}"));
    }
}

fn current_conditions(snapshot: &Snapshot, units: Units) -> Option<Body> {
    let current = snapshot.current()?;
    let mut lines = vec![format!(
        "{}  {}",
        current.temperature(units).unwrap_or_else(|| "--".into()),
        current.description
    )];
    push_field(&mut lines, "Humidity", current.humidity());
    push_field(&mut lines, "Dewpoint", current.dewpoint(units));
    push_field(&mut lines, "Wind", current.wind());
    push_field(&mut lines, "Pressure", current.pressure());
    push_field(&mut lines, "Visibility", current.visibility());
    lines.push(format!("Station: {}", current.station));
    Some(Body::lines(lines))
}

fn extended_forecast(snapshot: &Snapshot, units: Units) -> Option<Body> {
    let days = snapshot.forecast()?.days();
    if days.is_empty() {
        return None;
    }
    let lines = days
        .iter()
        .take(7)
        .map(|day| {
            format!(
                "{:<16} Hi {:>5} Lo {:>5}  {}",
                day.day.name,
                day.day.temperature(units),
                day.night
                    .map(|night| night.temperature(units))
                    .unwrap_or_else(|| "--".into()),
                day.day.short_forecast
            )
        })
        .collect();
    Some(Body::lines(lines))
}

fn hourly_forecast(snapshot: &Snapshot, units: Units) -> Option<Body> {
    let hourly = snapshot.hourly()?;
    if hourly.periods.is_empty() {
        return None;
    }
    let lines = hourly
        .periods
        .iter()
        .take(12)
        .map(|period| {
            format!(
                "{:>5} {:>5} {:>4}  {}",
                period.start_time().format("%_I%P").to_string(),
                period.temperature(units),
                period.prob_of_precip(),
                period.short_forecast
            )
        })
        .collect();
    Some(Body::lines(lines))
}

fn local_forecast(snapshot: &Snapshot, _: Units) -> Option<Body> {
    let forecast = snapshot.forecast()?;
    if forecast.periods.is_empty() {
        return None;
    }
    let lines = forecast
        .periods
        .iter()
        .take(3)
        .map(|period| format!("{}: {}", period.name, period.detailed_forecast))
        .collect();
    Some(Body::lines(lines))
}

fn radar(snapshot: &Snapshot, _: Units) -> Option<Body> {
    let DataValue::Radar(radar) = snapshot.get(DataKind::Radar)? else {
        return None;
    };
    Some(Body {
        lines: vec![format!("Radar: {}", radar.url)],
        links: Vec::new(),
        image: Some(FrameImage {
            source: radar.url.clone(),
            bytes: radar.bytes.clone(),
        }),
    })
}

fn hazards(snapshot: &Snapshot, _: Units) -> Option<Body> {
    let DataValue::Alerts(alerts) = snapshot.get(DataKind::Alerts)? else {
        return None;
    };
    if alerts.is_empty() {
        return Some(Body::lines(vec![
            "No active watches or warnings".to_owned()
        ]));
    }

    let mut body = Body::default();
    for alert in alerts {
        body.links.push(Link {
            line: body.lines.len(),
            url: alert.url(),
        });
        body.lines
            .push(format!("{} ({})", alert.event, alert.severity));
        if let Some(expires) = alert.expires {
            body.lines.push(format!(
                "  Until {}",
                expires
                    .with_timezone(&Local)
                    .format("%a %-I:%M %p")
            ));
        }
    }
    Some(body)
}

fn air_quality(snapshot: &Snapshot, _: Units) -> Option<Body> {
    let DataValue::AirQuality(air) = snapshot.get(DataKind::AirQuality)?
    else {
        return None;
    };
    let mut lines = vec![match (air.us_aqi, air.category()) {
        (Some(aqi), Some(category)) => {
            format!("Air Quality Index: {aqi:.0} ({category})")
        }
        _ => "Air Quality Index: --".to_owned(),
    }];
    let micrograms = |value: Option<f64>| value.map(|v| format!("{v:.1} µg/m³"));
    push_field(&mut lines, "PM2.5", micrograms(air.pm2_5));
    push_field(&mut lines, "PM10", micrograms(air.pm10));
    push_field(&mut lines, "Ozone", micrograms(air.ozone));
    Some(Body::lines(lines))
}

fn marine(snapshot: &Snapshot, _: Units) -> Option<Body> {
    let DataValue::Marine(marine) = snapshot.get(DataKind::Marine)? else {
        return None;
    };
    let mut lines = Vec::new();
    push_field(
        &mut lines,
        "Wave Height",
        marine.wave_height.map(|feet| format!("{feet:.1} ft")),
    );
    push_field(
        &mut lines,
        "Waves From",
        marine
            .wave_direction
            .map(|degrees| format!("{} ({degrees:.0}°)", compass(degrees))),
    );
    push_field(
        &mut lines,
        "Wave Period",
        marine.wave_period.map(|seconds| format!("{seconds:.0} s")),
    );
    Some(Body::lines(lines))
}

fn temperature_trend(snapshot: &Snapshot, units: Units) -> Option<Body> {
    const BAR_WIDTH: i32 = 20;
    let periods: Vec<_> = snapshot.hourly()?.periods.iter().take(12).collect();
    let first = periods.first()?;
    let last = periods.last()?;
    let min = periods.iter().map(|period| period.temperature).min()?;
    let max = periods.iter().map(|period| period.temperature).max()?;
    let range = (max - min).max(1);

    let change = last.temperature - first.temperature;
    let mut lines = vec![match change {
        change if change >= 3 => {
            format!("Warming {change}° over the next {} hours", periods.len())
        }
        change if change <= -3 => {
            format!(
                "Cooling {}° over the next {} hours",
                -change,
                periods.len()
            )
        }
        _ => "Temperatures holding steady".to_owned(),
    }];
    lines.extend(periods.iter().map(|period| {
        let width = 1 + (period.temperature - min) * (BAR_WIDTH - 1) / range;
        format!(
            "{:>5} {:>5} {}",
            period.start_time().format("%_I%P").to_string(),
            period.temperature(units),
            "#".repeat(width as usize)
        )
    }));
    Some(Body::lines(lines))
}

fn weather_records(snapshot: &Snapshot, units: Units) -> Option<Body> {
    let DataValue::History(history) = snapshot.get(DataKind::History)? else {
        return None;
    };
    if history.days.is_empty() {
        return None;
    }
    let temperature = |value: Option<f64>| {
        value
            .map(|fahrenheit| units.temperature_from_fahrenheit(fahrenheit))
            .unwrap_or_else(|| "--".into())
    };
    let mut lines: Vec<String> = history
        .days
        .iter()
        .map(|day| {
            format!(
                "{}  Hi {:>5}  Lo {:>5}  {:.2} in",
                day.date.format("%a %-m/%-d"),
                temperature(day.high_f),
                temperature(day.low_f),
                day.precipitation_in.unwrap_or_default()
            )
        })
        .collect();
    if let Some((day, high)) = history.record_high() {
        lines.push(format!(
            "Week High: {} on {}",
            units.temperature_from_fahrenheit(high),
            day.date.format("%a")
        ));
    }
    if let Some((day, low)) = history.record_low() {
        lines.push(format!(
            "Week Low: {} on {}",
            units.temperature_from_fahrenheit(low),
            day.date.format("%a")
        ));
    }
    lines.push(format!(
        "Total Precipitation: {:.2} in",
        history.total_precipitation()
    ));
    Some(Body::lines(lines))
}

fn headlines(snapshot: &Snapshot, kind: DataKind) -> Option<Body> {
    let headlines = snapshot.headlines(kind)?;
    let mut body = Body::default();
    for (i, headline) in headlines.items.iter().enumerate() {
        body.lines.push(headline.title.clone());
        body.links.push(Link {
            line: i,
            url: headline.url.clone(),
        });
    }
    Some(body)
}

fn msn_news(snapshot: &Snapshot, _: Units) -> Option<Body> {
    headlines(snapshot, DataKind::MsnHeadlines)
}

fn reddit_news(snapshot: &Snapshot, _: Units) -> Option<Body> {
    headlines(snapshot, DataKind::RedditHeadlines)
}

fn local_news(snapshot: &Snapshot, _: Units) -> Option<Body> {
    headlines(snapshot, DataKind::LocalNews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn registry() -> Registry {
        Registry::new(Duration::from_secs(15))
    }

    fn all_kinds() -> IndexSet<DataKind> {
        DataKind::ALL.iter().copied().collect()
    }

    #[test]
    fn test_registry_covers_every_page() {
        let ids: Vec<PageId> = PAGES.iter().map(|page| page.id).collect();
        assert_eq!(ids, PageId::ALL);
    }

    #[test]
    fn test_enabled_pages_default_settings() {
        let pages = registry().enabled_pages(&Settings::default(), &all_kinds());
        assert!(pages.contains(&PageId::CurrentConditions));
        assert!(pages.contains(&PageId::TemperatureTrend));
        assert!(pages.contains(&PageId::MsnNews));
        // Off by default
        assert!(!pages.contains(&PageId::Marine));
        assert!(!pages.contains(&PageId::LocalNews));
    }

    #[test]
    fn test_enabled_pages_needs_source() {
        let settings = Settings {
            show_marine: true,
            ..Settings::default()
        };
        let mut available = all_kinds();
        available.shift_remove(&DataKind::Marine);
        available.shift_remove(&DataKind::Radar);
        let pages = registry().enabled_pages(&settings, &available);
        assert!(!pages.contains(&PageId::Marine));
        assert!(!pages.contains(&PageId::Radar));
        assert!(pages.contains(&PageId::Hazards));
    }

    #[test]
    fn test_required_kinds() {
        let available = all_kinds();
        let kinds = registry()
            .required_kinds(&[PageId::RedditNews, PageId::TemperatureTrend], &available);
        let expected: IndexSet<DataKind> = [
            DataKind::RedditHeadlines,
            DataKind::Hourly,
            DataKind::Current,
            DataKind::Forecast,
        ]
        .into_iter()
        .collect();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn test_following_wraps() {
        let registry = registry();
        let enabled = [PageId::CurrentConditions, PageId::Radar, PageId::MsnNews];
        assert_eq!(registry.following(PageId::HourlyForecast, &enabled), Some(1));
        assert_eq!(registry.following(PageId::RedditNews, &enabled), Some(0));
        assert_eq!(registry.following(PageId::Radar, &[]), None);
    }

    #[test]
    fn test_duration_per_item() {
        let registry = registry();
        let snapshot = testing::snapshot(vec![
            (DataKind::MsnHeadlines, testing::headlines("msn", 4)),
            (DataKind::RedditHeadlines, testing::headlines("reddit", 40)),
        ]);
        let units = Units::Fahrenheit;
        assert_eq!(
            registry.duration(PageId::MsnNews, &snapshot, units),
            Duration::from_secs(23)
        );
        // Capped
        assert_eq!(
            registry.duration(PageId::RedditNews, &snapshot, units),
            Duration::from_secs(45)
        );
        // No data, no extra time
        assert_eq!(
            registry.duration(PageId::LocalNews, &snapshot, units),
            Duration::from_secs(15)
        );
        assert_eq!(
            registry.duration(PageId::Radar, &snapshot, units),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_render_placeholder() {
        let frame = registry().render(
            PageId::Radar,
            &Snapshot::default(),
            Units::Fahrenheit,
        );
        assert!(frame.placeholder);
        assert_eq!(frame.lines, vec!["Data unavailable"]);
        assert_eq!(frame.page, Some(PageId::Radar));
        assert!(frame.ticker.contains("Waiting for data"));
    }

    #[test]
    fn test_render_notice() {
        let mut fetched = crate::snapshot::Fetched::new(testing::location());
        fetched
            .out_of_coverage
            .insert(DataKind::Current, "Outside NWS coverage".into());
        let snapshot = Snapshot::default().apply(fetched);
        let frame = registry().render(
            PageId::CurrentConditions,
            &snapshot,
            Units::Fahrenheit,
        );
        assert!(frame.placeholder);
        assert_eq!(frame.lines, vec!["Outside NWS coverage"]);
    }

    #[test]
    fn test_render_current() {
        let snapshot =
            testing::snapshot(vec![(DataKind::Current, testing::current(20.0))]);
        let frame = registry().render(
            PageId::CurrentConditions,
            &snapshot,
            Units::Fahrenheit,
        );
        assert!(!frame.placeholder);
        assert_eq!(frame.lines[0], "68°F  Sunny");
        assert_eq!(frame.generation, 1);
        assert!(frame.ticker.contains("Now 68°F Sunny"));
        assert!(frame.ticker.contains("Updated"));
        // Rendering is pure
        assert_eq!(
            frame,
            registry().render(
                PageId::CurrentConditions,
                &snapshot,
                Units::Fahrenheit
            )
        );
    }

    #[test]
    fn test_render_headline_links() {
        let snapshot = testing::snapshot(vec![(
            DataKind::RedditHeadlines,
            testing::headlines("reddit", 3),
        )]);
        let frame =
            registry().render(PageId::RedditNews, &snapshot, Units::Celsius);
        assert_eq!(frame.lines.len(), 3);
        assert_eq!(frame.link(2), Some("https://example.com/reddit/1"));
        assert_eq!(frame.link(0), None);
    }

    #[test]
    fn test_render_forecasts() {
        let snapshot = testing::snapshot(vec![
            (DataKind::Forecast, DataValue::Forecast(testing::forecast(6))),
            (DataKind::Hourly, DataValue::Hourly(testing::forecast(24))),
        ]);
        let registry = registry();
        let units = Units::Fahrenheit;
        let extended =
            registry.render(PageId::ExtendedForecast, &snapshot, units);
        assert_eq!(extended.lines.len(), 3);
        assert!(extended.lines[0].contains("Hi"));
        let hourly = registry.render(PageId::HourlyForecast, &snapshot, units);
        assert_eq!(hourly.lines.len(), 12);
        let trend = registry.render(PageId::TemperatureTrend, &snapshot, units);
        assert_eq!(trend.lines.len(), 13);
        let local = registry.render(PageId::LocalForecast, &snapshot, units);
        assert_eq!(local.lines.len(), 3);
    }

    #[test]
    fn test_render_menu() {
        let frame = registry().render_menu(&Settings::default());
        assert_eq!(frame.title, "Settings");
        assert!(frame.lines.contains(&"1. Marine Forecast: Off".to_owned()));
        assert!(frame.lines.contains(&"5. Reddit Headlines: On".to_owned()));
        assert!(frame.lines.contains(&"V. Music Volume: 30%".to_owned()));
    }

    #[test]
    fn test_render_fallback() {
        let frame =
            registry().render_fallback(&Snapshot::default(), Units::Fahrenheit);
        assert_eq!(frame.page, None);
        assert!(frame.placeholder);
    }
}
