use crate::location::{Location, LocationRequest};
use anyhow::Context;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    fs,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

/// Wrapper for user settings, that handles loading/saving. Every change goes
/// through [Self::update], which persists immediately.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

/// How loading went. Only used to decide whether to prompt on first run
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// No settings file yet
    Missing,
    /// The file couldn't be read or parsed, so we fell back to defaults
    Corrupt,
}

impl SettingsStore {
    pub fn load(path: impl Into<PathBuf>) -> (Self, LoadOutcome) {
        let path = path.into();
        let (settings, outcome) = match Self::read(&path) {
            Ok(Some(settings)) => (settings.validated(), LoadOutcome::Loaded),
            Ok(None) => {
                info!("No settings at {}, using defaults", path.display());
                (Settings::default(), LoadOutcome::Missing)
            }
            Err(err) => {
                error!(
                    "Error loading settings from {}: {err:#}",
                    path.display()
                );
                (Settings::default(), LoadOutcome::Corrupt)
            }
        };
        info!("Settings: {settings:?}");
        (Self { path, settings }, outcome)
    }

    /// In-memory store, used before the file is known and in tests
    pub fn with_settings(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            settings: settings.validated(),
        }
    }

    fn read(path: &Path) -> anyhow::Result<Option<Settings>> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&contents)?))
    }

    /// Modify settings, then save them
    pub fn update(
        &mut self,
        f: impl FnOnce(&mut Settings),
    ) -> anyhow::Result<()> {
        let mut settings = self.settings.clone();
        f(&mut settings);
        self.settings = settings.validated();
        info!("Saving settings: {:?}", &self.settings);
        self.save()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.path, serialized).with_context(|| {
            format!("Error saving settings to {}", self.path.display())
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for SettingsStore {
    type Target = Settings;

    fn deref(&self) -> &Self::Target {
        &self.settings
    }
}

/// User-facing preferences. Persisted as a flat JSON object; anything missing
/// from the file gets its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_detect: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub units: Units,
    pub show_marine: bool,
    pub show_trends: bool,
    pub show_historical: bool,
    pub show_msn: bool,
    pub show_reddit: bool,
    pub show_local_news: bool,
    /// 0.0-1.0
    pub music_volume: f32,
}

impl Settings {
    pub const DEFAULT_VOLUME: f32 = 0.3;
    const VOLUME_STEP: f32 = 0.1;

    /// Clamp anything out of range back into something usable
    fn validated(mut self) -> Self {
        if self.music_volume.is_nan() {
            warn!("Music volume is NaN, resetting");
            self.music_volume = Self::DEFAULT_VOLUME;
        }
        self.music_volume = self.music_volume.clamp(0.0, 1.0);

        if !self.auto_detect && self.manual_location().is_none() {
            warn!(
                "Manual location {:?}, {:?} is invalid, using auto-detect",
                self.latitude, self.longitude
            );
            self.auto_detect = true;
        }
        self
    }

    fn manual_location(&self) -> Option<Location> {
        let latitude = self.latitude.filter(|lat| (-90.0..=90.0).contains(lat))?;
        let longitude =
            self.longitude.filter(|lon| (-180.0..=180.0).contains(lon))?;
        let name = self
            .location_name
            .clone()
            .unwrap_or_else(|| format!("{latitude:.4}, {longitude:.4}"));
        Some(Location {
            latitude,
            longitude,
            name,
        })
    }

    /// Switch to a fixed location
    pub fn set_location(&mut self, latitude: f64, longitude: f64) {
        self.auto_detect = false;
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self.location_name = None;
    }

    pub fn location_request(&self) -> LocationRequest {
        match self.manual_location() {
            Some(location) if !self.auto_detect => {
                LocationRequest::Manual(location)
            }
            _ => LocationRequest::AutoDetect,
        }
    }

    pub fn is_enabled(&self, option: SettingsOption) -> bool {
        match option {
            SettingsOption::Marine => self.show_marine,
            SettingsOption::Trends => self.show_trends,
            SettingsOption::Historical => self.show_historical,
            SettingsOption::Msn => self.show_msn,
            SettingsOption::Reddit => self.show_reddit,
            SettingsOption::LocalNews => self.show_local_news,
        }
    }

    pub fn toggle(&mut self, option: SettingsOption) {
        let flag = match option {
            SettingsOption::Marine => &mut self.show_marine,
            SettingsOption::Trends => &mut self.show_trends,
            SettingsOption::Historical => &mut self.show_historical,
            SettingsOption::Msn => &mut self.show_msn,
            SettingsOption::Reddit => &mut self.show_reddit,
            SettingsOption::LocalNews => &mut self.show_local_news,
        };
        *flag = !*flag;
    }

    /// Step volume up by 10%, wrapping back to silent after full volume
    pub fn cycle_volume(&mut self) {
        let next = self.music_volume + Self::VOLUME_STEP;
        // Fudge factor so 0.3 + 0.7 steps still lands on 1.0
        self.music_volume = if next > 1.0 + f32::EPSILON * 8.0 {
            0.0
        } else {
            next.min(1.0)
        };
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_detect: true,
            latitude: None,
            longitude: None,
            location_name: None,
            units: Units::default(),
            show_marine: false,
            show_trends: true,
            show_historical: true,
            show_msn: true,
            show_reddit: true,
            show_local_news: false,
            music_volume: Self::DEFAULT_VOLUME,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Fahrenheit,
    Celsius,
}

impl Units {
    /// Format a temperature given in Celsius
    pub fn temperature_from_celsius(self, celsius: f64) -> String {
        match self {
            Self::Fahrenheit => format!("{:.0}°F", celsius * 9.0 / 5.0 + 32.0),
            Self::Celsius => format!("{celsius:.0}°C"),
        }
    }

    /// Format a temperature given in Fahrenheit
    pub fn temperature_from_fahrenheit(self, fahrenheit: f64) -> String {
        match self {
            Self::Fahrenheit => format!("{fahrenheit:.0}°F"),
            Self::Celsius => {
                format!("{:.0}°C", (fahrenheit - 32.0) * 5.0 / 9.0)
            }
        }
    }
}

/// The boolean page toggles that can be flipped from the settings menu
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SettingsOption {
    Marine,
    Trends,
    Historical,
    Msn,
    Reddit,
    LocalNews,
}

impl SettingsOption {
    pub const ALL: &'static [Self] = &[
        Self::Marine,
        Self::Trends,
        Self::Historical,
        Self::Msn,
        Self::Reddit,
        Self::LocalNews,
    ];
}

impl Display for SettingsOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Marine => "Marine Forecast",
            Self::Trends => "Weather Trends",
            Self::Historical => "Historical Data",
            Self::Msn => "MSN Top Stories",
            Self::Reddit => "Reddit Headlines",
            Self::LocalNews => "Local News",
        };
        write!(f, "{label}")
    }
}
