use crate::location::Location;
use anyhow::{bail, Context};
use log::info;
use serde::Deserialize;
use std::{
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

/// Process-level configuration. Unlike [Settings](crate::settings::Settings),
/// this is never modified at runtime.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fonts, backgrounds and music. Must exist
    pub assets_dir: PathBuf,
    /// Where user settings are persisted. Defaults to a file in the home dir
    pub settings_path: Option<PathBuf>,
    pub page_duration_secs: u64,
    pub refresh_interval_secs: u64,
    /// Upper bound for a single data kind's fetch during a refresh
    pub fetch_timeout_secs: u64,
    pub frame_rate: u32,
    /// Marine data is only fetched for coastal installs
    pub coastal: bool,
    pub user_agent: String,
    /// Used when auto-detection fails
    pub default_location: Location,
    /// SPI device for the e-paper display
    pub display_port: String,
    /// Command that plays one track and exits when it's done. The track path
    /// is appended, and `{volume}` is replaced with a 0-100 volume
    pub music_player: Vec<String>,
}

impl Config {
    const PATH: &'static str = "./config.json";
    const SETTINGS_FILE: &'static str = ".weatherstar4000_settings.json";

    /// Load config from the default path. See [Self::load_from]
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Self::PATH)
    }

    /// Load config from a JSON file. A missing file just means defaults, but
    /// a file we can't parse is fatal.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading config from `{}`", path.display());
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No config file at `{}`, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Error opening config file {}", path.display())
                })
            }
        };
        let config: Self = serde_json::from_reader(file).with_context(|| {
            format!("Error parsing config file {}", path.display())
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.page_duration_secs == 0 {
            bail!("page_duration_secs must be greater than zero");
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be greater than zero");
        }
        if self.frame_rate == 0 {
            bail!("frame_rate must be greater than zero");
        }
        Ok(())
    }

    /// Fail if a required local resource is missing
    pub fn check_assets(&self) -> anyhow::Result<()> {
        if !self.assets_dir.is_dir() {
            bail!(
                "Asset directory `{}` is missing",
                self.assets_dir.display()
            );
        }
        Ok(())
    }

    pub fn music_dir(&self) -> PathBuf {
        self.assets_dir.join("music")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(Self::SETTINGS_FILE)
        })
    }

    pub fn page_duration(&self) -> Duration {
        Duration::from_secs(self.page_duration_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: "weatherstar_assets".into(),
            settings_path: None,
            page_duration_secs: 15,
            refresh_interval_secs: 300,
            fetch_timeout_secs: 15,
            frame_rate: 30,
            coastal: false,
            user_agent: "WeatherStar4000/1.0".into(),
            default_location: Location {
                latitude: 28.5383,
                longitude: -81.3792,
                name: "Orlando, FL".into(),
            },
            display_port: "/dev/spidev0.0".into(),
            music_player: [
                "ffplay",
                "-nodisp",
                "-autoexit",
                "-loglevel",
                "quiet",
                "-volume",
                "{volume}",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}
