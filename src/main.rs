use anyhow::Context;
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::{
    io::{self, IsTerminal, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use weatherstar::{
    config::Config,
    controller::{Controller, Flow},
    location::Location,
    music::Playlist,
    pages::Registry,
    provider::DataProvider,
    refresh::Refresher,
    settings::{LoadOutcome, SettingsStore},
    surface::Surface,
};

/// WeatherStar 4000 style weather kiosk
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Latitude to show for this session, instead of the saved location
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Longitude to show for this session, instead of the saved location
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
    /// Default log level. RUST_LOG takes precedence
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .filter_module("weatherstar", args.log_level)
        .parse_default_env()
        .init();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Config: {config:?}");
    config.check_assets()?;

    let (mut settings, outcome) = SettingsStore::load(config.settings_path());
    info!("Settings file: {}", settings.path().display());
    if outcome == LoadOutcome::Missing && io::stdin().is_terminal() {
        first_run(&mut settings);
    }

    let quit = Arc::new(AtomicBool::new(false));
    let quit_handler = Arc::clone(&quit);
    ctrlc::set_handler(move || quit_handler.store(true, Ordering::Relaxed))
        .context("Error installing signal handler")?;

    let provider = DataProvider::from_config(&config);
    let playlist = Playlist::load(&config.music_dir());
    let mut controller = Controller::new(
        surface(&config)?,
        settings,
        Registry::new(config.page_duration()),
        Refresher::new(Arc::new(provider)),
        playlist,
        config.refresh_interval(),
    );
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        controller = controller.with_location_override(Location {
            latitude,
            longitude,
            name: format!("{latitude:.4}, {longitude:.4}"),
        });
    }

    run(&mut controller, config.frame_interval(), &quit);
    controller.shutdown()
}

#[cfg(target_arch = "arm")]
fn surface(config: &Config) -> anyhow::Result<impl Surface> {
    weatherstar::surface::epaper::EpaperSurface::new(config)
}

#[cfg(not(target_arch = "arm"))]
fn surface(config: &Config) -> anyhow::Result<impl Surface> {
    weatherstar::surface::console::ConsoleSurface::new(
        config.music_player.clone(),
    )
}

/// Tick the controller at a fixed rate until quit
fn run<S: Surface>(
    controller: &mut Controller<S>,
    frame_interval: Duration,
    quit: &AtomicBool,
) {
    controller.start();
    let mut last_tick = Instant::now();
    loop {
        if quit.load(Ordering::Relaxed) {
            info!("Interrupted");
            return;
        }
        let now = Instant::now();
        let dt = now - last_tick;
        last_tick = now;
        match controller.tick(dt) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => return,
            // Keep the kiosk up, the next frame may go through
            Err(err) => error!("Error drawing frame: {err:#}"),
        }
        thread::sleep(frame_interval.saturating_sub(now.elapsed()));
    }
}

/// No settings yet, so ask where we are. Blank means auto-detect
fn first_run(settings: &mut SettingsStore) {
    println!("Welcome to WeatherStar 4000! Leave blank to auto-detect.");
    // Shitty try block
    let helper = || {
        let Some(latitude) = prompt("Latitude [auto-detect]: ")? else {
            return Ok(None);
        };
        let Some(longitude) = prompt("Longitude [auto-detect]: ")? else {
            return Ok(None);
        };
        Ok::<_, anyhow::Error>(Some((latitude, longitude)))
    };
    let result = match helper() {
        Ok(Some((latitude, longitude))) => settings
            .update(|settings| settings.set_location(latitude, longitude)),
        Ok(None) => settings.save(),
        Err(err) => {
            warn!("Invalid location, using auto-detect: {err:#}");
            settings.save()
        }
    };
    if let Err(err) = result {
        error!("{err:#}");
    }
}

fn prompt(label: &str) -> anyhow::Result<Option<f64>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value = line
        .parse()
        .with_context(|| format!("`{line}` is not a number"))?;
    Ok(Some(value))
}
