//! WeAct Studio 2.9" e-paper display on a Raspberry Pi. The panel takes a
//! couple of seconds per refresh, so we only push a frame when its contents
//! actually change. Input and music go through the console.

use crate::{
    config::Config,
    surface::{console::ConsoleSurface, Frame, InputEvent, Surface},
};
use anyhow::{anyhow, Context};
use display_interface::DisplayError;
use display_interface_spi::SPIInterface;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::Point,
    text::{Baseline, Text},
    Drawable,
};
use linux_embedded_hal::{
    spidev::{SpiModeFlags, SpidevOptions},
    sysfs_gpio::Direction,
    Delay, SpidevDevice, SysfsPin,
};
use log::{error, info, trace};
use std::{fmt::Debug, path::Path};
use u8g2_fonts::{fonts, U8g2TextStyle};
use weact_studio_epd::{
    graphics::{Display290BlackWhite, DisplayRotation},
    Color, WeActStudio290BlackWhiteDriver,
};

const PIN_BUSY: u64 = 17; // GPIO/BCM 17, pin 11
const PIN_DC: u64 = 22; // GPIO/BCM 22, pin 15
const PIN_RESET: u64 = 27; // GPIO/BCM 27, pin 13

type Driver = WeActStudio290BlackWhiteDriver<
    SPIInterface<SpidevDevice, SysfsPin>,
    SysfsPin,
    SysfsPin,
    Delay,
>;

pub struct EpaperSurface {
    driver: Driver,
    display: Display290BlackWhite,
    /// The frame currently on the panel
    frame: Option<Frame>,
    console: ConsoleSurface,
}

impl EpaperSurface {
    /// Panel is 296x128 once rotated
    const HEIGHT: i32 = 128;
    const MARGIN: i32 = 2;
    const TITLE_HEIGHT: i32 = 16;
    const LINE_HEIGHT: i32 = 11;
    /// Fixed-width body font, 6px per character
    const LINE_CHARS: usize = 48;

    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut spi =
            SpidevDevice::open(&config.display_port).context("SPI device")?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("SPI configuration")?;

        let reset = init_pin(PIN_RESET, Direction::Out)
            .context("Initializing pin Reset")?;
        let dc =
            init_pin(PIN_DC, Direction::Out).context("Initializing pin D/C")?;
        let busy = init_pin(PIN_BUSY, Direction::In)
            .context("Initializing pin Busy")?;

        let mut driver = WeActStudio290BlackWhiteDriver::new(
            SPIInterface::new(spi, dc),
            busy,
            reset,
            Delay,
        );
        driver.init().map_err(driver_error)?;
        info!("Display controller initialized");

        let mut display = Display290BlackWhite::new();
        display.set_rotation(DisplayRotation::Rotate90);

        Ok(Self {
            driver,
            display,
            frame: None,
            console: ConsoleSurface::new(config.music_player.clone())?,
        })
    }

    fn render(&mut self, frame: &Frame) -> anyhow::Result<()> {
        DrawTarget::clear(&mut self.display, Color::White).map_err(map_error)?;

        let title = match &frame.subtitle {
            Some(subtitle) => format!("{} {subtitle}", frame.title),
            None => frame.title.clone(),
        };
        Text::with_baseline(
            &title,
            Point::new(Self::MARGIN, 0),
            U8g2TextStyle::new(fonts::u8g2_font_helvB12_tf, Color::Black),
            Baseline::Top,
        )
        .draw(&mut self.display)
        .map_err(map_error)?;

        // Body, leaving the last row for the ticker
        let body_style = U8g2TextStyle::new(fonts::u8g2_font_6x10_tf, Color::Black);
        let rows = ((Self::HEIGHT - Self::TITLE_HEIGHT) / Self::LINE_HEIGHT - 1)
            as usize;
        let mut y = Self::TITLE_HEIGHT;
        for line in frame.lines.iter().take(rows) {
            Text::with_baseline(
                &truncate(line, Self::LINE_CHARS),
                Point::new(Self::MARGIN, y),
                body_style.clone(),
                Baseline::Top,
            )
            .draw(&mut self.display)
            .map_err(map_error)?;
            y += Self::LINE_HEIGHT;
        }

        Text::with_baseline(
            &truncate(&frame.ticker, Self::LINE_CHARS),
            Point::new(Self::MARGIN, Self::HEIGHT - Self::LINE_HEIGHT),
            body_style,
            Baseline::Top,
        )
        .draw(&mut self.display)
        .map_err(map_error)?;
        Ok(())
    }
}

impl Surface for EpaperSurface {
    fn draw_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if self.frame.as_ref() == Some(frame) {
            return Ok(());
        }
        trace!("Frame changed: {:?}", frame.page);
        self.render(frame)?;
        trace!("Updating display");
        self.driver
            .full_update(&self.display)
            .map_err(driver_error)?;
        trace!("Done updating display");
        self.frame = Some(frame.clone());
        Ok(())
    }

    fn play_track(&mut self, track: &Path) -> anyhow::Result<()> {
        self.console.play_track(track)
    }

    fn stop_music(&mut self) {
        self.console.stop_music();
        // Leave the last frame up, without holding the panel powered
        if let Err(err) = self.driver.sleep().map_err(driver_error) {
            error!("Error putting display to sleep: {err:?}");
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.console.set_volume(volume);
    }

    fn open_link(&mut self, url: &str) -> anyhow::Result<()> {
        self.console.open_link(url)
    }

    fn poll_input(&mut self) -> Vec<InputEvent> {
        self.console.poll_input()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_owned()
    } else {
        let mut truncated: String =
            text.chars().take(max_chars.saturating_sub(1)).collect();
        truncated.push('~');
        truncated
    }
}

/// Initialize a GPIO pin
fn init_pin(pin_num: u64, direction: Direction) -> anyhow::Result<SysfsPin> {
    let pin = SysfsPin::new(pin_num);
    pin.export().context("Error exporting pin")?;
    while !pin.is_exported() {}
    pin.set_direction(direction)
        .context("Error setting pin direction")?;
    if matches!(direction, Direction::Out) {
        pin.set_value(1).context("Error enabling pin")?;
    }
    Ok(pin)
}

/// The error types from the driver and graphics stack don't implement Error
/// so we have to map manually
fn driver_error(error: DisplayError) -> anyhow::Error {
    anyhow!("Display driver error: {error:?}")
}

fn map_error(error: impl Debug) -> anyhow::Error {
    anyhow!("{error:?}")
}
