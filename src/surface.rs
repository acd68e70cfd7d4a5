//! The presentation surface: whatever actually shows frames, plays music and
//! collects user input. The controller only talks to the [Surface] trait.

pub mod console;
#[cfg(target_arch = "arm")]
pub mod epaper;

use crate::{pages::PageId, settings::SettingsOption};
use std::{path::Path, sync::Arc};

/// Something the controller can draw on
pub trait Surface {
    /// Show a frame. Called every tick, so implementations should skip work
    /// when the frame hasn't changed
    fn draw_frame(&mut self, frame: &Frame) -> anyhow::Result<()>;

    fn play_track(&mut self, track: &Path) -> anyhow::Result<()>;

    fn stop_music(&mut self);

    /// 0.0-1.0
    fn set_volume(&mut self, volume: f32);

    /// Open a headline link outside the kiosk (e.g. in a browser)
    fn open_link(&mut self, url: &str) -> anyhow::Result<()>;

    /// Drain all input received since the last call
    fn poll_input(&mut self) -> Vec<InputEvent>;
}

/// User input, already decoded from keys/clicks into intents
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TogglePause,
    Next,
    Previous,
    OpenSettings,
    CloseSettings,
    /// Flip a page toggle. Only honored while the settings menu is open
    Toggle(SettingsOption),
    /// Only honored while the settings menu is open
    CycleVolume,
    ForceRefresh,
    HeadlineClicked(String),
    /// The current music track ended
    TrackFinished,
    Quit,
}

/// Everything needed to show one screen. Frames are plain data so surfaces
/// can diff them and tests can inspect them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// None for the settings menu and the no-pages fallback
    pub page: Option<PageId>,
    pub title: String,
    pub subtitle: Option<String>,
    pub lines: Vec<String>,
    /// Clickable lines
    pub links: Vec<Link>,
    pub image: Option<FrameImage>,
    /// Data for the page wasn't available, so this is a stand-in
    pub placeholder: bool,
    /// Scrolling text along the bottom
    pub ticker: String,
    /// Generation of the snapshot this was rendered from
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    /// Index into [Frame::lines]
    pub line: usize,
    pub url: String,
}

/// Encoded image data (GIF/PNG). Decoding is up to the surface
#[derive(Clone, Debug, PartialEq)]
pub struct FrameImage {
    pub source: String,
    pub bytes: Arc<[u8]>,
}

impl Frame {
    /// URL for a 1-based link number, as shown to the user
    pub fn link(&self, number: usize) -> Option<&str> {
        let index = number.checked_sub(1)?;
        self.links.get(index).map(|link| link.url.as_str())
    }
}
